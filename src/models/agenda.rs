// src/models/agenda.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use crate::models::ticket::{TechnicianOption, Ticket};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AgendaQuery {
    /// YYYY-MM-DD, por defecto hoy
    pub dia: Option<String>,
    pub estado: Option<String>,
    pub tecnico_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgendaEvent {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub ticket: Ticket,
    // Nombres resueltos por JOIN con clientes/tecnicos
    #[sqlx(rename = "c_nombre")]
    pub linked_customer: Option<String>,
    #[sqlx(rename = "t_nombre")]
    pub linked_technician: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgendaView {
    #[schema(example = "2024-07-06")]
    pub day: String,
    pub prev_day: String,
    pub next_day: String,
    pub events: Vec<AgendaEvent>,
    pub technicians: Vec<TechnicianOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}
