// src/models/ticket.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::common::error::AppError;

// Columnas de `asistencias`; estado y canal nunca salen nulos
pub const TICKET_COLUMNS: &str = "id, cliente, cliente_id, direccion, tipo, prioridad, tecnico, \
     tecnico_id, problema, fecha, pppoe, COALESCE(estado, 'pendiente') AS estado, programada_en, \
     COALESCE(canal, 'web') AS canal, lat, lng, cedula";

// --- Estado de la asistencia ---
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
pub enum TicketStatus {
    #[default]
    #[sqlx(rename = "pendiente")]
    #[serde(rename = "pendiente")]
    Pending,
    #[sqlx(rename = "en_progreso")]
    #[serde(rename = "en_progreso")]
    InProgress,
    #[sqlx(rename = "resuelto")]
    #[serde(rename = "resuelto")]
    Resolved,
    #[sqlx(rename = "cancelado")]
    #[serde(rename = "cancelado")]
    Cancelled,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 4] = [
        TicketStatus::Pending,
        TicketStatus::InProgress,
        TicketStatus::Resolved,
        TicketStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Pending => "pendiente",
            TicketStatus::InProgress => "en_progreso",
            TicketStatus::Resolved => "resuelto",
            TicketStatus::Cancelled => "cancelado",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        TicketStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| AppError::InvalidTicketStatus(s.to_string()))
    }
}

// --- Asistencia (ticket) ---
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: i64,

    #[sqlx(rename = "cliente")]
    #[schema(example = "Ramona Benítez")]
    pub customer_name: Option<String>,

    #[sqlx(rename = "cliente_id")]
    pub customer_id: Option<i64>,

    #[sqlx(rename = "direccion")]
    pub address: Option<String>,

    #[sqlx(rename = "tipo")]
    #[schema(example = "Soporte")]
    pub kind: Option<String>,

    #[sqlx(rename = "prioridad")]
    #[schema(example = "Media")]
    pub priority: Option<String>,

    #[sqlx(rename = "tecnico")]
    pub technician_name: Option<String>,

    #[sqlx(rename = "tecnico_id")]
    pub technician_id: Option<i64>,

    #[sqlx(rename = "problema")]
    pub problem: Option<String>,

    #[sqlx(rename = "fecha")]
    #[schema(example = "2024-07-05 14:30:00")]
    pub created_at: Option<String>,

    #[schema(example = "ramonabenitez@spynet.com")]
    pub pppoe: Option<String>,

    #[sqlx(rename = "estado")]
    pub status: TicketStatus,

    #[sqlx(rename = "programada_en")]
    #[schema(example = "2024-07-06 09:00")]
    pub scheduled_at: Option<String>,

    #[sqlx(rename = "canal")]
    #[schema(example = "web")]
    pub channel: String,

    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub cedula: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketPayload {
    #[serde(default)]
    #[schema(example = "Ramona Benítez")]
    pub customer: String,
    pub customer_id: Option<i64>,
    pub address: Option<String>,

    /// Por defecto "Soporte"
    pub kind: Option<String>,
    /// Por defecto "Media"
    pub priority: Option<String>,

    pub technician: Option<String>,
    pub technician_id: Option<i64>,
    pub problem: Option<String>,
    pub cedula: Option<String>,

    /// Se genera desde el nombre del cliente si falta
    pub pppoe: Option<String>,

    /// Por defecto "web"
    pub channel: Option<String>,
    /// Por defecto "pendiente"
    pub status: Option<String>,

    /// Fecha/hora local "YYYY-MM-DDTHH:MM"
    #[schema(example = "2024-07-06T09:00")]
    pub scheduled_local: Option<String>,

    #[validate(range(min = -90.0, max = 90.0, message = "Latitud fuera de rango."))]
    pub lat: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0, message = "Longitud fuera de rango."))]
    pub lng: Option<f64>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReschedulePayload {
    /// Vacío o ausente: quita la programación
    #[schema(example = "2024-07-06T09:00")]
    pub scheduled_local: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusPayload {
    #[schema(example = "en_progreso")]
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignPayload {
    pub technician_id: Option<i64>,
}

// Opciones para el formulario de nueva asistencia
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerOption {
    pub id: i64,
    #[sqlx(rename = "nombre")]
    pub name: Option<String>,
    pub cedula: Option<String>,
    pub pppoe: Option<String>,
    #[sqlx(rename = "telefono")]
    pub phone: Option<String>,
    #[sqlx(rename = "barrio")]
    pub neighborhood: Option<String>,
    #[sqlx(rename = "referencia")]
    pub reference: Option<String>,
    #[sqlx(rename = "tipo")]
    pub kind: String,
    #[sqlx(rename = "valor")]
    pub amount: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct TechnicianOption {
    pub id: i64,
    #[sqlx(rename = "nombre")]
    pub name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TicketFormOptions {
    pub customers: Vec<CustomerOption>,
    pub technicians: Vec<TechnicianOption>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_statuses() {
        assert_eq!("en_progreso".parse::<TicketStatus>().unwrap(), TicketStatus::InProgress);
        assert_eq!(" resuelto ".parse::<TicketStatus>().unwrap(), TicketStatus::Resolved);
    }

    #[test]
    fn rejects_unknown_status() {
        let err = "terminado".parse::<TicketStatus>().unwrap_err();
        assert!(matches!(err, AppError::InvalidTicketStatus(s) if s == "terminado"));
    }

    #[test]
    fn status_serializes_to_stored_value() {
        let json = serde_json::to_string(&TicketStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelado\"");
    }
}
