// src/models/tracking.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

pub const TECHNICIAN_COLUMNS: &str = "id, nombre, telefono, COALESCE(activo, 1) AS activo, \
     telefono_whatsapp, movil, tracking_token, lat, lng, pos_updated_at";

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Technician {
    pub id: i64,
    #[sqlx(rename = "nombre")]
    #[schema(example = "Juan")]
    pub name: Option<String>,
    #[sqlx(rename = "telefono")]
    pub phone: Option<String>,
    #[sqlx(rename = "activo")]
    pub active: bool,
    #[sqlx(rename = "telefono_whatsapp")]
    pub whatsapp_phone: Option<String>,
    #[sqlx(rename = "movil")]
    pub mobile_unit: Option<String>,
    pub tracking_token: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    #[sqlx(rename = "pos_updated_at")]
    pub position_updated_at: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTechnicianPayload {
    #[validate(length(min = 1, message = "El nombre es obligatorio."))]
    pub name: String,
    pub phone: Option<String>,
    pub whatsapp_phone: Option<String>,
    pub mobile_unit: Option<String>,
}

// Punto de una trayectoria (`tecnico_pos`)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct TrackPoint {
    pub lat: f64,
    pub lng: f64,
    #[schema(example = "2024-07-05 14:30:00")]
    pub ts: String,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct TechnicianLastPosition {
    #[sqlx(rename = "tecnico_id")]
    pub id: i64,
    #[sqlx(rename = "nombre")]
    pub name: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub ts: String,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MapTicket {
    pub id: i64,
    #[sqlx(rename = "cliente")]
    pub customer_name: Option<String>,
    #[sqlx(rename = "direccion")]
    pub address: Option<String>,
    #[sqlx(rename = "tipo")]
    pub kind: Option<String>,
    #[sqlx(rename = "prioridad")]
    pub priority: Option<String>,
    #[sqlx(rename = "estado")]
    pub status: Option<String>,
    #[sqlx(rename = "programada_en")]
    pub scheduled_at: Option<String>,
    pub lat: f64,
    pub lng: f64,
    // Nombre del técnico asignado, o el texto libre de la asistencia
    #[sqlx(rename = "tecnico")]
    pub technician: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MapData {
    pub tickets: Vec<MapTicket>,
    pub technicians: Vec<TechnicianLastPosition>,
}

/// Parámetros crudos del ping GPS; llegan por query o formulario.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GpsPingParams {
    pub tecnico_id: Option<String>,
    pub lat: Option<String>,
    pub lng: Option<String>,
    pub accuracy: Option<String>,
    pub battery: Option<String>,
    pub source: Option<String>,
    pub movil: Option<String>,
}

/// Ping ya validado.
#[derive(Debug, Clone, PartialEq)]
pub struct GpsPing {
    pub technician_id: i64,
    pub lat: f64,
    pub lng: f64,
    pub accuracy: Option<f64>,
    pub battery: Option<f64>,
    pub source: Option<String>,
    pub mobile_unit: Option<String>,
}

impl GpsPing {
    /// Solo se guarda en `tecnico_tracks` si vino algún dato extra.
    pub fn has_track_details(&self) -> bool {
        self.accuracy.is_some()
            || self.battery.is_some()
            || self.source.is_some()
            || self.mobile_unit.is_some()
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TrajectoryQuery {
    /// YYYY-MM-DD, por defecto ayer
    pub desde: Option<String>,
    /// YYYY-MM-DD, por defecto hoy
    pub hasta: Option<String>,
}
