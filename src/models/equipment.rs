// src/models/equipment.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

// --- 1. Equipos y herramientas ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Equipment {
    pub id: i64,
    #[sqlx(rename = "nombre")]
    #[schema(example = "ONU")]
    pub name: String,
    #[sqlx(rename = "tipo")]
    #[schema(example = "Red")]
    pub kind: String,
    #[sqlx(rename = "descripcion")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Tool {
    pub id: i64,
    #[sqlx(rename = "nombre")]
    #[schema(example = "Crimpadora")]
    pub name: String,
    #[sqlx(rename = "tipo")]
    pub kind: Option<String>,
    // Nombre del archivo dentro del directorio de uploads
    #[sqlx(rename = "imagen")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
pub enum ItemType {
    #[sqlx(rename = "equipo")]
    #[serde(rename = "equipo")]
    Equipment,
    #[sqlx(rename = "herramienta")]
    #[serde(rename = "herramienta")]
    Tool,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Equipment => "equipo",
            ItemType::Tool => "herramienta",
        }
    }
}

// --- 2. Historial de uso ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub id: i64,
    pub item_type: String,
    pub item_id: i64,
    // Nombre resuelto contra equipos/herramientas
    #[schema(example = "ONU")]
    pub item_name: String,
    #[sqlx(rename = "tecnico")]
    pub technician: String,
    #[sqlx(rename = "fecha")]
    pub used_at: String,
    #[sqlx(rename = "servicio")]
    pub service: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentStats {
    pub total: i64,
    pub in_use: i64,
    pub available: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EquipmentOverview {
    pub equipment: Vec<Equipment>,
    pub tools: Vec<Tool>,
    pub history: Vec<UsageRecord>,
    pub stats: EquipmentStats,
}

// --- 3. Payloads ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateEquipmentPayload {
    #[validate(length(min = 1, message = "El nombre es obligatorio."))]
    pub name: String,
    #[validate(length(min = 1, message = "El tipo es obligatorio."))]
    pub kind: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateToolPayload {
    #[validate(length(min = 1, message = "El nombre es obligatorio."))]
    pub name: String,
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsagePayload {
    pub item_id: i64,
    #[validate(length(min = 1, message = "Indicá el técnico."))]
    pub technician: String,
    pub service: Option<String>,
}

// --- 4. Fotos ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InstallationPhoto {
    pub id: i64,
    #[sqlx(rename = "asistencia_id")]
    pub ticket_id: Option<i64>,
    #[sqlx(rename = "tecnico")]
    pub technician: Option<String>,
    #[sqlx(rename = "ruta_foto")]
    pub path: String,
    #[sqlx(rename = "descripcion")]
    pub description: Option<String>,
    #[sqlx(rename = "fecha")]
    pub taken_at: Option<String>,
}
