// src/models/customer.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::models::ticket::Ticket;

// Columnas de `clientes` tal como las lee el repositorio
pub const CUSTOMER_COLUMNS: &str = "id, external_id, nombre, referencia, barrio, telefono, \
     situacion, COALESCE(exonerado, 0) AS exonerado, tipo, valor, tipo_valor, vencimiento, \
     cedula, pppoe, COALESCE(activo, 1) AS activo";

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: i64,

    // ID en el sistema de facturación externo
    #[schema(example = "1043")]
    pub external_id: Option<String>,

    #[sqlx(rename = "nombre")]
    #[schema(example = "Ramona Benítez")]
    pub name: Option<String>,

    #[sqlx(rename = "referencia")]
    pub reference: Option<String>,

    #[sqlx(rename = "barrio")]
    pub neighborhood: Option<String>,

    #[sqlx(rename = "telefono")]
    #[schema(example = "0981123456")]
    pub phone: Option<String>,

    #[sqlx(rename = "situacion")]
    #[schema(example = "al día")]
    pub situation: Option<String>,

    #[sqlx(rename = "exonerado")]
    pub exempt: bool,

    #[sqlx(rename = "tipo")]
    #[schema(example = "cliente")]
    pub kind: Option<String>,

    // Monto tal como viene de la planilla ("130.000")
    #[sqlx(rename = "valor")]
    #[schema(example = "130.000")]
    pub amount: Option<String>,

    // Columna legada "cliente 130.000"
    #[sqlx(rename = "tipo_valor")]
    pub kind_amount: Option<String>,

    #[sqlx(rename = "vencimiento")]
    #[schema(example = "2024-07-05")]
    pub due_date: Option<String>,

    pub cedula: Option<String>,
    pub pppoe: Option<String>,

    #[sqlx(rename = "activo")]
    pub active: bool,

    // Monto numérico derivado de `amount`
    #[sqlx(skip)]
    #[schema(value_type = Option<f64>, example = 130000)]
    pub amount_value: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CustomerFilter {
    /// Busca en nombre, teléfono y referencia
    pub q: Option<String>,
    pub situacion: Option<String>,
    /// "0" / "1"; cualquier otro valor no filtra
    pub exonerado: Option<String>,
    pub barrio: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPayload {
    pub external_id: Option<String>,

    #[validate(length(min = 1, message = "El nombre es obligatorio."))]
    pub name: String,

    pub reference: Option<String>,
    pub neighborhood: Option<String>,
    pub phone: Option<String>,
    pub situation: Option<String>,

    #[serde(default)]
    pub exempt: bool,

    pub kind: Option<String>,
    pub amount: Option<String>,
    pub due_date: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerList {
    pub customers: Vec<Customer>,
    // Total de clientes en la tabla, sin filtros
    pub total: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetail {
    pub customer: Customer,
    pub tickets: Vec<Ticket>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
    pub total: i64,
    pub active: i64,
    pub exempt: i64,
    /// Suma de montos de clientes activos no exonerados
    #[schema(value_type = f64)]
    pub monthly_billing: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurgeReport {
    pub deleted: u64,
}

// Resultado de una importación CSV
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub inserted: u64,
    pub updated: u64,
    pub skipped: u64,
    #[schema(example = "utf-8")]
    pub encoding: String,
    #[schema(example = ";")]
    pub delimiter: String,
    pub ignored_columns: Vec<String>,
}
