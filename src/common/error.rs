// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::common::i18n::I18nStore;
use crate::middleware::i18n::Locale;

// Error de dominio. Los handlers lo traducen a `ApiError` con el idioma del cliente.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Error de validación")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Campo obligatorio ausente: {0}")]
    MissingField(String),

    #[error("El usuario ya existe")]
    UsernameAlreadyExists,

    #[error("Credenciales inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Usuario no encontrado")]
    UserNotFound,

    #[error("Las contraseñas no coinciden")]
    PasswordMismatch,

    #[error("Recurso no encontrado: {0}")]
    ResourceNotFound(String),

    #[error("Estado de asistencia inválido: {0}")]
    InvalidTicketStatus(String),

    #[error("Fecha inválida: {0}")]
    InvalidDate(String),

    #[error("Falta la columna {table}.{column}")]
    MissingColumn { table: String, column: String },

    #[error("Identificador SQL inválido: {0}")]
    InvalidIdentifier(String),

    #[error("El CSV no tiene encabezados")]
    CsvNoHeaders,

    #[error("Ningún encabezado del CSV es reconocido")]
    CsvNoKnownColumns,

    #[error("Error leyendo CSV: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Archivo inválido: {0}")]
    InvalidUpload(String),

    #[error("Parámetros GPS inválidos: {0}")]
    InvalidGpsPing(String),

    #[error("Fuente no encontrada: {0}")]
    FontNotFound(String),

    #[error("Error generando PDF: {0}")]
    PdfError(String),

    #[error("Error generando Word: {0}")]
    DocxError(String),

    #[error("Error de base de datos")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Error de E/S: {0}")]
    IoError(#[from] std::io::Error),

    // Cualquier otro error inesperado; `anyhow` conserva el contexto.
    #[error("Error interno del servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Error de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Error de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

// Respuesta de error que sale por la API.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

impl AppError {
    /// Status HTTP, clave de traducción y parámetros para el mensaje.
    fn parts(&self) -> (StatusCode, &'static str, Vec<(&'static str, String)>) {
        match self {
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, "validation_failed", vec![]),
            AppError::MissingField(field) => {
                (StatusCode::BAD_REQUEST, "missing_field", vec![("field", field.clone())])
            }
            AppError::UsernameAlreadyExists => (StatusCode::CONFLICT, "username_exists", vec![]),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials", vec![]),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "no_auth", vec![]),
            AppError::UserNotFound => (StatusCode::NOT_FOUND, "user_not_found", vec![]),
            AppError::PasswordMismatch => (StatusCode::BAD_REQUEST, "password_mismatch", vec![]),
            AppError::ResourceNotFound(what) => {
                (StatusCode::NOT_FOUND, "resource_not_found", vec![("resource", what.clone())])
            }
            AppError::InvalidTicketStatus(s) => {
                (StatusCode::BAD_REQUEST, "invalid_status", vec![("status", s.clone())])
            }
            AppError::InvalidDate(value) => {
                (StatusCode::BAD_REQUEST, "invalid_date", vec![("value", value.clone())])
            }
            AppError::MissingColumn { table, column } => (
                StatusCode::CONFLICT,
                "missing_column",
                vec![("table", table.clone()), ("column", column.clone())],
            ),
            AppError::CsvNoHeaders => (StatusCode::BAD_REQUEST, "csv_no_headers", vec![]),
            AppError::CsvNoKnownColumns => (StatusCode::BAD_REQUEST, "csv_no_known_columns", vec![]),
            AppError::CsvError(e) => {
                (StatusCode::BAD_REQUEST, "csv_invalid", vec![("reason", e.to_string())])
            }
            AppError::InvalidUpload(reason) => {
                (StatusCode::BAD_REQUEST, "invalid_upload", vec![("reason", reason.clone())])
            }
            AppError::InvalidGpsPing(reason) => {
                (StatusCode::BAD_REQUEST, "invalid_gps_ping", vec![("reason", reason.clone())])
            }
            AppError::FontNotFound(_) | AppError::PdfError(_) | AppError::DocxError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "report_failed", vec![])
            }
            AppError::InvalidIdentifier(_)
            | AppError::DatabaseError(_)
            | AppError::IoError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", vec![]),
        }
    }

    /// Traduce el error al idioma pedido por el cliente.
    pub fn to_api_error(&self, locale: &Locale, store: &I18nStore) -> ApiError {
        let (status, key, params) = self.parts();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("🔥 Error interno: {:?}", self);
        }

        let params: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();
        let message = store.translate(&locale.0, key, &params);

        let details = match self {
            AppError::ValidationError(errors) => {
                let mut details = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), json!(messages));
                }
                Some(Value::Object(details))
            }
            _ => None,
        };

        ApiError { status, error: message, details }
    }

    pub fn status(&self) -> StatusCode {
        self.parts().0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_column_maps_to_conflict_with_params() {
        let store = I18nStore::load().unwrap();
        let err = AppError::MissingColumn { table: "asistencias".into(), column: "estado".into() };
        let api = err.to_api_error(&Locale("es".into()), &store);

        assert_eq!(api.status, StatusCode::CONFLICT);
        assert!(api.error.contains("estado"));
        assert!(api.error.contains("asistencias"));
    }

    #[test]
    fn database_errors_hide_details() {
        let store = I18nStore::load().unwrap();
        let err = AppError::DatabaseError(sqlx::Error::RowNotFound);
        let api = err.to_api_error(&Locale("en".into()), &store);

        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(api.details.is_none());
        assert!(!api.error.contains("RowNotFound"));
    }
}
