// src/handlers/customers.rs

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::customer::{
        Customer, CustomerDetail, CustomerFilter, CustomerList, CustomerPayload, CustomerSummary,
        ImportReport, PurgeReport,
    },
};

const CSV_FIELD: &str = "csvfile";

// GET /api/customers
#[utoipa::path(
    get,
    path = "/api/customers",
    tag = "Customers",
    params(CustomerFilter),
    responses(
        (status = 200, description = "Clientes filtrados y total general", body = CustomerList)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_customers(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(filter): Query<CustomerFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let list = app_state
        .customer_service
        .list_customers(&app_state.db_pool, &filter)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(list)))
}

// POST /api/customers
#[utoipa::path(
    post,
    path = "/api/customers",
    tag = "Customers",
    request_body = CustomerPayload,
    responses(
        (status = 201, description = "Cliente creado", body = Customer),
        (status = 400, description = "Datos inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<CustomerPayload>,
) -> Result<impl IntoResponse, ApiError> {
    if let Err(e) = payload.validate() {
        return Err(AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store));
    }

    let customer = app_state
        .customer_service
        .create_customer(&app_state.db_pool, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(customer)))
}

// GET /api/customers/summary
#[utoipa::path(
    get,
    path = "/api/customers/summary",
    tag = "Customers",
    responses(
        (status = 200, description = "Totales y facturación mensual", body = CustomerSummary)
    ),
    security(("api_jwt" = []))
)]
pub async fn customer_summary(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let summary = app_state
        .customer_service
        .summary(&app_state.db_pool)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(summary)))
}

// GET /api/customers/{id}
#[utoipa::path(
    get,
    path = "/api/customers/{id}",
    tag = "Customers",
    params(("id" = i64, Path, description = "ID del cliente")),
    responses(
        (status = 200, description = "Cliente y sus últimas asistencias", body = CustomerDetail),
        (status = 404, description = "No existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = app_state
        .customer_service
        .customer_detail(&app_state.db_pool, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(detail)))
}

// PUT /api/customers/{id}
#[utoipa::path(
    put,
    path = "/api/customers/{id}",
    tag = "Customers",
    params(("id" = i64, Path, description = "ID del cliente")),
    request_body = CustomerPayload,
    responses(
        (status = 200, description = "Cliente actualizado", body = Customer),
        (status = 404, description = "No existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i64>,
    Json(payload): Json<CustomerPayload>,
) -> Result<impl IntoResponse, ApiError> {
    if let Err(e) = payload.validate() {
        return Err(AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store));
    }

    let customer = app_state
        .customer_service
        .update_customer(&app_state.db_pool, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(customer)))
}

// DELETE /api/customers/{id}
#[utoipa::path(
    delete,
    path = "/api/customers/{id}",
    tag = "Customers",
    params(("id" = i64, Path, description = "ID del cliente")),
    responses(
        (status = 204, description = "Cliente eliminado"),
        (status = 404, description = "No existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .customer_service
        .delete_customer(&app_state.db_pool, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// POST /api/customers/{id}/toggle
#[utoipa::path(
    post,
    path = "/api/customers/{id}/toggle",
    tag = "Customers",
    params(("id" = i64, Path, description = "ID del cliente")),
    responses(
        (status = 200, description = "Estado activo invertido", body = Customer),
        (status = 404, description = "No existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn toggle_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let customer = app_state
        .customer_service
        .toggle_active(&app_state.db_pool, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(customer)))
}

// POST /api/customers/purge
#[utoipa::path(
    post,
    path = "/api/customers/purge",
    tag = "Customers",
    responses(
        (status = 200, description = "Clientes vacíos eliminados", body = PurgeReport)
    ),
    security(("api_jwt" = []))
)]
pub async fn purge_customers(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let report = app_state
        .customer_service
        .purge_blank_customers(&app_state.db_pool)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(report)))
}

// POST /api/customers/import (multipart, campo "csvfile")
#[utoipa::path(
    post,
    path = "/api/customers/import",
    tag = "Customers",
    request_body(content_type = "multipart/form-data", description = "Planilla CSV en el campo 'csvfile'"),
    responses(
        (status = 200, description = "Resultado de la importación", body = ImportReport),
        (status = 400, description = "Archivo o encabezados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn import_customers(
    State(app_state): State<AppState>,
    locale: Locale,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let mut csv_bytes = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| to_api(AppError::InvalidUpload(e.body_text())))?
    {
        if field.name() == Some(CSV_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| to_api(AppError::InvalidUpload(e.body_text())))?;
            csv_bytes = Some(bytes);
            break;
        }
    }

    let csv_bytes = csv_bytes.ok_or_else(|| to_api(AppError::MissingField(CSV_FIELD.into())))?;
    if csv_bytes.is_empty() {
        return Err(to_api(AppError::InvalidUpload("archivo vacío".into())));
    }

    let report = app_state
        .customer_service
        .import_csv(&app_state.db_pool, &csv_bytes)
        .await
        .map_err(to_api)?;

    Ok((StatusCode::OK, Json(report)))
}
