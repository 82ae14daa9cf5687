// src/handlers/tracking.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Form, Json,
};
use serde_json::json;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::tracking::{
        CreateTechnicianPayload, GpsPingParams, MapData, Technician, TrackPoint, TrajectoryQuery,
    },
};

async fn record_ping(
    app_state: &AppState,
    locale: &Locale,
    params: &GpsPingParams,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    app_state
        .tracking_service
        .record_ping(&app_state.db_pool, params)
        .await
        .map_err(|e| e.to_api_error(locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(json!({ "ok": true }))))
}

// GET /gps?tecnico_id=&lat=&lng=
#[utoipa::path(
    get,
    path = "/gps",
    tag = "Tracking",
    params(GpsPingParams),
    responses(
        (status = 200, description = "Posición registrada"),
        (status = 400, description = "Faltan tecnico_id, lat o lng")
    )
)]
pub async fn gps_ping_query(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(params): Query<GpsPingParams>,
) -> Result<impl IntoResponse, ApiError> {
    record_ping(&app_state, &locale, &params).await
}

// POST /gps (formulario)
#[utoipa::path(
    post,
    path = "/gps",
    tag = "Tracking",
    request_body(content_type = "application/x-www-form-urlencoded", description = "Mismos campos que el GET"),
    responses(
        (status = 200, description = "Posición registrada"),
        (status = 400, description = "Faltan tecnico_id, lat o lng")
    )
)]
pub async fn gps_ping_form(
    State(app_state): State<AppState>,
    locale: Locale,
    Form(params): Form<GpsPingParams>,
) -> Result<impl IntoResponse, ApiError> {
    record_ping(&app_state, &locale, &params).await
}

// GET /api/map
#[utoipa::path(
    get,
    path = "/api/map",
    tag = "Tracking",
    responses(
        (status = 200, description = "Asistencias de los últimos 15 días y última posición de cada técnico", body = MapData)
    ),
    security(("api_jwt" = []))
)]
pub async fn map_data(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let data = app_state
        .tracking_service
        .map_data(&app_state.db_pool)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(data)))
}

// GET /api/technicians
#[utoipa::path(
    get,
    path = "/api/technicians",
    tag = "Tracking",
    responses(
        (status = 200, description = "Técnicos", body = Vec<Technician>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_technicians(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let technicians = app_state
        .tracking_service
        .list_technicians(&app_state.db_pool)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(technicians)))
}

// POST /api/technicians
#[utoipa::path(
    post,
    path = "/api/technicians",
    tag = "Tracking",
    request_body = CreateTechnicianPayload,
    responses(
        (status = 201, description = "Técnico creado con su token de tracking", body = Technician),
        (status = 400, description = "Datos inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_technician(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<CreateTechnicianPayload>,
) -> Result<impl IntoResponse, ApiError> {
    if let Err(e) = payload.validate() {
        return Err(AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store));
    }

    let technician = app_state
        .tracking_service
        .create_technician(&app_state.db_pool, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(technician)))
}

// GET /api/technicians/{id}/trajectory
#[utoipa::path(
    get,
    path = "/api/technicians/{id}/trajectory",
    tag = "Tracking",
    params(
        ("id" = i64, Path, description = "ID del técnico"),
        TrajectoryQuery
    ),
    responses(
        (status = 200, description = "Puntos en orden cronológico", body = Vec<TrackPoint>),
        (status = 400, description = "Fecha inválida")
    ),
    security(("api_jwt" = []))
)]
pub async fn technician_trajectory(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i64>,
    Query(query): Query<TrajectoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let points = app_state
        .tracking_service
        .trajectory(&app_state.db_pool, id, &query)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(points)))
}
