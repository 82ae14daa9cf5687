// src/handlers/tickets.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::{
        agenda::{AgendaQuery, AgendaView},
        ticket::{
            AssignPayload, CreateTicketPayload, ReschedulePayload, StatusPayload, Ticket,
            TicketFormOptions,
        },
    },
};

// GET /api/tickets
#[utoipa::path(
    get,
    path = "/api/tickets",
    tag = "Tickets",
    responses(
        (status = 200, description = "Asistencias, la más nueva primero", body = Vec<Ticket>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_tickets(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let tickets = app_state
        .ticket_service
        .list_tickets(&app_state.db_pool)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(tickets)))
}

// POST /api/tickets
#[utoipa::path(
    post,
    path = "/api/tickets",
    tag = "Tickets",
    request_body = CreateTicketPayload,
    responses(
        (status = 201, description = "Asistencia creada", body = Ticket),
        (status = 400, description = "Datos o estado inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_ticket(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<CreateTicketPayload>,
) -> Result<impl IntoResponse, ApiError> {
    if let Err(e) = payload.validate() {
        return Err(AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store));
    }

    let ticket = app_state
        .ticket_service
        .create_ticket(&app_state.db_pool, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(ticket)))
}

// GET /api/tickets/form-options
#[utoipa::path(
    get,
    path = "/api/tickets/form-options",
    tag = "Tickets",
    responses(
        (status = 200, description = "Clientes y técnicos activos", body = TicketFormOptions)
    ),
    security(("api_jwt" = []))
)]
pub async fn form_options(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let options = app_state
        .ticket_service
        .form_options(&app_state.db_pool)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(options)))
}

// GET /api/tickets/{id}
#[utoipa::path(
    get,
    path = "/api/tickets/{id}",
    tag = "Tickets",
    params(("id" = i64, Path, description = "ID de la asistencia")),
    responses(
        (status = 200, description = "Asistencia", body = Ticket),
        (status = 404, description = "No existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_ticket(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let ticket = app_state
        .ticket_service
        .get_ticket(&app_state.db_pool, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(ticket)))
}

// PUT /api/tickets/{id}/schedule
#[utoipa::path(
    put,
    path = "/api/tickets/{id}/schedule",
    tag = "Tickets",
    params(("id" = i64, Path, description = "ID de la asistencia")),
    request_body = ReschedulePayload,
    responses(
        (status = 200, description = "Asistencia reprogramada", body = Ticket),
        (status = 409, description = "La base no tiene la columna programada_en")
    ),
    security(("api_jwt" = []))
)]
pub async fn reschedule_ticket(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i64>,
    Json(payload): Json<ReschedulePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let ticket = app_state
        .ticket_service
        .reschedule(&app_state.db_pool, id, payload.scheduled_local.as_deref())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(ticket)))
}

// PUT /api/tickets/{id}/status
#[utoipa::path(
    put,
    path = "/api/tickets/{id}/status",
    tag = "Tickets",
    params(("id" = i64, Path, description = "ID de la asistencia")),
    request_body = StatusPayload,
    responses(
        (status = 200, description = "Estado actualizado", body = Ticket),
        (status = 400, description = "Estado inválido"),
        (status = 409, description = "La base no tiene la columna estado")
    ),
    security(("api_jwt" = []))
)]
pub async fn change_ticket_status(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i64>,
    Json(payload): Json<StatusPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let ticket = app_state
        .ticket_service
        .change_status(&app_state.db_pool, id, &payload.status)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(ticket)))
}

// PUT /api/tickets/{id}/technician
#[utoipa::path(
    put,
    path = "/api/tickets/{id}/technician",
    tag = "Tickets",
    params(("id" = i64, Path, description = "ID de la asistencia")),
    request_body = AssignPayload,
    responses(
        (status = 200, description = "Técnico asignado", body = Ticket),
        (status = 404, description = "No existe la asistencia o el técnico")
    ),
    security(("api_jwt" = []))
)]
pub async fn assign_ticket_technician(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i64>,
    Json(payload): Json<AssignPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let ticket = app_state
        .ticket_service
        .assign_technician(&app_state.db_pool, id, payload.technician_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(ticket)))
}

// GET /api/agenda
#[utoipa::path(
    get,
    path = "/api/agenda",
    tag = "Agenda",
    params(AgendaQuery),
    responses(
        (status = 200, description = "Asistencias programadas del día", body = AgendaView),
        (status = 400, description = "Fecha o estado inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_agenda(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<AgendaQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (mut view, warning) = app_state
        .ticket_service
        .agenda(&app_state.db_pool, &query)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    // Base sin `programada_en`: agenda vacía con aviso
    if let Some(missing) = warning {
        view.warning = Some(missing.to_api_error(&locale, &app_state.i18n_store).error);
    }

    Ok((StatusCode::OK, Json(view)))
}
