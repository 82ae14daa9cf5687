// src/handlers/reports.rs

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};

use crate::{common::error::ApiError, config::AppState, middleware::i18n::Locale};

// GET /api/reports/tickets.pdf
#[utoipa::path(
    get,
    path = "/api/reports/tickets.pdf",
    tag = "Reports",
    responses(
        (status = 200, description = "Listado de asistencias en PDF", content_type = "application/pdf"),
        (status = 500, description = "No se encontraron las fuentes")
    ),
    security(("api_jwt" = []))
)]
pub async fn tickets_pdf(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<Response, ApiError> {
    let pdf_bytes = app_state
        .document_service
        .generate_tickets_pdf(&app_state.db_pool)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    let headers = [
        (header::CONTENT_TYPE, "application/pdf"),
        (header::CONTENT_DISPOSITION, "attachment; filename=\"reporte_asistencias.pdf\""),
    ];

    Ok((headers, pdf_bytes).into_response())
}

// GET /api/reports/tickets.docx
#[utoipa::path(
    get,
    path = "/api/reports/tickets.docx",
    tag = "Reports",
    responses(
        (status = 200, description = "Listado de asistencias en Word",
         content_type = "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        (status = 500, description = "No se pudo generar el documento")
    ),
    security(("api_jwt" = []))
)]
pub async fn tickets_docx(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<Response, ApiError> {
    let docx_bytes = app_state
        .document_service
        .generate_tickets_docx(&app_state.db_pool)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    let headers = [
        (
            header::CONTENT_TYPE,
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ),
        (header::CONTENT_DISPOSITION, "attachment; filename=\"asistencias.docx\""),
    ];

    Ok((headers, docx_bytes).into_response())
}
