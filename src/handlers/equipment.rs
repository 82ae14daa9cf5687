// src/handlers/equipment.rs

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::equipment::{
        CreateEquipmentPayload, CreateToolPayload, Equipment, EquipmentOverview, InstallationPhoto,
        Tool, UsagePayload,
    },
    services::equipment_service::UploadedFile,
};

/// Campos del formulario de fotos; solo el archivo es obligatorio.
#[derive(Default)]
struct PhotoForm {
    file: Option<UploadedFile>,
    ticket_id: Option<i64>,
    description: Option<String>,
}

async fn read_photo_form(mut multipart: Multipart, file_field: &str) -> Result<PhotoForm, AppError> {
    let mut form = PhotoForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidUpload(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == file_field {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await.map_err(|e| AppError::InvalidUpload(e.body_text()))?;
            form.file = Some(UploadedFile { file_name, bytes: bytes.to_vec() });
            continue;
        }

        let text = field.text().await.map_err(|e| AppError::InvalidUpload(e.body_text()))?;
        match name.as_str() {
            "asistencia_id" => form.ticket_id = text.trim().parse().ok(),
            "descripcion" => form.description = Some(text),
            _ => {}
        }
    }

    Ok(form)
}

// GET /api/equipment
#[utoipa::path(
    get,
    path = "/api/equipment",
    tag = "Equipment",
    responses(
        (status = 200, description = "Equipos, herramientas, historial y estadísticas", body = EquipmentOverview)
    ),
    security(("api_jwt" = []))
)]
pub async fn equipment_overview(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let overview = app_state
        .equipment_service
        .overview(&app_state.db_pool)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(overview)))
}

// POST /api/equipment
#[utoipa::path(
    post,
    path = "/api/equipment",
    tag = "Equipment",
    request_body = CreateEquipmentPayload,
    responses(
        (status = 201, description = "Equipo registrado", body = Equipment),
        (status = 400, description = "Datos inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_equipment(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<CreateEquipmentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    if let Err(e) = payload.validate() {
        return Err(AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store));
    }

    let equipment = app_state
        .equipment_service
        .register_equipment(&app_state.db_pool, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(equipment)))
}

// POST /api/equipment/tools
#[utoipa::path(
    post,
    path = "/api/equipment/tools",
    tag = "Equipment",
    request_body = CreateToolPayload,
    responses(
        (status = 201, description = "Herramienta registrada", body = Tool),
        (status = 400, description = "Datos inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_tool(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<CreateToolPayload>,
) -> Result<impl IntoResponse, ApiError> {
    if let Err(e) = payload.validate() {
        return Err(AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store));
    }

    let tool = app_state
        .equipment_service
        .register_tool(&app_state.db_pool, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(tool)))
}

// POST /api/equipment/usage
#[utoipa::path(
    post,
    path = "/api/equipment/usage",
    tag = "Equipment",
    request_body = UsagePayload,
    responses(
        (status = 201, description = "Uso registrado"),
        (status = 404, description = "No existe equipo ni herramienta con ese id")
    ),
    security(("api_jwt" = []))
)]
pub async fn register_usage(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<UsagePayload>,
) -> Result<impl IntoResponse, ApiError> {
    if let Err(e) = payload.validate() {
        return Err(AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store));
    }

    let id = app_state
        .equipment_service
        .register_usage(&app_state.db_pool, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

// POST /api/equipment/tools/{id}/image (multipart, campo "imagen")
#[utoipa::path(
    post,
    path = "/api/equipment/tools/{id}/image",
    tag = "Equipment",
    params(("id" = i64, Path, description = "ID de la herramienta")),
    request_body(content_type = "multipart/form-data", description = "Imagen en el campo 'imagen'"),
    responses(
        (status = 200, description = "Imagen guardada", body = Tool),
        (status = 400, description = "Archivo inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn upload_tool_image(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let form = read_photo_form(multipart, "imagen").await.map_err(to_api)?;
    let file = form.file.ok_or_else(|| to_api(AppError::MissingField("imagen".into())))?;

    let tool = app_state
        .equipment_service
        .upload_tool_image(&app_state.db_pool, id, &file)
        .await
        .map_err(to_api)?;

    Ok((StatusCode::OK, Json(tool)))
}

// POST /api/equipment/photos (multipart: "foto", "asistencia_id", "descripcion")
#[utoipa::path(
    post,
    path = "/api/equipment/photos",
    tag = "Equipment",
    request_body(content_type = "multipart/form-data", description = "Foto en el campo 'foto'"),
    responses(
        (status = 201, description = "Foto registrada", body = InstallationPhoto),
        (status = 400, description = "Archivo inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn upload_installation_photo(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let form = read_photo_form(multipart, "foto").await.map_err(to_api)?;
    let file = form.file.ok_or_else(|| to_api(AppError::MissingField("foto".into())))?;

    let photo = app_state
        .equipment_service
        .upload_installation_photo(
            &app_state.db_pool,
            form.ticket_id,
            user.display_name(),
            form.description.as_deref(),
            &file,
        )
        .await
        .map_err(to_api)?;

    Ok((StatusCode::CREATED, Json(photo)))
}
