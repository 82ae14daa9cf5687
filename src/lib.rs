// src/lib.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod common;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use crate::{config::AppState, docs::ApiDoc, middleware::auth::auth_guard};

/// Router completo de la aplicación.
pub fn build_router(app_state: AppState) -> Router {
    // Rutas públicas de autenticación
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/forgot-password", post(handlers::auth::forgot_password));

    // El celular del técnico manda el ping sin sesión
    let gps_routes = Router::new().route(
        "/gps",
        get(handlers::tracking::gps_ping_query).post(handlers::tracking::gps_ping_form),
    );

    let user_routes = Router::new().route("/me", get(handlers::auth::get_me));

    let customer_routes = Router::new()
        .route(
            "/",
            get(handlers::customers::list_customers).post(handlers::customers::create_customer),
        )
        .route("/summary", get(handlers::customers::customer_summary))
        .route("/import", post(handlers::customers::import_customers))
        .route("/purge", post(handlers::customers::purge_customers))
        .route(
            "/{id}",
            get(handlers::customers::get_customer)
                .put(handlers::customers::update_customer)
                .delete(handlers::customers::delete_customer),
        )
        .route("/{id}/toggle", post(handlers::customers::toggle_customer));

    let ticket_routes = Router::new()
        .route(
            "/",
            get(handlers::tickets::list_tickets).post(handlers::tickets::create_ticket),
        )
        .route("/form-options", get(handlers::tickets::form_options))
        .route("/{id}", get(handlers::tickets::get_ticket))
        .route("/{id}/schedule", put(handlers::tickets::reschedule_ticket))
        .route("/{id}/status", put(handlers::tickets::change_ticket_status))
        .route("/{id}/technician", put(handlers::tickets::assign_ticket_technician));

    let equipment_routes = Router::new()
        .route(
            "/",
            get(handlers::equipment::equipment_overview).post(handlers::equipment::create_equipment),
        )
        .route("/tools", post(handlers::equipment::create_tool))
        .route("/tools/{id}/image", post(handlers::equipment::upload_tool_image))
        .route("/usage", post(handlers::equipment::register_usage))
        .route("/photos", post(handlers::equipment::upload_installation_photo));

    let technician_routes = Router::new()
        .route(
            "/",
            get(handlers::tracking::list_technicians).post(handlers::tracking::create_technician),
        )
        .route("/{id}/trajectory", get(handlers::tracking::technician_trajectory));

    // Todo lo que requiere sesión
    let protected = Router::new()
        .nest("/users", user_routes)
        .nest("/customers", customer_routes)
        .nest("/tickets", ticket_routes)
        .nest("/equipment", equipment_routes)
        .nest("/technicians", technician_routes)
        .route("/agenda", get(handlers::tickets::get_agenda))
        .route("/map", get(handlers::tracking::map_data))
        .route("/reports/tickets.pdf", get(handlers::reports::tickets_pdf))
        .route("/reports/tickets.docx", get(handlers::reports::tickets_docx))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let static_dir = ServeDir::new(app_state.config.upload_dir.clone());

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .nest("/api", protected)
        .merge(gps_routes)
        .nest_service("/static", static_dir)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
