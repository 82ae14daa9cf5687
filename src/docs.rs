// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::forgot_password,

        // --- Users ---
        handlers::auth::get_me,

        // --- Customers ---
        handlers::customers::list_customers,
        handlers::customers::create_customer,
        handlers::customers::customer_summary,
        handlers::customers::get_customer,
        handlers::customers::update_customer,
        handlers::customers::delete_customer,
        handlers::customers::toggle_customer,
        handlers::customers::purge_customers,
        handlers::customers::import_customers,

        // --- Tickets ---
        handlers::tickets::list_tickets,
        handlers::tickets::create_ticket,
        handlers::tickets::form_options,
        handlers::tickets::get_ticket,
        handlers::tickets::reschedule_ticket,
        handlers::tickets::change_ticket_status,
        handlers::tickets::assign_ticket_technician,
        handlers::tickets::get_agenda,

        // --- Equipment ---
        handlers::equipment::equipment_overview,
        handlers::equipment::create_equipment,
        handlers::equipment::create_tool,
        handlers::equipment::register_usage,
        handlers::equipment::upload_tool_image,
        handlers::equipment::upload_installation_photo,

        // --- Tracking ---
        handlers::tracking::gps_ping_query,
        handlers::tracking::gps_ping_form,
        handlers::tracking::map_data,
        handlers::tracking::list_technicians,
        handlers::tracking::create_technician,
        handlers::tracking::technician_trajectory,

        // --- Reports ---
        handlers::reports::tickets_pdf,
        handlers::reports::tickets_docx,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::ForgotPasswordPayload,
            models::auth::AuthResponse,

            // --- Customers ---
            models::customer::Customer,
            models::customer::CustomerPayload,
            models::customer::CustomerList,
            models::customer::CustomerDetail,
            models::customer::CustomerSummary,
            models::customer::PurgeReport,
            models::customer::ImportReport,

            // --- Tickets ---
            models::ticket::TicketStatus,
            models::ticket::Ticket,
            models::ticket::CreateTicketPayload,
            models::ticket::ReschedulePayload,
            models::ticket::StatusPayload,
            models::ticket::AssignPayload,
            models::ticket::CustomerOption,
            models::ticket::TechnicianOption,
            models::ticket::TicketFormOptions,
            models::agenda::AgendaEvent,
            models::agenda::AgendaView,

            // --- Equipment ---
            models::equipment::Equipment,
            models::equipment::Tool,
            models::equipment::ItemType,
            models::equipment::UsageRecord,
            models::equipment::EquipmentStats,
            models::equipment::EquipmentOverview,
            models::equipment::CreateEquipmentPayload,
            models::equipment::CreateToolPayload,
            models::equipment::UsagePayload,
            models::equipment::InstallationPhoto,

            // --- Tracking ---
            models::tracking::Technician,
            models::tracking::CreateTechnicianPayload,
            models::tracking::TrackPoint,
            models::tracking::TechnicianLastPosition,
            models::tracking::MapTicket,
            models::tracking::MapData,
        )
    ),
    tags(
        (name = "Auth", description = "Registro, login y recuperación de contraseña"),
        (name = "Users", description = "Usuario de la sesión"),
        (name = "Customers", description = "Clientes e importación CSV"),
        (name = "Tickets", description = "Asistencias técnicas"),
        (name = "Agenda", description = "Asistencias programadas por día"),
        (name = "Equipment", description = "Equipos, herramientas y fotos"),
        (name = "Tracking", description = "Técnicos, GPS y mapa"),
        (name = "Reports", description = "Exportación PDF")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
