pub mod auth;
pub mod customer_import;
pub mod legacy_hash;
pub mod customer_service;
pub use customer_service::CustomerService;
pub mod ticket_service;
pub use ticket_service::TicketService;
pub mod equipment_service;
pub use equipment_service::EquipmentService;
pub mod tracking_service;
pub use tracking_service::TrackingService;
pub mod document_service;
pub use document_service::DocumentService;
