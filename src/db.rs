pub mod schema;
pub mod seed;
pub mod user_repo;
pub use user_repo::UserRepository;
pub mod customer_repo;
pub use customer_repo::CustomerRepository;
pub mod ticket_repo;
pub use ticket_repo::TicketRepository;
pub mod equipment_repo;
pub use equipment_repo::EquipmentRepository;
pub mod tracking_repo;
pub use tracking_repo::TrackingRepository;
