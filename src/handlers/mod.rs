pub mod auth;
pub mod customers;
pub mod equipment;
pub mod reports;
pub mod tickets;
pub mod tracking;
