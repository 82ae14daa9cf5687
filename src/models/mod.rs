pub mod agenda;
pub mod auth;
pub mod customer;
pub mod equipment;
pub mod ticket;
pub mod tracking;
