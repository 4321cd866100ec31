pub mod access;
pub mod auth_service;
pub mod client_service;
pub mod dashboard;
pub mod seed;
pub mod shipment_service;
pub mod statement_service;
pub mod storage;

pub use auth_service::AuthService;
pub use client_service::ClientService;
pub use shipment_service::ShipmentService;
