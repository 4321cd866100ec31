pub mod client;
pub mod response;
pub mod shipment;
pub mod user;
