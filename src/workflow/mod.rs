//! Import clearance workflow: stage progression, document checklist and
//! reference numbers. Everything here is pure and operates on decoded
//! shipment sub-documents; persistence lives in the shipment service.

pub mod checklist;
pub mod reference;
pub mod stage;
pub mod tracker;

pub use stage::{Stage, StageStatus};
pub use tracker::{
    Advance, ClientDetailsCheck, ConfirmationPrompt, StageCard, WorkflowTracker,
    check_client_details,
};
