use serde::{Deserialize, Serialize};

/// A step in the import clearance sequence, in processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    ClientDetails,
    DocumentCollection,
    TaxComputation,
    ReadyForLodgement,
    Lodged,
    PaymentCompleted,
    PortRelease,
    InTransit,
    Delivered,
}

impl Stage {
    pub const ALL: [Stage; 9] = [
        Stage::ClientDetails,
        Stage::DocumentCollection,
        Stage::TaxComputation,
        Stage::ReadyForLodgement,
        Stage::Lodged,
        Stage::PaymentCompleted,
        Stage::PortRelease,
        Stage::InTransit,
        Stage::Delivered,
    ];

    pub const INITIAL: Stage = Stage::ClientDetails;
    pub const TERMINAL: Stage = Stage::Delivered;

    pub fn index(self) -> usize {
        // ALL is declared in discriminant order
        self as usize
    }

    pub fn next(self) -> Option<Stage> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn is_terminal(self) -> bool {
        self == Self::TERMINAL
    }

    pub fn code(self) -> &'static str {
        match self {
            Stage::ClientDetails => "CLIENT_DETAILS",
            Stage::DocumentCollection => "DOCUMENT_COLLECTION",
            Stage::TaxComputation => "TAX_COMPUTATION",
            Stage::ReadyForLodgement => "READY_FOR_LODGEMENT",
            Stage::Lodged => "LODGED",
            Stage::PaymentCompleted => "PAYMENT_COMPLETED",
            Stage::PortRelease => "PORT_RELEASE",
            Stage::InTransit => "IN_TRANSIT",
            Stage::Delivered => "DELIVERED",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::ClientDetails => "Client Details",
            Stage::DocumentCollection => "Document Collection & Verification",
            Stage::TaxComputation => "Tax/Duty Computation",
            Stage::ReadyForLodgement => "Ready for Lodgement",
            Stage::Lodged => "Lodged",
            Stage::PaymentCompleted => "Payment Completed",
            Stage::PortRelease => "Port Release",
            Stage::InTransit => "In Transit",
            Stage::Delivered => "Delivered",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Display status of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    InProgress,
    Partial,
    Complete,
}
