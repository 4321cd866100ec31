use serde::Serialize;

use crate::models::shipment::Shipment;
use crate::workflow::Stage;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageCount {
    pub stage: Stage,
    pub label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentStats {
    pub by_stage: Vec<StageCount>,
    pub active: usize,
    pub completed: usize,
}

/// A shipment counts as completed once its delivery stage has been closed.
pub fn is_completed(shipment: &Shipment) -> bool {
    shipment.completion_date.is_some()
}

pub fn shipment_stats(shipments: &[Shipment]) -> ShipmentStats {
    let by_stage = Stage::ALL
        .iter()
        .map(|&stage| StageCount {
            stage,
            label: stage.label(),
            count: shipments.iter().filter(|s| s.status == stage).count(),
        })
        .collect();
    let completed = shipments.iter().filter(|s| is_completed(s)).count();

    ShipmentStats {
        by_stage,
        active: shipments.len() - completed,
        completed,
    }
}
