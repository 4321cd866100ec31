use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Stage, StageStatus};
use crate::models::shipment::{
    ConsigneeSnapshot, ExporterSnapshot, FreightType, ShipmentDetails, TimelineEntry,
};

/// What a call to [`WorkflowTracker::complete_current_stage`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Advance {
    Advanced { from: Stage, to: Stage },
    /// The terminal stage was completed for the first time.
    Finished,
    /// The terminal stage had already been completed; nothing changed.
    AlreadyFinished,
}

/// Current stage plus timeline of one shipment.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowTracker {
    current: Stage,
    timeline: Vec<TimelineEntry>,
}

impl WorkflowTracker {
    pub fn new(current: Stage, timeline: Vec<TimelineEntry>) -> Self {
        Self { current, timeline }
    }

    pub fn current(&self) -> Stage {
        self.current
    }

    pub fn timeline(&self) -> &[TimelineEntry] {
        &self.timeline
    }

    pub fn into_parts(self) -> (Stage, Vec<TimelineEntry>) {
        (self.current, self.timeline)
    }

    /// Recorded status if the timeline mentions `stage`, otherwise one
    /// derived from its position relative to the current stage.
    pub fn stage_status(&self, stage: Stage) -> StageStatus {
        let recorded = self
            .timeline
            .iter()
            .filter(|entry| entry.stage == stage)
            .max_by_key(|entry| entry.timestamp);

        if let Some(entry) = recorded {
            return entry.status;
        }

        match stage.index().cmp(&self.current.index()) {
            std::cmp::Ordering::Less => StageStatus::Partial,
            std::cmp::Ordering::Equal => StageStatus::InProgress,
            std::cmp::Ordering::Greater => StageStatus::Pending,
        }
    }

    fn terminal_completed(&self) -> bool {
        self.timeline
            .iter()
            .any(|entry| entry.stage == Stage::TERMINAL && entry.status == StageStatus::Complete)
    }

    /// Records the current stage as complete and moves one step forward.
    pub fn complete_current_stage(&mut self, now: DateTime<Utc>) -> Advance {
        if self.current.is_terminal() && self.terminal_completed() {
            return Advance::AlreadyFinished;
        }

        self.timeline.push(TimelineEntry {
            stage: self.current,
            status: StageStatus::Complete,
            timestamp: now,
        });

        match self.current.next() {
            Some(next) => {
                let from = self.current;
                self.current = next;
                Advance::Advanced { from, to: next }
            }
            None => Advance::Finished,
        }
    }

    pub fn board(&self) -> Vec<StageCard> {
        Stage::ALL
            .iter()
            .map(|&stage| StageCard {
                stage,
                label: stage.label(),
                position: stage.index() + 1,
                status: self.stage_status(stage),
                is_current: stage == self.current,
            })
            .collect()
    }
}

/// One column of the stage board.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageCard {
    pub stage: Stage,
    pub label: &'static str,
    pub position: usize,
    pub status: StageStatus,
    pub is_current: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDetailsCheck {
    pub is_complete: bool,
    pub missing_fields: Vec<&'static str>,
}

impl ClientDetailsCheck {
    pub fn prompt(&self) -> ConfirmationPrompt {
        if self.is_complete {
            ConfirmationPrompt::Complete
        } else {
            ConfirmationPrompt::Partial {
                missing_fields: self.missing_fields.clone(),
            }
        }
    }
}

/// Wording of the dialog shown before completing the client details stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConfirmationPrompt {
    Complete,
    #[serde(rename_all = "camelCase")]
    Partial { missing_fields: Vec<&'static str> },
}

impl ConfirmationPrompt {
    pub fn message(&self) -> String {
        match self {
            ConfirmationPrompt::Complete => {
                "All client details are complete. Proceed to document collection?".to_string()
            }
            ConfirmationPrompt::Partial { missing_fields } => format!(
                "Some client details are missing ({}). Proceed with incomplete data?",
                missing_fields.join(", ")
            ),
        }
    }
}

fn filled(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Checks the grouped required fields of the client details stage.
pub fn check_client_details(
    freight: FreightType,
    consignee: &ConsigneeSnapshot,
    exporter: &ExporterSnapshot,
    details: &ShipmentDetails,
) -> ClientDetailsCheck {
    let transport_id = match freight {
        FreightType::Sea => &details.bl_number,
        FreightType::Air => &details.flight_number,
    };

    let groups = [
        ("consignee", filled(&consignee.name) && filled(&consignee.address)),
        ("exporter", filled(&exporter.name) && filled(&exporter.address)),
        (
            "shipmentDetails",
            filled(&details.port_of_origin)
                && filled(&details.port_of_discharge)
                && filled(transport_id),
        ),
    ];

    let missing_fields: Vec<&'static str> = groups
        .iter()
        .filter(|(_, ok)| !ok)
        .map(|(name, _)| *name)
        .collect();

    ClientDetailsCheck {
        is_complete: missing_fields.is_empty(),
        missing_fields,
    }
}
