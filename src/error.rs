use crate::data::{CourseCode, Roll, RoomNumber, SlotKey};
use serde::Serialize;
use thiserror::Error;

/// Errors that abort a run before or while reading its inputs.
#[derive(Debug, Error)]
pub enum SeatingError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("{file}:{line}: {detail}")]
    InvalidRow {
        file: String,
        line: u64,
        detail: String,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("slot worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Problems with a single room or course. These are logged and the run continues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AllocationIssue {
    #[error("room {room} rejected: capacity {capacity} is not a positive seat count")]
    #[serde(rename_all = "camelCase")]
    InvalidRoomCapacity { room: RoomNumber, capacity: i64 },

    #[error("{}missing reference data for {subject}: {detail}", slot_prefix(.slot))]
    #[serde(rename_all = "camelCase")]
    MissingReferenceData {
        slot: Option<SlotKey>,
        subject: String,
        detail: String,
    },

    #[error("{}course {course} skipped, duplicate roster entries: {}", slot_prefix(.slot), .rolls.join(";"))]
    #[serde(rename_all = "camelCase")]
    DuplicateRosterEntry {
        slot: Option<SlotKey>,
        course: CourseCode,
        rolls: Vec<Roll>,
    },
}

fn slot_prefix(slot: &Option<SlotKey>) -> String {
    slot.map(|s| format!("{}: ", s)).unwrap_or_default()
}
