use std::fmt;

use allocation::{SubscriberId, ValidationError};
use thiserror::Error;

/// Fatal problems with the uploaded input. Nothing is processed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Please upload a file first.")]
    NoFile,

    #[error("Uploaded file contains no sheets.")]
    NoSheet,

    #[error("File has no data rows.")]
    NoDataRows,
}

/// Failure of a single store call.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("lead count for subscriber {subscriber_id} changed (expected {expected})")]
    CounterConflict {
        subscriber_id: SubscriberId,
        expected: u32,
    },

    #[error("duplicate record: {0}")]
    Duplicate(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// The store call a lead was at when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationStage {
    FindSubscribers,
    CreateLead,
    CreateAssignment,
    UpdateCount,
}

impl fmt::Display for MutationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MutationStage::FindSubscribers => "find subscribers",
            MutationStage::CreateLead => "create lead",
            MutationStage::CreateAssignment => "create assignment",
            MutationStage::UpdateCount => "update lead count",
        };
        f.write_str(s)
    }
}

/// Per-lead failure. Caught at the lead boundary; never aborts the batch.
#[derive(Error, Debug)]
pub enum LeadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{stage} failed: {source}")]
    Store {
        stage: MutationStage,
        #[source]
        source: StoreError,
    },
}

impl LeadError {
    pub fn store(stage: MutationStage) -> impl FnOnce(StoreError) -> LeadError {
        move |source| LeadError::Store { stage, source }
    }
}
