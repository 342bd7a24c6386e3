use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("lead is missing 'Service_Category'")]
    MissingCategory,

    #[error("unknown plan: {0}")]
    UnknownPlan(String),

    #[error("unknown lead status: {0}")]
    UnknownStatus(String),
}
