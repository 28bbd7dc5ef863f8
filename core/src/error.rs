use thiserror::Error;

#[derive(Error, Debug)]
pub enum KpiError {
    #[error("Malformed {kind} row: {detail}")]
    MalformedRow { kind: &'static str, detail: String },

    #[error("Invalid plan date '{date}': expected YYYY-MM-DD")]
    InvalidPlanDate { date: String },

    #[error("Analysis already finalized")]
    AlreadyFinalized,

    #[error("Analysis not finalized yet")]
    NotFinalized,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type KpiResult<T> = Result<T, KpiError>;
