use thiserror::Error;

#[derive(Error, Debug)]
pub enum GradingError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Worker pool error: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Population is empty: ranks, percentiles and correlation are undefined")]
    EmptyPopulation,

    #[error("Tier vector has {tiers} entries for a population of {population}")]
    TierMismatch { population: usize, tiers: usize },

    #[error("Unsupported input '{path}': {reason}")]
    UnsupportedInput { path: String, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type GradingResult<T> = Result<T, GradingError>;
