use crate::database::DatabaseError;
use sqlx::Error as SqlxError;
use thiserror::Error;

/// Application-level error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database errors
    #[error("SQL error: {0}")]
    Sqlx(#[from] SqlxError),

    /// Storage errors that carry no caller-facing meaning
    #[error("Repository error: {0}")]
    Repository(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed, oversized or empty input, duplicate tickers, bad portfolio size
    #[error("Validation error: {0}")]
    Validation(String),

    /// Competition or participant could not be resolved
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Display name already used in the competition (case-insensitive)
    #[error("Name already taken: {0}")]
    NameTaken(String),

    /// Competition no longer accepts joins or portfolio edits
    #[error("Competition is locked: {0}")]
    CompetitionLocked(String),

    /// The price source could not confirm the ticker exists
    #[error("Invalid ticker: {0}")]
    InvalidTicker(String),

    /// Historical lookup exhausted its search window
    #[error("Price unavailable: {0}")]
    PriceUnavailable(String),

    /// Portfolio cost is above the competition budget (plus slack)
    #[error("Budget exceeded: {0}")]
    BudgetExceeded(String),

    /// Finalize/unfinalize on a live competition
    #[error("Competition is not a backfill competition: {0}")]
    NotBackfill(String),

    #[error("Competition already finalized: {0}")]
    AlreadyFinalized(String),

    #[error("Competition is not finalized: {0}")]
    NotFinalized(String),

    /// Finalize on a backfill competition with no participants
    #[error("Competition has no participants: {0}")]
    EmptyCompetition(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Message(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Check if error is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }

    /// Stable machine-readable name of the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "ValidationError",
            AppError::NotFound(_) => "NotFound",
            AppError::NameTaken(_) => "NameTaken",
            AppError::CompetitionLocked(_) => "CompetitionLocked",
            AppError::InvalidTicker(_) => "InvalidTicker",
            AppError::PriceUnavailable(_) => "PriceUnavailable",
            AppError::BudgetExceeded(_) => "BudgetExceeded",
            AppError::NotBackfill(_) => "NotBackfill",
            AppError::AlreadyFinalized(_) => "AlreadyFinalized",
            AppError::NotFinalized(_) => "NotFinalized",
            AppError::EmptyCompetition(_) => "EmptyCompetition",
            AppError::Config(_) => "ConfigError",
            _ => "InternalError",
        }
    }

    /// Get HTTP status code for the error
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::NotFound(_) => 404,
            AppError::Validation(_)
            | AppError::InvalidTicker(_)
            | AppError::BudgetExceeded(_) => 400,
            AppError::NameTaken(_)
            | AppError::CompetitionLocked(_)
            | AppError::NotBackfill(_)
            | AppError::AlreadyFinalized(_)
            | AppError::NotFinalized(_)
            | AppError::EmptyCompetition(_) => 409,
            AppError::PriceUnavailable(_) => 422,
            AppError::Config(_) => 500,
            AppError::Database(_) | AppError::Sqlx(_) | AppError::Repository(_) => 500,
            _ => 500,
        }
    }
}

/// Repository-specific error types
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Database query error
    #[error("Query error: {0}")]
    Query(SqlxError),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Duplicate record
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// Constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(msg) => AppError::NotFound(msg),
            RepositoryError::Query(e) => AppError::Sqlx(e),
            RepositoryError::Duplicate(msg) => AppError::Repository(format!("Duplicate: {}", msg)),
            RepositoryError::ConstraintViolation(msg) => AppError::Validation(msg),
            RepositoryError::InvalidInput(msg) => AppError::Validation(msg),
        }
    }
}

impl From<SqlxError> for RepositoryError {
    fn from(err: SqlxError) -> Self {
        match &err {
            SqlxError::RowNotFound => RepositoryError::NotFound("Record not found".to_string()),
            SqlxError::Database(db_err) => {
                // PostgreSQL error codes
                let code = db_err.code().map(|c| c.to_string());
                match code.as_deref() {
                    Some("23505") => RepositoryError::Duplicate(db_err.message().to_string()),
                    Some("23503") | Some("23514") => {
                        RepositoryError::ConstraintViolation(db_err.message().to_string())
                    }
                    _ => RepositoryError::Query(err),
                }
            }
            _ => RepositoryError::Query(err),
        }
    }
}

/// Convenience function to convert Option<T> to Result<T, AppError>
pub fn option_to_result<T>(opt: Option<T>, error_msg: &str) -> AppResult<T> {
    opt.ok_or_else(|| AppError::NotFound(error_msg.to_string()))
}
