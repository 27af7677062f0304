#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The store refused a write because it would break a uniqueness, range, or other declared constraint.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Unknown table {0}")]
    UnknownTable(String),

    #[error("Table {table} has no column {column}")]
    UnknownColumn { table: String, column: String },

    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Invalid row: {0}")]
    InvalidRow(String),

    #[error("Invalid timestamp: {0}")]
    Timestamp(String),

    #[error("Sqlite error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Error::ConstraintViolation(_))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::SqliteFailure(ref failure, ref message)
                if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Error::ConstraintViolation(
                    message.clone().unwrap_or_else(|| failure.to_string()),
                )
            }
            e => Error::Sqlite(e),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
