#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Store error: {0}")]
    Store(#[from] roster_datastore::Error),

    #[error("Student {name} has not been saved, so there is nothing in the store to change")]
    NotPersisted { name: String },
}

impl Error {
    /// True if the store refused the operation because of a duplicate email, an out-of-range grade, or another
    /// declared constraint.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Error::Store(e) if e.is_constraint_violation())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
