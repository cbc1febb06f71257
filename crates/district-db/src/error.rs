use rusqlite::ErrorCode;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("campaign is archived and can no longer be modified")]
    Archived,
    #[error("campaign is already archived")]
    AlreadyArchived,
    #[error("campaign was modified concurrently, retry the request")]
    ConcurrentModification,
    #[error("an account with this username or email already exists")]
    DuplicateAccount,
    #[error("amount must be positive and keep the collected total in range")]
    InvalidAmount,
    #[error("database lock poisoned")]
    LockPoisoned,
    #[error("database error: {0}")]
    Backend(rusqlite::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
            rusqlite::Error::SqliteFailure(e, _)
                if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) =>
            {
                StoreError::ConcurrentModification
            }
            _ => StoreError::Backend(err),
        }
    }
}

impl StoreError {
    /// Maps unique-constraint violations on the accounts table.
    pub(crate) fn from_account_insert(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
                StoreError::DuplicateAccount
            }
            _ => err.into(),
        }
    }
}
