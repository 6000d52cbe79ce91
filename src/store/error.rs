use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid session id: {0}")]
    InvalidSessionId(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed cluster document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Store lock poisoned")]
    LockPoisoned,
}
