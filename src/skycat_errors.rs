use thiserror::Error;

/// Crate-wide error type.
///
/// Every fallible operation in the catalog layer and the moving-object batch
/// processor surfaces one of these variants. There are no retries and no
/// partial-failure recovery anywhere: a failure aborts the enclosing
/// operation and propagates to the caller. The single logged-and-continued
/// case (duplicate catalog registration) never reaches this type.
#[derive(Error, Debug)]
pub enum SkycatError {
    #[error("Invalid catalog configuration: {0}")]
    Configuration(String),

    #[error("Unknown column name: {0}")]
    UnknownColumn(String),

    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("Ephemeris engine call failed with status {0}")]
    ExternalCall(i32),

    #[error("Precondition not met: {0}")]
    Precondition(String),

    #[error("Invalid epoch timescale code: {0}")]
    InvalidTimescale(i32),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Unable to perform file operation: {0}")]
    Io(#[from] std::io::Error),
}
