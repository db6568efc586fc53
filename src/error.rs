use thiserror::Error;

/// Errors surfaced across the `open`/`close` lifecycle boundary.
///
/// Nothing in the hot lookup path returns one of these to the caller —
/// every per-query step folds its own failure into the no-match
/// fallback its pipeline position defines instead. Only `Core::open`
/// propagates a fatal variant to its caller.
///
/// `PrepareFailedCritical`/`PrepareFailedOptional`/`StoreBusy` describe
/// failures that originate inside a concrete `PolicyStore`/`StoreHandle`
/// implementation (statement preparation, busy-timeout handling). The
/// on-disk store format is a backend concern, not this crate's, so it
/// never constructs these itself; a backend returns them from its
/// trait methods and this crate's pipeline folds them into "no match"
/// the same way it folds its own `Store` errors.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no store path configured")]
    ConfigAbsent,

    #[error("failed to open policy store: {0}")]
    StoreOpenFailed(String),

    #[error("failed to prepare critical statement: {0}")]
    PrepareFailedCritical(String),

    #[error("failed to prepare optional statement: {0}")]
    PrepareFailedOptional(String),

    #[error("store busy past the configured timeout")]
    StoreBusy,

    #[error("store error: {0}")]
    Store(String),

    #[error("invalid query name: {0}")]
    InvalidName(String),

    #[error("composed alias exceeds the 1023-byte bound")]
    Overlong,
}

pub type Result<T> = std::result::Result<T, CoreError>;
