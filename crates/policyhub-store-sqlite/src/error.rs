//! Mapping from driver errors to the shared error taxonomy.

use policyhub_core::Error;

/// Map a `tokio_rusqlite` failure onto the core taxonomy.
///
/// A busy or locked database means the single-writer lock could not be
/// acquired within the configured `busy_timeout`, which callers treat
/// as a transient `StoreUnavailable`. Everything else is an opaque
/// store failure — domain conflicts (duplicate reference, stale row
/// version) are detected inside the transactions themselves, not
/// inferred from constraint messages.
pub(crate) fn map_db(e: tokio_rusqlite::Error) -> Error {
  if let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(
    code,
    _,
  )) = &e
    && matches!(
      code.code,
      rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
    )
  {
    return Error::StoreUnavailable(e.to_string());
  }
  Error::Store(e.to_string())
}
