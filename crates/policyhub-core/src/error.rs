//! Error taxonomy for the PolicyHub core.
//!
//! There is deliberately no `NotFound` variant: reads and update-by-id
//! paths on a missing document return `Ok(None)` / `Ok(false)` instead
//! of failing.

use thiserror::Error;
use uuid::Uuid;

use crate::{
  access::{Capability, Role},
  document::DocumentStatus,
};

#[derive(Debug, Error)]
pub enum Error {
  /// Another document already holds this reference code.
  #[error("document reference {0:?} already exists")]
  DuplicateRef(String),

  /// The row changed under a concurrent writer; nothing was applied.
  #[error("document {0} was modified by another writer")]
  VersionConflict(Uuid),

  #[error("invalid status transition {from} -> {to}")]
  InvalidTransition {
    from: DocumentStatus,
    to:   DocumentStatus,
  },

  /// The referenced category code does not exist or is inactive.
  #[error("unknown or inactive category {0:?}")]
  InactiveCategory(String),

  #[error("invalid document reference {reference:?}: {reason}")]
  InvalidRef {
    reference: String,
    reason:    &'static str,
  },

  /// Raised before any state is touched, so a forbidden call has zero
  /// side effects.
  #[error("role {role} lacks the {capability} capability")]
  Forbidden {
    role:       Role,
    capability: Capability,
  },

  /// The store's single-writer lock could not be acquired within its
  /// bounded wait.
  #[error("store unavailable: {0}")]
  StoreUnavailable(String),

  #[error("store error: {0}")]
  Store(String),

  #[error("decode error: {0}")]
  Decode(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
