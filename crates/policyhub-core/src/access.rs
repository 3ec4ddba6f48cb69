//! Role-based capability checks.
//!
//! The authorization boundary is explicit: every lifecycle operation
//! evaluates [`check`] before touching any state, so a forbidden call
//! has zero side effects. The role→capability matrix is pure data.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ─── Role ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
  Admin,
  Editor,
  Viewer,
}

impl Role {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Admin => "ADMIN",
      Self::Editor => "EDITOR",
      Self::Viewer => "VIEWER",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "ADMIN" => Some(Self::Admin),
      "EDITOR" => Some(Self::Editor),
      "VIEWER" => Some(Self::Viewer),
      _ => None,
    }
  }

  /// The capability matrix. Admins hold everything; editors everything
  /// except hard deletion; viewers only read.
  pub fn grants(self, capability: Capability) -> bool {
    match self {
      Role::Admin => true,
      Role::Editor => !matches!(capability, Capability::DeleteDocument),
      Role::Viewer => matches!(capability, Capability::ViewDocuments),
    }
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.pad(self.as_str())
  }
}

// ─── Capability ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capability {
  ViewDocuments,
  CreateDocument,
  EditDocument,
  MarkReviewed,
  DeleteDocument,
}

impl Capability {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::ViewDocuments => "VIEW_DOCUMENTS",
      Self::CreateDocument => "CREATE_DOCUMENT",
      Self::EditDocument => "EDIT_DOCUMENT",
      Self::MarkReviewed => "MARK_REVIEWED",
      Self::DeleteDocument => "DELETE_DOCUMENT",
    }
  }
}

impl fmt::Display for Capability {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.pad(self.as_str())
  }
}

// ─── Actor ───────────────────────────────────────────────────────────────────

/// The authenticated caller, as supplied by the external session layer.
/// Threaded explicitly through every lifecycle call — there is no
/// ambient "current user".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
  /// Opaque user id; recorded verbatim in audit stamps.
  pub id:   String,
  pub role: Role,
}

impl Actor {
  pub fn new(id: impl Into<String>, role: Role) -> Self {
    Self { id: id.into(), role }
  }
}

// ─── Check ───────────────────────────────────────────────────────────────────

/// Outcome of a capability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
  Allowed,
  Forbidden {
    role:       Role,
    capability: Capability,
  },
}

pub fn check(role: Role, capability: Capability) -> Access {
  if role.grants(capability) {
    Access::Allowed
  } else {
    Access::Forbidden { role, capability }
  }
}

impl Access {
  /// Convert a denial into the `Forbidden` error.
  pub fn require(self) -> Result<()> {
    match self {
      Access::Allowed => Ok(()),
      Access::Forbidden { role, capability } => {
        Err(Error::Forbidden { role, capability })
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn admin_holds_every_capability() {
    for capability in [
      Capability::ViewDocuments,
      Capability::CreateDocument,
      Capability::EditDocument,
      Capability::MarkReviewed,
      Capability::DeleteDocument,
    ] {
      assert_eq!(check(Role::Admin, capability), Access::Allowed);
    }
  }

  #[test]
  fn editor_cannot_delete() {
    assert_eq!(check(Role::Editor, Capability::EditDocument), Access::Allowed);
    assert!(matches!(
      check(Role::Editor, Capability::DeleteDocument),
      Access::Forbidden { .. }
    ));
  }

  #[test]
  fn viewer_is_read_only() {
    assert_eq!(check(Role::Viewer, Capability::ViewDocuments), Access::Allowed);
    for capability in [
      Capability::CreateDocument,
      Capability::EditDocument,
      Capability::MarkReviewed,
      Capability::DeleteDocument,
    ] {
      assert!(check(Role::Viewer, capability).require().is_err());
    }
  }
}
