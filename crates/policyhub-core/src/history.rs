//! History entries — the append-only audit ledger.
//!
//! One entry records one observed change. Entries are written in the
//! same transaction as the document mutation they describe, and are
//! never updated or deleted except by the cascade when their parent
//! document is hard-deleted.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::DocumentStatus;

// ─── Action ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryAction {
  Created,
  Updated,
  StatusChanged,
  Reviewed,
  AttachmentAdded,
  AttachmentRemoved,
  LinkAdded,
  LinkRemoved,
}

impl HistoryAction {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Created => "CREATED",
      Self::Updated => "UPDATED",
      Self::StatusChanged => "STATUS_CHANGED",
      Self::Reviewed => "REVIEWED",
      Self::AttachmentAdded => "ATTACHMENT_ADDED",
      Self::AttachmentRemoved => "ATTACHMENT_REMOVED",
      Self::LinkAdded => "LINK_ADDED",
      Self::LinkRemoved => "LINK_REMOVED",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "CREATED" => Some(Self::Created),
      "UPDATED" => Some(Self::Updated),
      "STATUS_CHANGED" => Some(Self::StatusChanged),
      "REVIEWED" => Some(Self::Reviewed),
      "ATTACHMENT_ADDED" => Some(Self::AttachmentAdded),
      "ATTACHMENT_REMOVED" => Some(Self::AttachmentRemoved),
      "LINK_ADDED" => Some(Self::LinkAdded),
      "LINK_REMOVED" => Some(Self::LinkRemoved),
      _ => None,
    }
  }
}

impl fmt::Display for HistoryAction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.pad(self.as_str())
  }
}

// ─── HistoryEntry ────────────────────────────────────────────────────────────

/// An immutable record of one change to a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
  pub history_id:    Uuid,
  pub doc_id:        Uuid,
  pub action:        HistoryAction,
  /// Absent for whole-document actions (CREATED, REVIEWED, ...).
  pub field_changed: Option<String>,
  pub old_value:     Option<String>,
  pub new_value:     Option<String>,
  pub changed_by:    String,
  pub changed_at:    DateTime<Utc>,
  pub notes:         Option<String>,
}

// ─── NewHistoryEntry ─────────────────────────────────────────────────────────

/// A staged entry: the change payload without identity or attribution.
/// The service stamps it with the acting user and the clock via
/// [`NewHistoryEntry::into_entry`].
#[derive(Debug, Clone)]
pub struct NewHistoryEntry {
  pub action:        HistoryAction,
  pub field_changed: Option<String>,
  pub old_value:     Option<String>,
  pub new_value:     Option<String>,
  pub notes:         Option<String>,
}

impl NewHistoryEntry {
  fn bare(action: HistoryAction) -> Self {
    Self {
      action,
      field_changed: None,
      old_value: None,
      new_value: None,
      notes: None,
    }
  }

  pub fn created() -> Self {
    Self::bare(HistoryAction::Created)
  }

  pub fn field_change(
    field: impl Into<String>,
    old_value: Option<String>,
    new_value: Option<String>,
  ) -> Self {
    Self {
      field_changed: Some(field.into()),
      old_value,
      new_value,
      ..Self::bare(HistoryAction::Updated)
    }
  }

  pub fn status_change(old: DocumentStatus, new: DocumentStatus) -> Self {
    Self {
      field_changed: Some("status".to_owned()),
      old_value: Some(old.as_str().to_owned()),
      new_value: Some(new.as_str().to_owned()),
      ..Self::bare(HistoryAction::StatusChanged)
    }
  }

  pub fn reviewed(notes: Option<String>) -> Self {
    Self {
      notes,
      ..Self::bare(HistoryAction::Reviewed)
    }
  }

  pub fn attachment_added(filename: &str) -> Self {
    Self {
      new_value: Some(filename.to_owned()),
      ..Self::bare(HistoryAction::AttachmentAdded)
    }
  }

  pub fn attachment_removed(filename: &str) -> Self {
    Self {
      old_value: Some(filename.to_owned()),
      ..Self::bare(HistoryAction::AttachmentRemoved)
    }
  }

  pub fn link_added(link_type: &str, linked_doc_ref: &str) -> Self {
    Self {
      new_value: Some(format!("{link_type}: {linked_doc_ref}")),
      ..Self::bare(HistoryAction::LinkAdded)
    }
  }

  pub fn link_removed(link_type: &str, linked_doc_ref: &str) -> Self {
    Self {
      old_value: Some(format!("{link_type}: {linked_doc_ref}")),
      ..Self::bare(HistoryAction::LinkRemoved)
    }
  }

  /// Bind the staged change to a document, an acting user, and a time.
  pub fn into_entry(
    self,
    doc_id: Uuid,
    changed_by: &str,
    changed_at: DateTime<Utc>,
  ) -> HistoryEntry {
    HistoryEntry {
      history_id: Uuid::new_v4(),
      doc_id,
      action: self.action,
      field_changed: self.field_changed,
      old_value: self.old_value,
      new_value: self.new_value,
      changed_by: changed_by.to_owned(),
      changed_at,
      notes: self.notes,
    }
  }
}
