//! Document — the governed artifact tracked by the register.
//!
//! A document row is mutable, but only through the lifecycle service,
//! and every observed change is mirrored into the append-only history
//! ledger. The classification enums are closed; their prefixes, display
//! names, and intervals are plain data, not behaviour.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schedule::{self, ReviewStatus, ReviewThresholds};

// ─── Document type ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
  Policy,
  Procedure,
  Manual,
  HrOthers,
}

impl DocumentType {
  pub const ALL: [DocumentType; 4] = [
    DocumentType::Policy,
    DocumentType::Procedure,
    DocumentType::Manual,
    DocumentType::HrOthers,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Policy => "POLICY",
      Self::Procedure => "PROCEDURE",
      Self::Manual => "MANUAL",
      Self::HrOthers => "HR_OTHERS",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "POLICY" => Some(Self::Policy),
      "PROCEDURE" => Some(Self::Procedure),
      "MANUAL" => Some(Self::Manual),
      "HR_OTHERS" => Some(Self::HrOthers),
      _ => None,
    }
  }

  pub fn display_name(self) -> &'static str {
    match self {
      Self::Policy => "Policy",
      Self::Procedure => "Procedure",
      Self::Manual => "Manual",
      Self::HrOthers => "HR Others",
    }
  }

  /// Reference code prefix for this document type (`POL-AML-001`).
  pub fn ref_prefix(self) -> &'static str {
    match self {
      Self::Policy => "POL",
      Self::Procedure => "PROC",
      Self::Manual => "MAN",
      Self::HrOthers => "HR",
    }
  }
}

impl fmt::Display for DocumentType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.pad(self.as_str())
  }
}

// ─── Document status ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
  Draft,
  Active,
  UnderReview,
  Superseded,
  Archived,
}

impl DocumentStatus {
  pub const ALL: [DocumentStatus; 5] = [
    DocumentStatus::Draft,
    DocumentStatus::Active,
    DocumentStatus::UnderReview,
    DocumentStatus::Superseded,
    DocumentStatus::Archived,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Draft => "DRAFT",
      Self::Active => "ACTIVE",
      Self::UnderReview => "UNDER_REVIEW",
      Self::Superseded => "SUPERSEDED",
      Self::Archived => "ARCHIVED",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "DRAFT" => Some(Self::Draft),
      "ACTIVE" => Some(Self::Active),
      "UNDER_REVIEW" => Some(Self::UnderReview),
      "SUPERSEDED" => Some(Self::Superseded),
      "ARCHIVED" => Some(Self::Archived),
      _ => None,
    }
  }

  pub fn display_name(self) -> &'static str {
    match self {
      Self::Draft => "Draft",
      Self::Active => "Active",
      Self::UnderReview => "Under Review",
      Self::Superseded => "Superseded",
      Self::Archived => "Archived",
    }
  }

  /// Superseded and archived documents accept no further transitions.
  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Superseded | Self::Archived)
  }

  /// The enforced transition table. Every allowed edge is listed; any
  /// other status change is rejected before a write is attempted.
  pub fn can_transition_to(self, to: DocumentStatus) -> bool {
    use DocumentStatus::*;
    matches!(
      (self, to),
      (Draft, Active)
        | (Draft, Archived)
        | (Active, UnderReview)
        | (Active, Superseded)
        | (Active, Archived)
        | (UnderReview, Active)
        | (UnderReview, Superseded)
        | (UnderReview, Archived)
    )
  }
}

impl fmt::Display for DocumentStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.pad(self.as_str())
  }
}

// ─── Review frequency ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewFrequency {
  Annual,
  SemiAnnual,
  Quarterly,
  AdHoc,
}

impl ReviewFrequency {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Annual => "ANNUAL",
      Self::SemiAnnual => "SEMI_ANNUAL",
      Self::Quarterly => "QUARTERLY",
      Self::AdHoc => "AD_HOC",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "ANNUAL" => Some(Self::Annual),
      "SEMI_ANNUAL" => Some(Self::SemiAnnual),
      "QUARTERLY" => Some(Self::Quarterly),
      "AD_HOC" => Some(Self::AdHoc),
      _ => None,
    }
  }

  pub fn display_name(self) -> &'static str {
    match self {
      Self::Annual => "Annual",
      Self::SemiAnnual => "Semi-Annual",
      Self::Quarterly => "Quarterly",
      Self::AdHoc => "Ad Hoc",
    }
  }

  /// Days between reviews. `None` for ad-hoc: there is no automatic
  /// interval and the next review date is operator-supplied.
  pub fn interval_days(self) -> Option<i64> {
    match self {
      Self::Annual => Some(365),
      Self::SemiAnnual => Some(182),
      Self::Quarterly => Some(91),
      Self::AdHoc => None,
    }
  }
}

impl fmt::Display for ReviewFrequency {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.pad(self.as_str())
  }
}

// ─── Document ────────────────────────────────────────────────────────────────

/// One row of the register.
///
/// `doc_ref` is folded to uppercase at write time and treated as
/// immutable after creation. `row_version` is an internal counter used
/// to detect concurrent writers; it never reaches the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
  pub doc_id:           Uuid,
  pub doc_type:         DocumentType,
  pub doc_ref:          String,
  pub title:            String,
  pub description:      Option<String>,
  pub category:         String,
  pub owner:            String,
  pub approver:         Option<String>,
  pub status:           DocumentStatus,
  /// Free-form version label, e.g. "2.1".
  pub version:          String,
  pub effective_date:   NaiveDate,
  pub last_review_date: NaiveDate,
  /// Derived from `last_review_date` + frequency, except for ad-hoc
  /// documents where it is operator-supplied (and may be absent).
  pub next_review_date: Option<NaiveDate>,
  pub review_frequency: ReviewFrequency,
  pub notes:            Option<String>,
  pub row_version:      i64,
  pub created_at:       DateTime<Utc>,
  pub created_by:       String,
  pub updated_at:       DateTime<Utc>,
  pub updated_by:       String,
}

impl Document {
  /// Review urgency classification, computed against a caller-supplied
  /// date. Never stored.
  pub fn review_status(
    &self,
    today: NaiveDate,
    thresholds: ReviewThresholds,
  ) -> ReviewStatus {
    schedule::review_status(self.next_review_date, today, thresholds)
  }
}

// ─── NewDocument ─────────────────────────────────────────────────────────────

/// Input to document creation. Identity, audit stamps, and the row
/// version are assigned by the service, never accepted from callers.
#[derive(Debug, Clone)]
pub struct NewDocument {
  pub doc_type:         DocumentType,
  pub doc_ref:          String,
  pub title:            String,
  pub description:      Option<String>,
  pub category:         String,
  pub owner:            String,
  pub approver:         Option<String>,
  pub status:           DocumentStatus,
  pub version:          String,
  pub effective_date:   NaiveDate,
  pub last_review_date: NaiveDate,
  /// Used as supplied when present; derived from `last_review_date` +
  /// frequency when absent (stays empty for ad-hoc).
  pub next_review_date: Option<NaiveDate>,
  pub review_frequency: ReviewFrequency,
  pub notes:            Option<String>,
}

// ─── DocumentPatch ───────────────────────────────────────────────────────────

/// A partial update. `Some` means "set this field"; fields left `None`
/// are untouched. `doc_ref` is absent on purpose: references are fixed
/// at creation.
#[derive(Debug, Clone, Default)]
pub struct DocumentPatch {
  pub title:            Option<String>,
  pub description:      Option<String>,
  pub category:         Option<String>,
  pub owner:            Option<String>,
  pub approver:         Option<String>,
  pub status:           Option<DocumentStatus>,
  pub version:          Option<String>,
  pub effective_date:   Option<NaiveDate>,
  pub last_review_date: Option<NaiveDate>,
  pub next_review_date: Option<NaiveDate>,
  pub review_frequency: Option<ReviewFrequency>,
  pub notes:            Option<String>,
}
