//! The `DocumentStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `policyhub-store-sqlite`). The lifecycle service depends on this
//! abstraction, not on any concrete backend.
//!
//! Mutating methods are *atomic units of work*: the row write and every
//! accompanying audit insert succeed or fail together, so the ledger
//! can never disagree with the table it describes.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  Result,
  category::Category,
  document::{Document, DocumentStatus, DocumentType},
  history::HistoryEntry,
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Logical sort column for document listings. The names mirror the
/// persisted columns so callers can round-trip them as strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
  #[default]
  DocRef,
  Title,
  DocType,
  Category,
  Status,
  Version,
  EffectiveDate,
  NextReviewDate,
  Owner,
}

impl SortKey {
  pub fn column(self) -> &'static str {
    match self {
      Self::DocRef => "doc_ref",
      Self::Title => "title",
      Self::DocType => "doc_type",
      Self::Category => "category",
      Self::Status => "status",
      Self::Version => "version",
      Self::EffectiveDate => "effective_date",
      Self::NextReviewDate => "next_review_date",
      Self::Owner => "owner",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "doc_ref" => Some(Self::DocRef),
      "title" => Some(Self::Title),
      "doc_type" => Some(Self::DocType),
      "category" => Some(Self::Category),
      "status" => Some(Self::Status),
      "version" => Some(Self::Version),
      "effective_date" => Some(Self::EffectiveDate),
      "next_review_date" => Some(Self::NextReviewDate),
      "owner" => Some(Self::Owner),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
  #[default]
  Asc,
  Desc,
}

impl SortDir {
  pub fn keyword(self) -> &'static str {
    match self {
      Self::Asc => "ASC",
      Self::Desc => "DESC",
    }
  }
}

/// Parameters for [`DocumentStore::list_documents`].
///
/// Review status is absent on purpose — it is a derived classification,
/// filtered by the service after the rows come back.
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
  pub status:   Option<DocumentStatus>,
  pub doc_type: Option<DocumentType>,
  pub category: Option<String>,
  /// Substring match over title, reference code, and description.
  pub search:   Option<String>,
  pub sort:     SortKey,
  pub dir:      SortDir,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the shared document register backend.
///
/// All methods return `Send` futures so the trait can be used from
/// multi-threaded async runtimes.
pub trait DocumentStore: Send + Sync {
  // ── Documents — guarded writes ────────────────────────────────────────

  /// Insert a fully-built document together with its CREATED audit
  /// entry, atomically. Fails with [`crate::Error::DuplicateRef`] if the
  /// reference code is already taken.
  fn insert_document<'a>(
    &'a self,
    document: &'a Document,
    created: &'a HistoryEntry,
  ) -> impl Future<Output = Result<()>> + Send + 'a;

  /// Write a new revision of an existing document together with its
  /// audit entries, atomically.
  ///
  /// The write is guarded on `expected_version`: if the stored row no
  /// longer carries that version (a concurrent writer got there first,
  /// or the document vanished), nothing is applied and the call fails
  /// with [`crate::Error::VersionConflict`].
  fn update_document<'a>(
    &'a self,
    document: &'a Document,
    expected_version: i64,
    audit: &'a [HistoryEntry],
  ) -> impl Future<Output = Result<()>> + Send + 'a;

  /// Hard-delete a document. Cascades to its history, attachments, and
  /// links. Returns `false` if the document did not exist.
  fn delete_document(
    &self,
    doc_id: Uuid,
  ) -> impl Future<Output = Result<bool>> + Send + '_;

  // ── Documents — reads ─────────────────────────────────────────────────

  /// Fetch by id. Returns `None` if not found.
  fn get_document(
    &self,
    doc_id: Uuid,
  ) -> impl Future<Output = Result<Option<Document>>> + Send + '_;

  /// Fetch by reference code (exact match on the stored, uppercase
  /// form). Returns `None` if not found.
  fn get_document_by_ref<'a>(
    &'a self,
    doc_ref: &'a str,
  ) -> impl Future<Output = Result<Option<Document>>> + Send + 'a;

  /// Whether a reference code is taken, optionally excluding one
  /// document (for collision checks during edits).
  fn doc_ref_exists<'a>(
    &'a self,
    doc_ref: &'a str,
    exclude: Option<Uuid>,
  ) -> impl Future<Output = Result<bool>> + Send + 'a;

  fn list_documents<'a>(
    &'a self,
    filter: &'a DocumentFilter,
  ) -> impl Future<Output = Result<Vec<Document>>> + Send + 'a;

  /// Every stored reference code starting with `prefix` — input to the
  /// reference allocator.
  fn refs_with_prefix<'a>(
    &'a self,
    prefix: &'a str,
  ) -> impl Future<Output = Result<Vec<String>>> + Send + 'a;

  fn count_documents(
    &self,
  ) -> impl Future<Output = Result<u64>> + Send + '_;

  fn counts_by_status(
    &self,
  ) -> impl Future<Output = Result<Vec<(DocumentStatus, u64)>>> + Send + '_;

  fn counts_by_type(
    &self,
  ) -> impl Future<Output = Result<Vec<(DocumentType, u64)>>> + Send + '_;

  // ── Audit trail ───────────────────────────────────────────────────────

  /// Append a standalone ledger entry (attachment and link events from
  /// external collaborators). Document mutations never use this — their
  /// entries ride inside the mutation's own transaction.
  fn append_history<'a>(
    &'a self,
    entry: &'a HistoryEntry,
  ) -> impl Future<Output = Result<()>> + Send + 'a;

  /// History for one document, most recent first.
  fn history_for(
    &self,
    doc_id: Uuid,
    limit: u32,
  ) -> impl Future<Output = Result<Vec<HistoryEntry>>> + Send + '_;

  /// Recent entries across all documents, most recent first.
  fn recent_activity(
    &self,
    limit: u32,
  ) -> impl Future<Output = Result<Vec<HistoryEntry>>> + Send + '_;

  /// Entries recorded by one actor, most recent first.
  fn activity_by_actor<'a>(
    &'a self,
    actor_id: &'a str,
    limit: u32,
  ) -> impl Future<Output = Result<Vec<HistoryEntry>>> + Send + 'a;

  /// Entries recorded within `[start, end]`, most recent first.
  fn activity_between(
    &self,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<HistoryEntry>>> + Send + '_;

  // ── Collaborator lookups ──────────────────────────────────────────────

  /// Whether a category code exists and is active.
  fn category_is_active<'a>(
    &'a self,
    code: &'a str,
  ) -> impl Future<Output = Result<bool>> + Send + 'a;

  fn list_categories(
    &self,
    include_inactive: bool,
  ) -> impl Future<Output = Result<Vec<Category>>> + Send + '_;

  fn get_setting<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<String>>> + Send + 'a;

  fn set_setting<'a>(
    &'a self,
    key: &'a str,
    value: &'a str,
  ) -> impl Future<Output = Result<()>> + Send + 'a;
}
