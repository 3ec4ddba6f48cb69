//! Document lifecycle orchestration.
//!
//! [`DocumentLifecycleService`] is the single write path for the
//! register. Every operation checks the actor's capability first (a
//! forbidden call has zero side effects), validates input, computes the
//! diff and the matching audit entries, and hands the store one atomic
//! unit of work. Reads are independent of the write path.
//!
//! The service is generic over the storage backend and the clock, so
//! lifecycle behaviour is testable against an in-memory store and a
//! pinned date.

use std::{future::Future, time::Duration};

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use policyhub_core::{
  Error, Result,
  access::{self, Actor, Capability},
  category::Category,
  clock::Clock,
  document::{Document, DocumentPatch, DocumentStatus, DocumentType, NewDocument},
  history::{HistoryEntry, NewHistoryEntry},
  refcode,
  schedule::{
    self, ReviewStatus, ReviewThresholds, UPCOMING_DAYS_KEY, WARNING_DAYS_KEY,
  },
  store::{DocumentFilter, DocumentStore, SortDir, SortKey},
};

/// Attempts per mutating store call when the single-writer lock stays
/// busy past its bounded wait.
const BUSY_ATTEMPTS: u32 = 3;
const BUSY_BACKOFF_MS: u64 = 50;

// ─── Service ─────────────────────────────────────────────────────────────────

pub struct DocumentLifecycleService<S, C> {
  store: S,
  clock: C,
}

impl<S: DocumentStore, C: Clock> DocumentLifecycleService<S, C> {
  pub fn new(store: S, clock: C) -> Self {
    Self { store, clock }
  }

  // ── Writes ────────────────────────────────────────────────────────────

  /// Create a document.
  ///
  /// The reference code is folded to uppercase and validated; a taken
  /// code fails with [`Error::DuplicateRef`]. The next review date is
  /// used as supplied when present, otherwise derived from the last
  /// review date and frequency (ad-hoc documents stay without one).
  pub async fn create_document(
    &self,
    actor: &Actor,
    input: NewDocument,
  ) -> Result<Document> {
    access::check(actor.role, Capability::CreateDocument).require()?;

    let doc_ref = refcode::normalize_ref(&input.doc_ref);
    refcode::validate_ref(&doc_ref)?;

    if !self.store.category_is_active(&input.category).await? {
      return Err(Error::InactiveCategory(input.category));
    }
    if self.store.doc_ref_exists(&doc_ref, None).await? {
      return Err(Error::DuplicateRef(doc_ref));
    }

    let now = self.clock.now();
    let next_review_date = match input.next_review_date {
      Some(date) => Some(date),
      None => schedule::next_review(input.last_review_date, input.review_frequency),
    };

    let document = Document {
      doc_id: Uuid::new_v4(),
      doc_type: input.doc_type,
      doc_ref,
      title: input.title,
      description: input.description,
      category: input.category,
      owner: input.owner,
      approver: input.approver,
      status: input.status,
      version: input.version,
      effective_date: input.effective_date,
      last_review_date: input.last_review_date,
      next_review_date,
      review_frequency: input.review_frequency,
      notes: input.notes,
      row_version: 1,
      created_at: now,
      created_by: actor.id.clone(),
      updated_at: now,
      updated_by: actor.id.clone(),
    };
    let created =
      NewHistoryEntry::created().into_entry(document.doc_id, &actor.id, now);

    self
      .retry_busy(|| self.store.insert_document(&document, &created))
      .await?;

    tracing::info!(doc_ref = %document.doc_ref, "document created");
    Ok(document)
  }

  /// Apply a partial update.
  ///
  /// Fields equal to the stored value are silently skipped; if nothing
  /// changed, the stored document comes back untouched — no audit row,
  /// no `updated_at` bump. A status change is validated against the
  /// transition table and logged as STATUS_CHANGED instead of a plain
  /// field change. Returns `None` for an unknown document.
  pub async fn update_document(
    &self,
    actor: &Actor,
    doc_id: Uuid,
    patch: DocumentPatch,
  ) -> Result<Option<Document>> {
    access::check(actor.role, Capability::EditDocument).require()?;

    let Some(current) = self.store.get_document(doc_id).await? else {
      return Ok(None);
    };

    if let Some(category) = &patch.category
      && category != &current.category
      && !self.store.category_is_active(category).await?
    {
      return Err(Error::InactiveCategory(category.clone()));
    }

    let (mut revised, staged) = apply_patch(&current, patch)?;
    if staged.is_empty() {
      return Ok(Some(current));
    }

    let now = self.clock.now();
    let expected_version = current.row_version;
    revised.row_version = expected_version + 1;
    revised.updated_at = now;
    revised.updated_by = actor.id.clone();

    let audit: Vec<HistoryEntry> = staged
      .into_iter()
      .map(|entry| entry.into_entry(doc_id, &actor.id, now))
      .collect();

    self
      .retry_busy(|| self.store.update_document(&revised, expected_version, &audit))
      .await?;

    tracing::info!(
      doc_ref = %revised.doc_ref,
      changes = audit.len(),
      "document updated"
    );
    Ok(Some(revised))
  }

  /// Record a completed review.
  ///
  /// Sets the last review date to today and re-derives the next one
  /// (ad-hoc documents keep their stored date, since no automatic value
  /// exists). Always writes exactly one REVIEWED entry carrying the
  /// notes; a changed version label adds one field-change entry.
  /// Returns `None` for an unknown document.
  pub async fn mark_as_reviewed(
    &self,
    actor: &Actor,
    doc_id: Uuid,
    notes: Option<String>,
    new_version: Option<String>,
  ) -> Result<Option<Document>> {
    access::check(actor.role, Capability::MarkReviewed).require()?;

    let Some(current) = self.store.get_document(doc_id).await? else {
      return Ok(None);
    };

    let today = self.clock.today();
    let now = self.clock.now();

    let mut revised = current.clone();
    revised.last_review_date = today;
    if let Some(date) = schedule::next_review(today, revised.review_frequency) {
      revised.next_review_date = Some(date);
    }

    let mut staged = vec![NewHistoryEntry::reviewed(notes)];
    if let Some(version) = new_version {
      if version != current.version {
        staged.push(NewHistoryEntry::field_change(
          "version",
          Some(current.version.clone()),
          Some(version.clone()),
        ));
      }
      revised.version = version;
    }

    let expected_version = current.row_version;
    revised.row_version = expected_version + 1;
    revised.updated_at = now;
    revised.updated_by = actor.id.clone();

    let audit: Vec<HistoryEntry> = staged
      .into_iter()
      .map(|entry| entry.into_entry(doc_id, &actor.id, now))
      .collect();

    self
      .retry_busy(|| self.store.update_document(&revised, expected_version, &audit))
      .await?;

    tracing::info!(doc_ref = %revised.doc_ref, "document reviewed");
    Ok(Some(revised))
  }

  /// Hard-delete a document and everything attached to it: history,
  /// attachments, links. Admin-only and non-reversible. Returns `false`
  /// if the document did not exist.
  pub async fn delete_document(&self, actor: &Actor, doc_id: Uuid) -> Result<bool> {
    access::check(actor.role, Capability::DeleteDocument).require()?;

    let Some(document) = self.store.get_document(doc_id).await? else {
      return Ok(false);
    };

    let deleted = self
      .retry_busy(|| self.store.delete_document(doc_id))
      .await?;
    if deleted {
      tracing::info!(doc_ref = %document.doc_ref, "document deleted");
    }
    Ok(deleted)
  }

  /// Suggest the next free reference code for a `(type, category)`
  /// pair. The suggestion reserves nothing — a racing creation with the
  /// same code fails with a conflict at insert time.
  pub async fn generate_next_ref(
    &self,
    doc_type: DocumentType,
    category: &str,
  ) -> Result<String> {
    let prefix = refcode::search_prefix(doc_type, category);
    let existing = self.store.refs_with_prefix(&prefix).await?;
    Ok(refcode::next_ref(doc_type, category, &existing))
  }

  // ── Audit hooks for external collaborators ────────────────────────────

  /// Record that a file was attached to a document.
  pub async fn log_attachment_added(
    &self,
    actor: &Actor,
    doc_id: Uuid,
    filename: &str,
  ) -> Result<HistoryEntry> {
    access::check(actor.role, Capability::EditDocument).require()?;
    self
      .append(NewHistoryEntry::attachment_added(filename), actor, doc_id)
      .await
  }

  /// Record that an attachment was removed from a document.
  pub async fn log_attachment_removed(
    &self,
    actor: &Actor,
    doc_id: Uuid,
    filename: &str,
  ) -> Result<HistoryEntry> {
    access::check(actor.role, Capability::EditDocument).require()?;
    self
      .append(NewHistoryEntry::attachment_removed(filename), actor, doc_id)
      .await
  }

  /// Record a new link to another document.
  pub async fn log_link_added(
    &self,
    actor: &Actor,
    doc_id: Uuid,
    link_type: &str,
    linked_doc_ref: &str,
  ) -> Result<HistoryEntry> {
    access::check(actor.role, Capability::EditDocument).require()?;
    self
      .append(
        NewHistoryEntry::link_added(link_type, linked_doc_ref),
        actor,
        doc_id,
      )
      .await
  }

  /// Record a removed link.
  pub async fn log_link_removed(
    &self,
    actor: &Actor,
    doc_id: Uuid,
    link_type: &str,
    linked_doc_ref: &str,
  ) -> Result<HistoryEntry> {
    access::check(actor.role, Capability::EditDocument).require()?;
    self
      .append(
        NewHistoryEntry::link_removed(link_type, linked_doc_ref),
        actor,
        doc_id,
      )
      .await
  }

  async fn append(
    &self,
    staged: NewHistoryEntry,
    actor: &Actor,
    doc_id: Uuid,
  ) -> Result<HistoryEntry> {
    let entry = staged.into_entry(doc_id, &actor.id, self.clock.now());
    self.retry_busy(|| self.store.append_history(&entry)).await?;
    Ok(entry)
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  pub async fn get_document(
    &self,
    actor: &Actor,
    doc_id: Uuid,
  ) -> Result<Option<Document>> {
    access::check(actor.role, Capability::ViewDocuments).require()?;
    self.store.get_document(doc_id).await
  }

  pub async fn get_document_by_ref(
    &self,
    actor: &Actor,
    doc_ref: &str,
  ) -> Result<Option<Document>> {
    access::check(actor.role, Capability::ViewDocuments).require()?;
    let doc_ref = refcode::normalize_ref(doc_ref);
    self.store.get_document_by_ref(&doc_ref).await
  }

  /// List documents. `review_status` is a derived classification, so
  /// that filter is applied here after the rows come back.
  pub async fn list_documents(
    &self,
    actor: &Actor,
    filter: &DocumentFilter,
    review_status: Option<ReviewStatus>,
  ) -> Result<Vec<Document>> {
    access::check(actor.role, Capability::ViewDocuments).require()?;

    let mut documents = self.store.list_documents(filter).await?;
    if let Some(wanted) = review_status {
      let today = self.clock.today();
      let thresholds = self.review_thresholds().await?;
      documents.retain(|d| d.review_status(today, thresholds) == wanted);
    }
    Ok(documents)
  }

  pub async fn total_documents(&self, actor: &Actor) -> Result<u64> {
    access::check(actor.role, Capability::ViewDocuments).require()?;
    self.store.count_documents().await
  }

  pub async fn document_counts_by_status(
    &self,
    actor: &Actor,
  ) -> Result<Vec<(DocumentStatus, u64)>> {
    access::check(actor.role, Capability::ViewDocuments).require()?;
    self.store.counts_by_status().await
  }

  pub async fn document_counts_by_type(
    &self,
    actor: &Actor,
  ) -> Result<Vec<(DocumentType, u64)>> {
    access::check(actor.role, Capability::ViewDocuments).require()?;
    self.store.counts_by_type().await
  }

  /// Dashboard aggregate: how many non-archived documents sit in each
  /// review band. Every band is present, zero or not.
  pub async fn review_status_counts(
    &self,
    actor: &Actor,
  ) -> Result<Vec<(ReviewStatus, u64)>> {
    access::check(actor.role, Capability::ViewDocuments).require()?;

    let documents = self.store.list_documents(&DocumentFilter::default()).await?;
    let today = self.clock.today();
    let thresholds = self.review_thresholds().await?;

    let mut counts = [0u64; ReviewStatus::ALL.len()];
    for document in &documents {
      // Archived documents are no longer actively managed.
      if document.status == DocumentStatus::Archived {
        continue;
      }
      let status = document.review_status(today, thresholds);
      let slot = ReviewStatus::ALL
        .iter()
        .position(|s| *s == status)
        .unwrap_or_default();
      counts[slot] += 1;
    }

    Ok(ReviewStatus::ALL.into_iter().zip(counts).collect())
  }

  /// Documents that are overdue or due soon, overdue first, then by
  /// next review date ascending. Archived documents are excluded.
  pub async fn documents_requiring_attention(
    &self,
    actor: &Actor,
    limit: usize,
  ) -> Result<Vec<Document>> {
    access::check(actor.role, Capability::ViewDocuments).require()?;

    let filter = DocumentFilter {
      sort: SortKey::NextReviewDate,
      dir: SortDir::Asc,
      ..Default::default()
    };
    let documents = self.store.list_documents(&filter).await?;
    let today = self.clock.today();
    let thresholds = self.review_thresholds().await?;

    let mut urgent: Vec<(ReviewStatus, Document)> = documents
      .into_iter()
      .filter(|d| d.status != DocumentStatus::Archived)
      .filter_map(|d| match d.review_status(today, thresholds) {
        status @ (ReviewStatus::Overdue | ReviewStatus::DueSoon) => {
          Some((status, d))
        }
        _ => None,
      })
      .collect();

    urgent.sort_by_key(|(status, d)| {
      (u8::from(*status != ReviewStatus::Overdue), d.next_review_date)
    });
    urgent.truncate(limit);

    Ok(urgent.into_iter().map(|(_, d)| d).collect())
  }

  /// ACTIVE documents whose next review date has passed, ascending by
  /// date — the report feed.
  pub async fn overdue_documents(&self, actor: &Actor) -> Result<Vec<Document>> {
    access::check(actor.role, Capability::ViewDocuments).require()?;

    let filter = DocumentFilter {
      status: Some(DocumentStatus::Active),
      sort: SortKey::NextReviewDate,
      dir: SortDir::Asc,
      ..Default::default()
    };
    let today = self.clock.today();
    let mut documents = self.store.list_documents(&filter).await?;
    documents.retain(|d| d.next_review_date.is_some_and(|next| next < today));
    Ok(documents)
  }

  pub async fn history_for(
    &self,
    actor: &Actor,
    doc_id: Uuid,
    limit: u32,
  ) -> Result<Vec<HistoryEntry>> {
    access::check(actor.role, Capability::ViewDocuments).require()?;
    self.store.history_for(doc_id, limit).await
  }

  pub async fn recent_activity(
    &self,
    actor: &Actor,
    limit: u32,
  ) -> Result<Vec<HistoryEntry>> {
    access::check(actor.role, Capability::ViewDocuments).require()?;
    self.store.recent_activity(limit).await
  }

  pub async fn activity_by_actor(
    &self,
    actor: &Actor,
    actor_id: &str,
    limit: u32,
  ) -> Result<Vec<HistoryEntry>> {
    access::check(actor.role, Capability::ViewDocuments).require()?;
    self.store.activity_by_actor(actor_id, limit).await
  }

  pub async fn activity_between(
    &self,
    actor: &Actor,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> Result<Vec<HistoryEntry>> {
    access::check(actor.role, Capability::ViewDocuments).require()?;
    self.store.activity_between(start, end).await
  }

  pub async fn categories(
    &self,
    actor: &Actor,
    include_inactive: bool,
  ) -> Result<Vec<Category>> {
    access::check(actor.role, Capability::ViewDocuments).require()?;
    self.store.list_categories(include_inactive).await
  }

  /// Review thresholds for this deployment, from the settings table,
  /// falling back to the defaults for missing or garbled values.
  pub async fn review_thresholds(&self) -> Result<ReviewThresholds> {
    let mut thresholds = ReviewThresholds::default();
    if let Some(value) = self.store.get_setting(WARNING_DAYS_KEY).await?
      && let Ok(days) = value.parse()
    {
      thresholds.warning_days = days;
    }
    if let Some(value) = self.store.get_setting(UPCOMING_DAYS_KEY).await?
      && let Ok(days) = value.parse()
    {
      thresholds.upcoming_days = days;
    }
    Ok(thresholds)
  }

  // ── Retry ─────────────────────────────────────────────────────────────

  /// Bounded retry for transient lock contention. A busy failure means
  /// the transaction never committed, so re-running the same write is
  /// safe.
  async fn retry_busy<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
  where
    Fut: Future<Output = Result<T>>,
  {
    let mut attempt = 1u32;
    loop {
      match op().await {
        Err(Error::StoreUnavailable(reason)) if attempt < BUSY_ATTEMPTS => {
          tracing::warn!(attempt, reason = %reason, "store busy, retrying");
          tokio::time::sleep(Duration::from_millis(
            BUSY_BACKOFF_MS * u64::from(attempt),
          ))
          .await;
          attempt += 1;
        }
        other => return other,
      }
    }
  }
}

// ─── Diffing ─────────────────────────────────────────────────────────────────

fn date_value(date: NaiveDate) -> String {
  date.format("%Y-%m-%d").to_string()
}

/// Apply `patch` on top of `current`, staging one audit entry per field
/// that actually changes. A status change must be a legal transition.
fn apply_patch(
  current: &Document,
  patch: DocumentPatch,
) -> Result<(Document, Vec<NewHistoryEntry>)> {
  let mut next = current.clone();
  let mut staged = Vec::new();

  if let Some(title) = patch.title
    && title != next.title
  {
    staged.push(NewHistoryEntry::field_change(
      "title",
      Some(next.title.clone()),
      Some(title.clone()),
    ));
    next.title = title;
  }

  if let Some(description) = patch.description
    && Some(&description) != next.description.as_ref()
  {
    staged.push(NewHistoryEntry::field_change(
      "description",
      next.description.clone(),
      Some(description.clone()),
    ));
    next.description = Some(description);
  }

  if let Some(category) = patch.category
    && category != next.category
  {
    staged.push(NewHistoryEntry::field_change(
      "category",
      Some(next.category.clone()),
      Some(category.clone()),
    ));
    next.category = category;
  }

  if let Some(owner) = patch.owner
    && owner != next.owner
  {
    staged.push(NewHistoryEntry::field_change(
      "owner",
      Some(next.owner.clone()),
      Some(owner.clone()),
    ));
    next.owner = owner;
  }

  if let Some(approver) = patch.approver
    && Some(&approver) != next.approver.as_ref()
  {
    staged.push(NewHistoryEntry::field_change(
      "approver",
      next.approver.clone(),
      Some(approver.clone()),
    ));
    next.approver = Some(approver);
  }

  if let Some(status) = patch.status
    && status != next.status
  {
    if !next.status.can_transition_to(status) {
      return Err(Error::InvalidTransition {
        from: next.status,
        to:   status,
      });
    }
    staged.push(NewHistoryEntry::status_change(next.status, status));
    next.status = status;
  }

  if let Some(version) = patch.version
    && version != next.version
  {
    staged.push(NewHistoryEntry::field_change(
      "version",
      Some(next.version.clone()),
      Some(version.clone()),
    ));
    next.version = version;
  }

  if let Some(effective_date) = patch.effective_date
    && effective_date != next.effective_date
  {
    staged.push(NewHistoryEntry::field_change(
      "effective_date",
      Some(date_value(next.effective_date)),
      Some(date_value(effective_date)),
    ));
    next.effective_date = effective_date;
  }

  if let Some(last_review_date) = patch.last_review_date
    && last_review_date != next.last_review_date
  {
    staged.push(NewHistoryEntry::field_change(
      "last_review_date",
      Some(date_value(next.last_review_date)),
      Some(date_value(last_review_date)),
    ));
    next.last_review_date = last_review_date;
  }

  if let Some(next_review_date) = patch.next_review_date
    && Some(next_review_date) != next.next_review_date
  {
    staged.push(NewHistoryEntry::field_change(
      "next_review_date",
      next.next_review_date.map(date_value),
      Some(date_value(next_review_date)),
    ));
    next.next_review_date = Some(next_review_date);
  }

  if let Some(review_frequency) = patch.review_frequency
    && review_frequency != next.review_frequency
  {
    staged.push(NewHistoryEntry::field_change(
      "review_frequency",
      Some(next.review_frequency.as_str().to_owned()),
      Some(review_frequency.as_str().to_owned()),
    ));
    next.review_frequency = review_frequency;
  }

  if let Some(notes) = patch.notes
    && Some(&notes) != next.notes.as_ref()
  {
    staged.push(NewHistoryEntry::field_change(
      "notes",
      next.notes.clone(),
      Some(notes.clone()),
    ));
    next.notes = Some(notes);
  }

  Ok((next, staged))
}

#[cfg(test)]
mod tests;
