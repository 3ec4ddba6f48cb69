//! Encoding and decoding helpers between domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, calendar dates as
//! `YYYY-MM-DD`, UUIDs as hyphenated lowercase strings, and enums as
//! their canonical uppercase words.

use chrono::{DateTime, NaiveDate, Utc};
use policyhub_core::{
  Error, Result,
  category::Category,
  document::{Document, DocumentStatus, DocumentType, ReviewFrequency},
  history::{HistoryAction, HistoryEntry},
};
use uuid::Uuid;

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String {
  id.hyphenated().to_string()
}

pub fn decode_uuid(s: &str) -> Result<Uuid> {
  Uuid::parse_str(s).map_err(|e| Error::Decode(format!("uuid {s:?}: {e}")))
}

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339()
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

pub fn encode_date(d: NaiveDate) -> String {
  d.format("%Y-%m-%d").to_string()
}

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::Decode(format!("date {s:?}: {e}")))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn decode_doc_type(s: &str) -> Result<DocumentType> {
  DocumentType::parse(s)
    .ok_or_else(|| Error::Decode(format!("unknown document type: {s:?}")))
}

pub fn decode_status(s: &str) -> Result<DocumentStatus> {
  DocumentStatus::parse(s)
    .ok_or_else(|| Error::Decode(format!("unknown document status: {s:?}")))
}

pub fn decode_frequency(s: &str) -> Result<ReviewFrequency> {
  ReviewFrequency::parse(s)
    .ok_or_else(|| Error::Decode(format!("unknown review frequency: {s:?}")))
}

pub fn decode_action(s: &str) -> Result<HistoryAction> {
  HistoryAction::parse(s)
    .ok_or_else(|| Error::Decode(format!("unknown history action: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read from (or written to) a `documents` row.
pub struct RawDocument {
  pub doc_id:           String,
  pub doc_type:         String,
  pub doc_ref:          String,
  pub title:            String,
  pub description:      Option<String>,
  pub category:         String,
  pub owner:            String,
  pub approver:         Option<String>,
  pub status:           String,
  pub version:          String,
  pub effective_date:   String,
  pub last_review_date: String,
  pub next_review_date: Option<String>,
  pub review_frequency: String,
  pub notes:            Option<String>,
  pub row_version:      i64,
  pub created_at:       String,
  pub created_by:       String,
  pub updated_at:       String,
  pub updated_by:       String,
}

impl RawDocument {
  pub fn from_document(doc: &Document) -> Self {
    Self {
      doc_id:           encode_uuid(doc.doc_id),
      doc_type:         doc.doc_type.as_str().to_owned(),
      doc_ref:          doc.doc_ref.clone(),
      title:            doc.title.clone(),
      description:      doc.description.clone(),
      category:         doc.category.clone(),
      owner:            doc.owner.clone(),
      approver:         doc.approver.clone(),
      status:           doc.status.as_str().to_owned(),
      version:          doc.version.clone(),
      effective_date:   encode_date(doc.effective_date),
      last_review_date: encode_date(doc.last_review_date),
      next_review_date: doc.next_review_date.map(encode_date),
      review_frequency: doc.review_frequency.as_str().to_owned(),
      notes:            doc.notes.clone(),
      row_version:      doc.row_version,
      created_at:       encode_dt(doc.created_at),
      created_by:       doc.created_by.clone(),
      updated_at:       encode_dt(doc.updated_at),
      updated_by:       doc.updated_by.clone(),
    }
  }

  pub fn into_document(self) -> Result<Document> {
    Ok(Document {
      doc_id:           decode_uuid(&self.doc_id)?,
      doc_type:         decode_doc_type(&self.doc_type)?,
      doc_ref:          self.doc_ref,
      title:            self.title,
      description:      self.description,
      category:         self.category,
      owner:            self.owner,
      approver:         self.approver,
      status:           decode_status(&self.status)?,
      version:          self.version,
      effective_date:   decode_date(&self.effective_date)?,
      last_review_date: decode_date(&self.last_review_date)?,
      next_review_date: self
        .next_review_date
        .as_deref()
        .map(decode_date)
        .transpose()?,
      review_frequency: decode_frequency(&self.review_frequency)?,
      notes:            self.notes,
      row_version:      self.row_version,
      created_at:       decode_dt(&self.created_at)?,
      created_by:       self.created_by,
      updated_at:       decode_dt(&self.updated_at)?,
      updated_by:       self.updated_by,
    })
  }

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      doc_id:           row.get("doc_id")?,
      doc_type:         row.get("doc_type")?,
      doc_ref:          row.get("doc_ref")?,
      title:            row.get("title")?,
      description:      row.get("description")?,
      category:         row.get("category")?,
      owner:            row.get("owner")?,
      approver:         row.get("approver")?,
      status:           row.get("status")?,
      version:          row.get("version")?,
      effective_date:   row.get("effective_date")?,
      last_review_date: row.get("last_review_date")?,
      next_review_date: row.get("next_review_date")?,
      review_frequency: row.get("review_frequency")?,
      notes:            row.get("notes")?,
      row_version:      row.get("row_version")?,
      created_at:       row.get("created_at")?,
      created_by:       row.get("created_by")?,
      updated_at:       row.get("updated_at")?,
      updated_by:       row.get("updated_by")?,
    })
  }
}

/// Raw strings read from (or written to) a `document_history` row.
pub struct RawHistoryEntry {
  pub history_id:    String,
  pub doc_id:        String,
  pub action:        String,
  pub field_changed: Option<String>,
  pub old_value:     Option<String>,
  pub new_value:     Option<String>,
  pub changed_by:    String,
  pub changed_at:    String,
  pub notes:         Option<String>,
}

impl RawHistoryEntry {
  pub fn from_entry(entry: &HistoryEntry) -> Self {
    Self {
      history_id:    encode_uuid(entry.history_id),
      doc_id:        encode_uuid(entry.doc_id),
      action:        entry.action.as_str().to_owned(),
      field_changed: entry.field_changed.clone(),
      old_value:     entry.old_value.clone(),
      new_value:     entry.new_value.clone(),
      changed_by:    entry.changed_by.clone(),
      changed_at:    encode_dt(entry.changed_at),
      notes:         entry.notes.clone(),
    }
  }

  pub fn into_entry(self) -> Result<HistoryEntry> {
    Ok(HistoryEntry {
      history_id:    decode_uuid(&self.history_id)?,
      doc_id:        decode_uuid(&self.doc_id)?,
      action:        decode_action(&self.action)?,
      field_changed: self.field_changed,
      old_value:     self.old_value,
      new_value:     self.new_value,
      changed_by:    self.changed_by,
      changed_at:    decode_dt(&self.changed_at)?,
      notes:         self.notes,
    })
  }

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      history_id:    row.get("history_id")?,
      doc_id:        row.get("doc_id")?,
      action:        row.get("action")?,
      field_changed: row.get("field_changed")?,
      old_value:     row.get("old_value")?,
      new_value:     row.get("new_value")?,
      changed_by:    row.get("changed_by")?,
      changed_at:    row.get("changed_at")?,
      notes:         row.get("notes")?,
    })
  }
}

/// Raw values read from a `categories` row.
pub struct RawCategory {
  pub code:       String,
  pub name:       String,
  pub is_active:  i64,
  pub sort_order: i64,
}

impl RawCategory {
  pub fn into_category(self) -> Category {
    Category {
      code:       self.code,
      name:       self.name,
      is_active:  self.is_active != 0,
      sort_order: self.sort_order,
    }
  }
}
