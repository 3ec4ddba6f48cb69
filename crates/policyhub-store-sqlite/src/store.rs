//! [`SqliteStore`] — the SQLite implementation of [`DocumentStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use policyhub_core::{
  Error, Result,
  category::{Category, DEFAULT_CATEGORIES},
  document::{Document, DocumentStatus, DocumentType},
  history::HistoryEntry,
  store::{DocumentFilter, DocumentStore},
};

use crate::{
  encode::{
    RawCategory, RawDocument, RawHistoryEntry, decode_doc_type, decode_status,
    encode_dt, encode_uuid,
  },
  error::map_db,
  schema::{DEFAULT_SETTINGS, SCHEMA},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A document register backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// Result of a guarded write, carried out of the connection closure so
/// the domain error can be built where the context (reference, id) is
/// still at hand.
enum WriteOutcome {
  Applied,
  DuplicateRef,
  StaleVersion,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path)
      .await
      .map_err(map_db)?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory()
      .await
      .map_err(map_db)?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;

        let categories: i64 =
          conn.query_row("SELECT COUNT(*) FROM categories", [], |r| r.get(0))?;
        if categories == 0 {
          for (code, name, sort_order) in DEFAULT_CATEGORIES {
            conn.execute(
              "INSERT INTO categories (code, name, is_active, sort_order)
               VALUES (?1, ?2, 1, ?3)",
              rusqlite::params![code, name, sort_order],
            )?;
          }
        }

        let settings: i64 =
          conn.query_row("SELECT COUNT(*) FROM settings", [], |r| r.get(0))?;
        if settings == 0 {
          for (key, value) in DEFAULT_SETTINGS {
            conn.execute(
              "INSERT INTO settings (key, value) VALUES (?1, ?2)",
              rusqlite::params![key, value],
            )?;
          }
        }

        Ok(())
      })
      .await
      .map_err(map_db)?;

    tracing::debug!("schema initialised");
    Ok(())
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────

fn insert_document_row(
  conn: &rusqlite::Connection,
  raw: &RawDocument,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO documents (
       doc_id, doc_type, doc_ref, title, description,
       category, owner, approver, status, version,
       effective_date, last_review_date, next_review_date,
       review_frequency, notes, row_version,
       created_at, created_by, updated_at, updated_by
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
               ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
    rusqlite::params![
      raw.doc_id,
      raw.doc_type,
      raw.doc_ref,
      raw.title,
      raw.description,
      raw.category,
      raw.owner,
      raw.approver,
      raw.status,
      raw.version,
      raw.effective_date,
      raw.last_review_date,
      raw.next_review_date,
      raw.review_frequency,
      raw.notes,
      raw.row_version,
      raw.created_at,
      raw.created_by,
      raw.updated_at,
      raw.updated_by,
    ],
  )?;
  Ok(())
}

fn insert_history_row(
  conn: &rusqlite::Connection,
  raw: &RawHistoryEntry,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO document_history (
       history_id, doc_id, action, field_changed,
       old_value, new_value, changed_by, changed_at, notes
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    rusqlite::params![
      raw.history_id,
      raw.doc_id,
      raw.action,
      raw.field_changed,
      raw.old_value,
      raw.new_value,
      raw.changed_by,
      raw.changed_at,
      raw.notes,
    ],
  )?;
  Ok(())
}

// ─── DocumentStore impl ──────────────────────────────────────────────────────

impl DocumentStore for SqliteStore {
  // ── Documents — guarded writes ────────────────────────────────────────

  async fn insert_document(
    &self,
    document: &Document,
    created: &HistoryEntry,
  ) -> Result<()> {
    let raw = RawDocument::from_document(document);
    let entry = RawHistoryEntry::from_entry(created);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let taken = tx
          .query_row(
            "SELECT 1 FROM documents WHERE doc_ref = ?1",
            rusqlite::params![raw.doc_ref],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if taken {
          return Ok(WriteOutcome::DuplicateRef);
        }

        insert_document_row(&tx, &raw)?;
        insert_history_row(&tx, &entry)?;
        tx.commit()?;
        Ok(WriteOutcome::Applied)
      })
      .await
      .map_err(map_db)?;

    match outcome {
      WriteOutcome::DuplicateRef => {
        Err(Error::DuplicateRef(document.doc_ref.clone()))
      }
      _ => Ok(()),
    }
  }

  async fn update_document(
    &self,
    document: &Document,
    expected_version: i64,
    audit: &[HistoryEntry],
  ) -> Result<()> {
    let raw = RawDocument::from_document(document);
    let entries: Vec<RawHistoryEntry> =
      audit.iter().map(RawHistoryEntry::from_entry).collect();
    let doc_id = document.doc_id;

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let affected = tx.execute(
          "UPDATE documents SET
             doc_type = ?1, title = ?2, description = ?3, category = ?4,
             owner = ?5, approver = ?6, status = ?7, version = ?8,
             effective_date = ?9, last_review_date = ?10,
             next_review_date = ?11, review_frequency = ?12, notes = ?13,
             row_version = ?14, updated_at = ?15, updated_by = ?16
           WHERE doc_id = ?17 AND row_version = ?18",
          rusqlite::params![
            raw.doc_type,
            raw.title,
            raw.description,
            raw.category,
            raw.owner,
            raw.approver,
            raw.status,
            raw.version,
            raw.effective_date,
            raw.last_review_date,
            raw.next_review_date,
            raw.review_frequency,
            raw.notes,
            raw.row_version,
            raw.updated_at,
            raw.updated_by,
            raw.doc_id,
            expected_version,
          ],
        )?;
        if affected == 0 {
          return Ok(WriteOutcome::StaleVersion);
        }

        for entry in &entries {
          insert_history_row(&tx, entry)?;
        }
        tx.commit()?;
        Ok(WriteOutcome::Applied)
      })
      .await
      .map_err(map_db)?;

    match outcome {
      WriteOutcome::StaleVersion => Err(Error::VersionConflict(doc_id)),
      _ => Ok(()),
    }
  }

  async fn delete_document(&self, doc_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(doc_id);

    let affected = self
      .conn
      .call(move |conn| {
        // History, attachment, and link rows go with the document via
        // the schema's ON DELETE CASCADE.
        Ok(conn.execute(
          "DELETE FROM documents WHERE doc_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await
      .map_err(map_db)?;

    Ok(affected > 0)
  }

  // ── Documents — reads ─────────────────────────────────────────────────

  async fn get_document(&self, doc_id: Uuid) -> Result<Option<Document>> {
    let id_str = encode_uuid(doc_id);

    let raw: Option<RawDocument> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT * FROM documents WHERE doc_id = ?1",
              rusqlite::params![id_str],
              |row| RawDocument::from_row(row),
            )
            .optional()?,
        )
      })
      .await
      .map_err(map_db)?;

    raw.map(RawDocument::into_document).transpose()
  }

  async fn get_document_by_ref(&self, doc_ref: &str) -> Result<Option<Document>> {
    let doc_ref = doc_ref.to_owned();

    let raw: Option<RawDocument> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT * FROM documents WHERE doc_ref = ?1",
              rusqlite::params![doc_ref],
              |row| RawDocument::from_row(row),
            )
            .optional()?,
        )
      })
      .await
      .map_err(map_db)?;

    raw.map(RawDocument::into_document).transpose()
  }

  async fn doc_ref_exists(
    &self,
    doc_ref: &str,
    exclude: Option<Uuid>,
  ) -> Result<bool> {
    let doc_ref = doc_ref.to_owned();
    let exclude_str = exclude.map(encode_uuid);

    let found = self
      .conn
      .call(move |conn| {
        let row = if let Some(exclude_id) = exclude_str {
          conn
            .query_row(
              "SELECT 1 FROM documents WHERE doc_ref = ?1 AND doc_id != ?2",
              rusqlite::params![doc_ref, exclude_id],
              |_| Ok(()),
            )
            .optional()?
        } else {
          conn
            .query_row(
              "SELECT 1 FROM documents WHERE doc_ref = ?1",
              rusqlite::params![doc_ref],
              |_| Ok(()),
            )
            .optional()?
        };
        Ok(row.is_some())
      })
      .await
      .map_err(map_db)?;

    Ok(found)
  }

  async fn list_documents(&self, filter: &DocumentFilter) -> Result<Vec<Document>> {
    // Build the WHERE clause dynamically; every bound value is TEXT.
    let mut conds: Vec<&'static str> = vec![];
    let mut args: Vec<String> = vec![];

    if let Some(status) = filter.status {
      conds.push("status = ?");
      args.push(status.as_str().to_owned());
    }
    if let Some(doc_type) = filter.doc_type {
      conds.push("doc_type = ?");
      args.push(doc_type.as_str().to_owned());
    }
    if let Some(category) = &filter.category {
      conds.push("category = ?");
      args.push(category.clone());
    }
    if let Some(term) = &filter.search {
      conds.push("(title LIKE ? OR doc_ref LIKE ? OR description LIKE ?)");
      let pattern = format!("%{term}%");
      args.push(pattern.clone());
      args.push(pattern.clone());
      args.push(pattern);
    }

    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };

    // Sort column and direction come from closed enums, never from
    // caller strings.
    let sql = format!(
      "SELECT * FROM documents {where_clause} ORDER BY {} {}",
      filter.sort.column(),
      filter.dir.keyword(),
    );

    let raws: Vec<RawDocument> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(args.iter()), |row| {
            RawDocument::from_row(row)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(map_db)?;

    raws.into_iter().map(RawDocument::into_document).collect()
  }

  async fn refs_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
    let pattern = format!("{prefix}%");

    let refs = self
      .conn
      .call(move |conn| {
        let mut stmt =
          conn.prepare("SELECT doc_ref FROM documents WHERE doc_ref LIKE ?1")?;
        let rows = stmt
          .query_map(rusqlite::params![pattern], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await
      .map_err(map_db)?;

    Ok(refs)
  }

  async fn count_documents(&self) -> Result<u64> {
    let count: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM documents", [], |r| r.get(0))?)
      })
      .await
      .map_err(map_db)?;

    Ok(count as u64)
  }

  async fn counts_by_status(&self) -> Result<Vec<(DocumentStatus, u64)>> {
    let rows: Vec<(String, i64)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT status, COUNT(*) FROM documents GROUP BY status",
        )?;
        let rows = stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(map_db)?;

    rows
      .into_iter()
      .map(|(status, count)| Ok((decode_status(&status)?, count as u64)))
      .collect()
  }

  async fn counts_by_type(&self) -> Result<Vec<(DocumentType, u64)>> {
    let rows: Vec<(String, i64)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT doc_type, COUNT(*) FROM documents GROUP BY doc_type",
        )?;
        let rows = stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(map_db)?;

    rows
      .into_iter()
      .map(|(doc_type, count)| Ok((decode_doc_type(&doc_type)?, count as u64)))
      .collect()
  }

  // ── Audit trail ───────────────────────────────────────────────────────

  async fn append_history(&self, entry: &HistoryEntry) -> Result<()> {
    let raw = RawHistoryEntry::from_entry(entry);

    self
      .conn
      .call(move |conn| {
        insert_history_row(conn, &raw)?;
        Ok(())
      })
      .await
      .map_err(map_db)?;

    Ok(())
  }

  async fn history_for(
    &self,
    doc_id: Uuid,
    limit: u32,
  ) -> Result<Vec<HistoryEntry>> {
    let id_str = encode_uuid(doc_id);

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT * FROM document_history
           WHERE doc_id = ?1
           ORDER BY changed_at DESC, rowid DESC
           LIMIT ?2",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str, limit], |row| {
            RawHistoryEntry::from_row(row)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(map_db)?;

    raws.into_iter().map(RawHistoryEntry::into_entry).collect()
  }

  async fn recent_activity(&self, limit: u32) -> Result<Vec<HistoryEntry>> {
    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT * FROM document_history
           ORDER BY changed_at DESC, rowid DESC
           LIMIT ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![limit], |row| {
            RawHistoryEntry::from_row(row)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(map_db)?;

    raws.into_iter().map(RawHistoryEntry::into_entry).collect()
  }

  async fn activity_by_actor(
    &self,
    actor_id: &str,
    limit: u32,
  ) -> Result<Vec<HistoryEntry>> {
    let actor_id = actor_id.to_owned();

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT * FROM document_history
           WHERE changed_by = ?1
           ORDER BY changed_at DESC, rowid DESC
           LIMIT ?2",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![actor_id, limit], |row| {
            RawHistoryEntry::from_row(row)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(map_db)?;

    raws.into_iter().map(RawHistoryEntry::into_entry).collect()
  }

  async fn activity_between(
    &self,
    start: chrono::DateTime<chrono::Utc>,
    end: chrono::DateTime<chrono::Utc>,
  ) -> Result<Vec<HistoryEntry>> {
    let start_str = encode_dt(start);
    let end_str = encode_dt(end);

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT * FROM document_history
           WHERE changed_at >= ?1 AND changed_at <= ?2
           ORDER BY changed_at DESC, rowid DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![start_str, end_str], |row| {
            RawHistoryEntry::from_row(row)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(map_db)?;

    raws.into_iter().map(RawHistoryEntry::into_entry).collect()
  }

  // ── Collaborator lookups ──────────────────────────────────────────────

  async fn category_is_active(&self, code: &str) -> Result<bool> {
    let code = code.to_owned();

    let found = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM categories WHERE code = ?1 AND is_active = 1",
              rusqlite::params![code],
              |_| Ok(()),
            )
            .optional()?
            .is_some(),
        )
      })
      .await
      .map_err(map_db)?;

    Ok(found)
  }

  async fn list_categories(&self, include_inactive: bool) -> Result<Vec<Category>> {
    let raws: Vec<RawCategory> = self
      .conn
      .call(move |conn| {
        let sql = if include_inactive {
          "SELECT code, name, is_active, sort_order FROM categories
           ORDER BY sort_order, code"
        } else {
          "SELECT code, name, is_active, sort_order FROM categories
           WHERE is_active = 1 ORDER BY sort_order, code"
        };
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawCategory {
              code:       row.get(0)?,
              name:       row.get(1)?,
              is_active:  row.get(2)?,
              sort_order: row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(map_db)?;

    Ok(raws.into_iter().map(RawCategory::into_category).collect())
  }

  async fn get_setting(&self, key: &str) -> Result<Option<String>> {
    let key = key.to_owned();

    let value = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT value FROM settings WHERE key = ?1",
              rusqlite::params![key],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await
      .map_err(map_db)?;

    Ok(value)
  }

  async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
    let key = key.to_owned();
    let value = value.to_owned();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO settings (key, value) VALUES (?1, ?2)
           ON CONFLICT(key) DO UPDATE SET value = excluded.value",
          rusqlite::params![key, value],
        )?;
        Ok(())
      })
      .await
      .map_err(map_db)?;

    Ok(())
  }
}
