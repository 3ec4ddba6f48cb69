//! SQL schema for the PolicyHub SQLite store.
//!
//! Executed at connection startup; idempotent thanks to
//! `CREATE TABLE IF NOT EXISTS`. Future migrations will be gated on
//! `PRAGMA user_version`.

use policyhub_core::schedule::{UPCOMING_DAYS_KEY, WARNING_DAYS_KEY};

/// Full schema DDL.
///
/// `busy_timeout` bounds how long a blocked writer waits for the
/// single-writer lock before surfacing a failure instead of hanging.
/// `documents.category` is intentionally not a foreign key — category
/// existence is checked by the service at write time, against the
/// collaborator-owned `categories` table.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA busy_timeout = 30000;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS categories (
    code       TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    is_active  INTEGER NOT NULL DEFAULT 1,
    sort_order INTEGER NOT NULL DEFAULT 99
);

CREATE TABLE IF NOT EXISTS documents (
    doc_id           TEXT PRIMARY KEY,
    doc_type         TEXT NOT NULL CHECK (doc_type IN ('POLICY', 'PROCEDURE', 'MANUAL', 'HR_OTHERS')),
    doc_ref          TEXT UNIQUE NOT NULL,
    title            TEXT NOT NULL,
    description      TEXT,
    category         TEXT NOT NULL,
    owner            TEXT NOT NULL,
    approver         TEXT,
    status           TEXT NOT NULL CHECK (status IN ('DRAFT', 'ACTIVE', 'UNDER_REVIEW', 'SUPERSEDED', 'ARCHIVED')),
    version          TEXT NOT NULL,
    effective_date   TEXT NOT NULL,
    last_review_date TEXT NOT NULL,
    next_review_date TEXT,
    review_frequency TEXT NOT NULL CHECK (review_frequency IN ('ANNUAL', 'SEMI_ANNUAL', 'QUARTERLY', 'AD_HOC')),
    notes            TEXT,
    row_version      INTEGER NOT NULL DEFAULT 1,
    created_at       TEXT NOT NULL,
    created_by       TEXT NOT NULL,
    updated_at       TEXT NOT NULL,
    updated_by       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_documents_doc_ref     ON documents(doc_ref);
CREATE INDEX IF NOT EXISTS idx_documents_category    ON documents(category);
CREATE INDEX IF NOT EXISTS idx_documents_status      ON documents(status);
CREATE INDEX IF NOT EXISTS idx_documents_next_review ON documents(next_review_date);

-- The audit ledger is strictly append-only. No UPDATE is ever issued
-- against this table; rows disappear only via the delete cascade.
CREATE TABLE IF NOT EXISTS document_history (
    history_id    TEXT PRIMARY KEY,
    doc_id        TEXT NOT NULL REFERENCES documents(doc_id) ON DELETE CASCADE,
    action        TEXT NOT NULL CHECK (action IN ('CREATED', 'UPDATED', 'STATUS_CHANGED', 'REVIEWED', 'ATTACHMENT_ADDED', 'ATTACHMENT_REMOVED', 'LINK_ADDED', 'LINK_REMOVED')),
    field_changed TEXT,
    old_value     TEXT,
    new_value     TEXT,
    changed_by    TEXT NOT NULL,
    changed_at    TEXT NOT NULL,
    notes         TEXT
);

CREATE INDEX IF NOT EXISTS idx_history_doc_id ON document_history(doc_id);

-- Row storage for the external attachment and link services. Present
-- here so deleting a document cascades to them; their CRUD lives with
-- those collaborators.
CREATE TABLE IF NOT EXISTS attachments (
    attachment_id TEXT PRIMARY KEY,
    doc_id        TEXT NOT NULL REFERENCES documents(doc_id) ON DELETE CASCADE,
    filename      TEXT NOT NULL,
    file_path     TEXT NOT NULL,
    file_size     INTEGER NOT NULL,
    mime_type     TEXT,
    version_label TEXT NOT NULL,
    is_current    INTEGER NOT NULL DEFAULT 1,
    uploaded_at   TEXT NOT NULL,
    uploaded_by   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_attachments_doc_id ON attachments(doc_id);

CREATE TABLE IF NOT EXISTS document_links (
    link_id       TEXT PRIMARY KEY,
    parent_doc_id TEXT NOT NULL REFERENCES documents(doc_id) ON DELETE CASCADE,
    child_doc_id  TEXT NOT NULL REFERENCES documents(doc_id) ON DELETE CASCADE,
    link_type     TEXT NOT NULL CHECK (link_type IN ('IMPLEMENTS', 'REFERENCES', 'SUPERSEDES')),
    created_at    TEXT NOT NULL,
    created_by    TEXT NOT NULL,
    UNIQUE (parent_doc_id, child_doc_id, link_type)
);

CREATE TABLE IF NOT EXISTS settings (
    key   TEXT PRIMARY KEY,
    value TEXT
);

PRAGMA user_version = 1;
";

/// Settings written into a fresh store: `(key, value)`.
pub const DEFAULT_SETTINGS: &[(&str, &str)] =
  &[(WARNING_DAYS_KEY, "30"), (UPCOMING_DAYS_KEY, "90")];
