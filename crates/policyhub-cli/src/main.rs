//! `policyhub` — command-line front end for the document register.
//!
//! Opens the shared register database (typically a file on a network
//! path), threads an explicit actor through every call, and prints
//! plain text or JSON.
//!
//! # Usage
//!
//! ```text
//! policyhub --db /mnt/shared/policyhub.db list --status ACTIVE
//! policyhub create --type POLICY --category AML --title "AML Policy" --owner "Compliance"
//! policyhub review POL-AML-001 --notes "Annual check complete"
//! policyhub dashboard
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use policyhub_core::{
  access::{Actor, Role},
  clock::{Clock, SystemClock},
  document::{
    Document, DocumentPatch, DocumentStatus, DocumentType, NewDocument,
    ReviewFrequency,
  },
  history::HistoryEntry,
  schedule::ReviewStatus,
  store::{DocumentFilter, SortDir, SortKey},
};
use policyhub_service::DocumentLifecycleService;
use policyhub_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

type Service = DocumentLifecycleService<SqliteStore, SystemClock>;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "policyhub", about = "Compliance document register")]
struct Cli {
  /// Path to the shared register database.
  #[arg(long, env = "POLICYHUB_DB", default_value = "policyhub.db")]
  db: PathBuf,

  /// Acting user id, recorded verbatim in audit stamps.
  #[arg(long, env = "POLICYHUB_ACTOR", default_value = "local")]
  actor: String,

  /// Acting user role: ADMIN, EDITOR, or VIEWER.
  #[arg(long, env = "POLICYHUB_ROLE", default_value = "ADMIN", value_parser = parse_role)]
  role: Role,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// List documents.
  List {
    #[arg(long, value_parser = parse_status)]
    status: Option<DocumentStatus>,
    #[arg(long = "type", value_parser = parse_type)]
    doc_type: Option<DocumentType>,
    #[arg(long)]
    category: Option<String>,
    /// Filter on the derived review band (OVERDUE, DUE_SOON, ...).
    #[arg(long, value_parser = parse_review_status)]
    review: Option<ReviewStatus>,
    /// Substring match over title, reference, and description.
    #[arg(long)]
    search: Option<String>,
    #[arg(long, default_value = "doc_ref", value_parser = parse_sort)]
    sort: SortKey,
    #[arg(long)]
    desc: bool,
    #[arg(long)]
    json: bool,
  },
  /// Show one document (by reference code or id).
  Show {
    document: String,
    #[arg(long)]
    json: bool,
  },
  /// Create a document. The reference code is generated when omitted.
  Create {
    #[arg(long = "type", value_parser = parse_type)]
    doc_type: DocumentType,
    #[arg(long)]
    category: String,
    #[arg(long)]
    title: String,
    #[arg(long)]
    owner: String,
    #[arg(long = "ref")]
    doc_ref: Option<String>,
    #[arg(long, default_value = "DRAFT", value_parser = parse_status)]
    status: DocumentStatus,
    #[arg(long, default_value = "1.0")]
    version: String,
    /// Defaults to today.
    #[arg(long, value_parser = parse_date)]
    effective: Option<NaiveDate>,
    /// Defaults to today.
    #[arg(long, value_parser = parse_date)]
    last_review: Option<NaiveDate>,
    /// Derived from last review + frequency when omitted.
    #[arg(long, value_parser = parse_date)]
    next_review: Option<NaiveDate>,
    #[arg(long, default_value = "ANNUAL", value_parser = parse_frequency)]
    frequency: ReviewFrequency,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    approver: Option<String>,
    #[arg(long)]
    notes: Option<String>,
  },
  /// Mark a document as reviewed today.
  Review {
    document: String,
    #[arg(long)]
    notes: Option<String>,
    #[arg(long)]
    new_version: Option<String>,
  },
  /// Change a document's lifecycle status.
  SetStatus {
    document: String,
    #[arg(value_parser = parse_status)]
    status: DocumentStatus,
  },
  /// Permanently delete a document and its audit history.
  Delete { document: String },
  /// Show a document's audit history, most recent first.
  History {
    document: String,
    #[arg(long, default_value_t = 20)]
    limit: u32,
  },
  /// Recent activity across the whole register.
  Activity {
    #[arg(long, default_value_t = 20)]
    limit: u32,
  },
  /// Register overview: counts and documents needing attention.
  Dashboard,
  /// Suggest the next free reference code for a type/category pair.
  NextRef {
    #[arg(value_parser = parse_type)]
    doc_type: DocumentType,
    category: String,
  },
}

// ─── Value parsers ────────────────────────────────────────────────────────────

fn parse_role(s: &str) -> Result<Role, String> {
  Role::parse(&s.to_uppercase()).ok_or_else(|| format!("unknown role: {s}"))
}

fn parse_type(s: &str) -> Result<DocumentType, String> {
  DocumentType::parse(&s.to_uppercase())
    .ok_or_else(|| format!("unknown document type: {s}"))
}

fn parse_status(s: &str) -> Result<DocumentStatus, String> {
  DocumentStatus::parse(&s.to_uppercase())
    .ok_or_else(|| format!("unknown status: {s}"))
}

fn parse_frequency(s: &str) -> Result<ReviewFrequency, String> {
  ReviewFrequency::parse(&s.to_uppercase())
    .ok_or_else(|| format!("unknown review frequency: {s}"))
}

fn parse_review_status(s: &str) -> Result<ReviewStatus, String> {
  ReviewStatus::parse(&s.to_uppercase())
    .ok_or_else(|| format!("unknown review status: {s}"))
}

fn parse_sort(s: &str) -> Result<SortKey, String> {
  SortKey::parse(s).ok_or_else(|| format!("unknown sort column: {s}"))
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let actor = Actor::new(cli.actor.clone(), cli.role);

  let store = SqliteStore::open(&cli.db)
    .await
    .with_context(|| format!("failed to open register at {}", cli.db.display()))?;
  let service = DocumentLifecycleService::new(store, SystemClock);

  run(&service, &actor, cli.command).await
}

async fn run(service: &Service, actor: &Actor, command: Command) -> Result<()> {
  match command {
    Command::List {
      status,
      doc_type,
      category,
      review,
      search,
      sort,
      desc,
      json,
    } => {
      let filter = DocumentFilter {
        status,
        doc_type,
        category,
        search,
        sort,
        dir: if desc { SortDir::Desc } else { SortDir::Asc },
      };
      let documents = service.list_documents(actor, &filter, review).await?;
      if json {
        println!("{}", serde_json::to_string_pretty(&documents)?);
      } else {
        for doc in &documents {
          print_row(doc);
        }
        println!("{} document(s)", documents.len());
      }
    }

    Command::Show { document, json } => {
      let doc = resolve(service, actor, &document).await?;
      if json {
        println!("{}", serde_json::to_string_pretty(&doc)?);
      } else {
        print_document(service, &doc).await?;
      }
    }

    Command::Create {
      doc_type,
      category,
      title,
      owner,
      doc_ref,
      status,
      version,
      effective,
      last_review,
      next_review,
      frequency,
      description,
      approver,
      notes,
    } => {
      let doc_ref = match doc_ref {
        Some(r) => r,
        None => service.generate_next_ref(doc_type, &category).await?,
      };
      let today = SystemClock.today();
      let input = NewDocument {
        doc_type,
        doc_ref,
        title,
        description,
        category,
        owner,
        approver,
        status,
        version,
        effective_date: effective.unwrap_or(today),
        last_review_date: last_review.unwrap_or(today),
        next_review_date: next_review,
        review_frequency: frequency,
        notes,
      };
      let doc = service.create_document(actor, input).await?;
      println!("created {} ({})", doc.doc_ref, doc.doc_id);
    }

    Command::Review {
      document,
      notes,
      new_version,
    } => {
      let doc = resolve(service, actor, &document).await?;
      let reviewed = service
        .mark_as_reviewed(actor, doc.doc_id, notes, new_version)
        .await?
        .context("document vanished mid-review")?;
      println!(
        "reviewed {}: next review {}",
        reviewed.doc_ref,
        reviewed
          .next_review_date
          .map(|d| d.to_string())
          .unwrap_or_else(|| "unscheduled".to_owned()),
      );
    }

    Command::SetStatus { document, status } => {
      let doc = resolve(service, actor, &document).await?;
      let patch = DocumentPatch {
        status: Some(status),
        ..Default::default()
      };
      let updated = service
        .update_document(actor, doc.doc_id, patch)
        .await?
        .context("document vanished mid-update")?;
      println!("{} is now {}", updated.doc_ref, updated.status);
    }

    Command::Delete { document } => {
      let doc = resolve(service, actor, &document).await?;
      if service.delete_document(actor, doc.doc_id).await? {
        println!("deleted {} and its audit history", doc.doc_ref);
      } else {
        println!("nothing to delete");
      }
    }

    Command::History { document, limit } => {
      let doc = resolve(service, actor, &document).await?;
      for entry in service.history_for(actor, doc.doc_id, limit).await? {
        print_entry(&entry);
      }
    }

    Command::Activity { limit } => {
      for entry in service.recent_activity(actor, limit).await? {
        print_entry(&entry);
      }
    }

    Command::Dashboard => {
      println!("documents: {}", service.total_documents(actor).await?);

      println!("\nby status:");
      for (status, count) in service.document_counts_by_status(actor).await? {
        println!("  {:<14} {count}", status.display_name());
      }

      println!("\nby type:");
      for (doc_type, count) in service.document_counts_by_type(actor).await? {
        println!("  {:<14} {count}", doc_type.display_name());
      }

      println!("\nreview bands (non-archived):");
      for (band, count) in service.review_status_counts(actor).await? {
        println!("  {:<14} {count}", band.display_name());
      }

      let attention = service.documents_requiring_attention(actor, 10).await?;
      if !attention.is_empty() {
        println!("\nneeding attention:");
        for doc in &attention {
          print_row(doc);
        }
      }
    }

    Command::NextRef { doc_type, category } => {
      println!("{}", service.generate_next_ref(doc_type, &category).await?);
    }
  }

  Ok(())
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

/// Look a document up by id when the argument parses as a UUID,
/// otherwise by reference code.
async fn resolve(service: &Service, actor: &Actor, key: &str) -> Result<Document> {
  let found = if let Ok(id) = Uuid::parse_str(key) {
    service.get_document(actor, id).await?
  } else {
    service.get_document_by_ref(actor, key).await?
  };
  match found {
    Some(doc) => Ok(doc),
    None => bail!("no document matching {key:?}"),
  }
}

fn print_row(doc: &Document) {
  println!(
    "{:<14} {:<9} {:<12} v{:<5} next {}  {}",
    doc.doc_ref,
    doc.doc_type,
    doc.status,
    doc.version,
    doc
      .next_review_date
      .map(|d| d.to_string())
      .unwrap_or_else(|| "----------".to_owned()),
    doc.title,
  );
}

async fn print_document(service: &Service, doc: &Document) -> Result<()> {
  let thresholds = service.review_thresholds().await?;
  let band = doc.review_status(SystemClock.today(), thresholds);

  println!("{}  {}", doc.doc_ref, doc.title);
  println!("  id:          {}", doc.doc_id);
  println!("  type:        {}", doc.doc_type.display_name());
  println!("  category:    {}", doc.category);
  println!("  status:      {}", doc.status.display_name());
  println!("  version:     {}", doc.version);
  println!("  owner:       {}", doc.owner);
  if let Some(approver) = &doc.approver {
    println!("  approver:    {approver}");
  }
  if let Some(description) = &doc.description {
    println!("  description: {description}");
  }
  println!("  effective:   {}", doc.effective_date);
  println!("  last review: {}", doc.last_review_date);
  println!(
    "  next review: {} ({})",
    doc
      .next_review_date
      .map(|d| d.to_string())
      .unwrap_or_else(|| "unscheduled".to_owned()),
    band.display_name(),
  );
  println!("  frequency:   {}", doc.review_frequency.display_name());
  if let Some(notes) = &doc.notes {
    println!("  notes:       {notes}");
  }
  println!(
    "  created:     {} by {}",
    doc.created_at.format("%Y-%m-%d %H:%M"),
    doc.created_by,
  );
  println!(
    "  updated:     {} by {}",
    doc.updated_at.format("%Y-%m-%d %H:%M"),
    doc.updated_by,
  );
  Ok(())
}

fn print_entry(entry: &HistoryEntry) {
  let detail = match (&entry.field_changed, &entry.old_value, &entry.new_value) {
    (Some(field), Some(old), Some(new)) => format!("{field}: {old:?} -> {new:?}"),
    (Some(field), None, Some(new)) => format!("{field}: set to {new:?}"),
    (None, None, Some(new)) => new.clone(),
    (None, Some(old), None) => old.clone(),
    _ => String::new(),
  };
  let notes = entry
    .notes
    .as_deref()
    .map(|n| format!("  ({n})"))
    .unwrap_or_default();
  println!(
    "{}  {:<19} {:<12} {}{}",
    entry.changed_at.format("%Y-%m-%d %H:%M"),
    entry.action,
    entry.changed_by,
    detail,
    notes,
  );
}
