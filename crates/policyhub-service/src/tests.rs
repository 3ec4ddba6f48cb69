//! End-to-end lifecycle tests against an in-memory store and a pinned
//! clock.

use chrono::NaiveDate;
use policyhub_core::{
  Error,
  access::{Actor, Role},
  clock::FixedClock,
  document::{
    DocumentPatch, DocumentStatus, DocumentType, NewDocument, ReviewFrequency,
  },
  history::HistoryAction,
  schedule::{ReviewStatus, WARNING_DAYS_KEY},
  store::{DocumentFilter, DocumentStore},
};
use policyhub_store_sqlite::SqliteStore;

use crate::DocumentLifecycleService;

type Service = DocumentLifecycleService<SqliteStore, FixedClock>;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn admin() -> Actor {
  Actor::new("admin-1", Role::Admin)
}

fn editor() -> Actor {
  Actor::new("editor-1", Role::Editor)
}

fn viewer() -> Actor {
  Actor::new("viewer-1", Role::Viewer)
}

/// Service pinned to 2024-06-10, plus a handle on the underlying store.
async fn service() -> (Service, SqliteStore) {
  service_on(date(2024, 6, 10)).await
}

async fn service_on(today: NaiveDate) -> (Service, SqliteStore) {
  let store = SqliteStore::open_in_memory().await.expect("in-memory store");
  let service =
    DocumentLifecycleService::new(store.clone(), FixedClock::on(today));
  (service, store)
}

fn new_document(doc_ref: &str) -> NewDocument {
  NewDocument {
    doc_type:         DocumentType::Policy,
    doc_ref:          doc_ref.to_owned(),
    title:            "Anti-Money Laundering Policy".to_owned(),
    description:      Some("Controls against money laundering".to_owned()),
    category:         "AML".to_owned(),
    owner:            "Compliance Officer".to_owned(),
    approver:         Some("Board of Directors".to_owned()),
    status:           DocumentStatus::Active,
    version:          "1.0".to_owned(),
    effective_date:   date(2024, 1, 15),
    last_review_date: date(2024, 1, 15),
    next_review_date: Some(date(2025, 1, 15)),
    review_frequency: ReviewFrequency::Annual,
    notes:            None,
  }
}

// ─── Creation ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_stamps_and_logs() {
  let (svc, _) = service().await;

  let doc = svc
    .create_document(&admin(), new_document("POL-AML-001"))
    .await
    .unwrap();
  assert_eq!(doc.created_by, "admin-1");
  assert_eq!(doc.updated_by, "admin-1");
  assert_eq!(doc.row_version, 1);

  let fetched = svc
    .get_document(&admin(), doc.doc_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(fetched.doc_ref, "POL-AML-001");

  let history = svc.history_for(&admin(), doc.doc_id, 50).await.unwrap();
  assert_eq!(history.len(), 1);
  assert_eq!(history[0].action, HistoryAction::Created);
  assert!(history[0].field_changed.is_none());
}

#[tokio::test]
async fn create_folds_reference_to_uppercase() {
  let (svc, _) = service().await;

  let doc = svc
    .create_document(&admin(), new_document("  pol-aml-001 "))
    .await
    .unwrap();
  assert_eq!(doc.doc_ref, "POL-AML-001");

  // Lookup by reference also folds.
  let fetched = svc
    .get_document_by_ref(&admin(), "pol-aml-001")
    .await
    .unwrap();
  assert!(fetched.is_some());
}

#[tokio::test]
async fn create_rejects_malformed_reference() {
  let (svc, store) = service().await;

  let err = svc
    .create_document(&admin(), new_document("POLAML001"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::InvalidRef { .. }));
  assert_eq!(store.count_documents().await.unwrap(), 0);
}

#[tokio::test]
async fn create_rejects_unknown_category() {
  let (svc, _) = service().await;

  let mut input = new_document("POL-XYZ-001");
  input.category = "XYZ".to_owned();
  let err = svc.create_document(&admin(), input).await.unwrap_err();
  assert!(matches!(err, Error::InactiveCategory(c) if c == "XYZ"));
}

#[tokio::test]
async fn duplicate_reference_conflicts_case_insensitively() {
  let (svc, store) = service().await;

  svc
    .create_document(&admin(), new_document("POL-AML-001"))
    .await
    .unwrap();
  let err = svc
    .create_document(&admin(), new_document("pol-aml-001"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::DuplicateRef(r) if r == "POL-AML-001"));
  assert_eq!(store.count_documents().await.unwrap(), 1);
}

#[tokio::test]
async fn create_derives_next_review_when_absent() {
  let (svc, _) = service().await;

  let mut input = new_document("POL-AML-001");
  input.last_review_date = date(2024, 3, 1);
  input.next_review_date = None;
  let doc = svc.create_document(&admin(), input).await.unwrap();
  assert_eq!(doc.next_review_date, Some(date(2025, 3, 1)));

  let mut ad_hoc = new_document("POL-AML-002");
  ad_hoc.review_frequency = ReviewFrequency::AdHoc;
  ad_hoc.next_review_date = None;
  let doc = svc.create_document(&admin(), ad_hoc).await.unwrap();
  assert_eq!(doc.next_review_date, None);
}

#[tokio::test]
async fn create_keeps_supplied_next_review() {
  let (svc, _) = service().await;

  let mut input = new_document("POL-AML-001");
  input.last_review_date = date(2024, 1, 1);
  input.next_review_date = Some(date(2025, 1, 1));
  let doc = svc.create_document(&admin(), input).await.unwrap();
  assert_eq!(doc.next_review_date, Some(date(2025, 1, 1)));
}

#[tokio::test]
async fn viewer_cannot_create() {
  let (svc, store) = service().await;

  let err = svc
    .create_document(&viewer(), new_document("POL-AML-001"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Forbidden { .. }));
  // Denied before any state was touched.
  assert_eq!(store.count_documents().await.unwrap(), 0);
}

// ─── Updates ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn identical_payload_is_a_noop() {
  let (svc, _) = service().await;
  let doc = svc
    .create_document(&admin(), new_document("POL-AML-001"))
    .await
    .unwrap();

  let patch = DocumentPatch {
    title: Some(doc.title.clone()),
    description: doc.description.clone(),
    owner: Some(doc.owner.clone()),
    status: Some(doc.status),
    version: Some(doc.version.clone()),
    effective_date: Some(doc.effective_date),
    ..Default::default()
  };
  let unchanged = svc
    .update_document(&admin(), doc.doc_id, patch)
    .await
    .unwrap()
    .unwrap();

  assert_eq!(unchanged.updated_at, doc.updated_at);
  assert_eq!(unchanged.row_version, 1);
  let history = svc.history_for(&admin(), doc.doc_id, 50).await.unwrap();
  assert_eq!(history.len(), 1); // only CREATED
}

#[tokio::test]
async fn update_logs_one_entry_per_changed_field() {
  let (svc, _) = service().await;
  let doc = svc
    .create_document(&admin(), new_document("POL-AML-001"))
    .await
    .unwrap();

  let patch = DocumentPatch {
    title: Some("AML & CFT Policy".to_owned()),
    owner: Some("Head of Compliance".to_owned()),
    notes: Some("Aligned with updated regulations".to_owned()),
    ..Default::default()
  };
  let updated = svc
    .update_document(&editor(), doc.doc_id, patch)
    .await
    .unwrap()
    .unwrap();

  assert_eq!(updated.title, "AML & CFT Policy");
  assert_eq!(updated.row_version, 2);
  assert_eq!(updated.updated_by, "editor-1");

  let history = svc.history_for(&admin(), doc.doc_id, 50).await.unwrap();
  let updates: Vec<_> = history
    .iter()
    .filter(|e| e.action == HistoryAction::Updated)
    .collect();
  assert_eq!(updates.len(), 3);

  let title_entry = updates
    .iter()
    .find(|e| e.field_changed.as_deref() == Some("title"))
    .unwrap();
  assert_eq!(
    title_entry.old_value.as_deref(),
    Some("Anti-Money Laundering Policy")
  );
  assert_eq!(title_entry.new_value.as_deref(), Some("AML & CFT Policy"));
  assert_eq!(title_entry.changed_by, "editor-1");
}

#[tokio::test]
async fn status_change_gets_its_own_action() {
  let (svc, _) = service().await;
  let doc = svc
    .create_document(&admin(), new_document("POL-AML-001"))
    .await
    .unwrap();

  let patch = DocumentPatch {
    status: Some(DocumentStatus::UnderReview),
    ..Default::default()
  };
  let updated = svc
    .update_document(&admin(), doc.doc_id, patch)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updated.status, DocumentStatus::UnderReview);

  let history = svc.history_for(&admin(), doc.doc_id, 50).await.unwrap();
  assert_eq!(history[0].action, HistoryAction::StatusChanged);
  assert_eq!(history[0].old_value.as_deref(), Some("ACTIVE"));
  assert_eq!(history[0].new_value.as_deref(), Some("UNDER_REVIEW"));
  assert!(
    !history
      .iter()
      .any(|e| e.action == HistoryAction::Updated
        && e.field_changed.as_deref() == Some("status"))
  );
}

#[tokio::test]
async fn illegal_transition_is_rejected_before_writing() {
  let (svc, _) = service().await;
  let doc = svc
    .create_document(&admin(), new_document("POL-AML-001"))
    .await
    .unwrap();

  let patch = DocumentPatch {
    status: Some(DocumentStatus::Draft),
    // Legal field changes in the same patch must not survive the
    // rejected transition.
    title: Some("Should not land".to_owned()),
    ..Default::default()
  };
  let err = svc
    .update_document(&admin(), doc.doc_id, patch)
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::InvalidTransition {
      from: DocumentStatus::Active,
      to:   DocumentStatus::Draft,
    }
  ));

  let fetched = svc
    .get_document(&admin(), doc.doc_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(fetched.title, doc.title);
  assert_eq!(
    svc.history_for(&admin(), doc.doc_id, 50).await.unwrap().len(),
    1
  );
}

#[tokio::test]
async fn update_missing_document_returns_none() {
  let (svc, _) = service().await;
  let result = svc
    .update_document(&admin(), uuid::Uuid::new_v4(), DocumentPatch::default())
    .await
    .unwrap();
  assert!(result.is_none());
}

// ─── Reviews ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn review_rolls_the_dates_forward() {
  let (svc, _) = service().await; // today = 2024-06-10
  let doc = svc
    .create_document(&admin(), new_document("POL-AML-001"))
    .await
    .unwrap();

  let reviewed = svc
    .mark_as_reviewed(
      &editor(),
      doc.doc_id,
      Some("Annual review complete".to_owned()),
      None,
    )
    .await
    .unwrap()
    .unwrap();

  assert_eq!(reviewed.last_review_date, date(2024, 6, 10));
  assert_eq!(reviewed.next_review_date, Some(date(2025, 6, 10)));

  let history = svc.history_for(&admin(), doc.doc_id, 50).await.unwrap();
  let reviews: Vec<_> = history
    .iter()
    .filter(|e| e.action == HistoryAction::Reviewed)
    .collect();
  assert_eq!(reviews.len(), 1);
  assert_eq!(reviews[0].notes.as_deref(), Some("Annual review complete"));
}

#[tokio::test]
async fn review_of_ad_hoc_document_keeps_its_date() {
  let (svc, _) = service().await;

  let mut input = new_document("POL-AML-001");
  input.review_frequency = ReviewFrequency::AdHoc;
  input.next_review_date = Some(date(2024, 12, 31));
  let doc = svc.create_document(&admin(), input).await.unwrap();

  let reviewed = svc
    .mark_as_reviewed(&admin(), doc.doc_id, None, None)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(reviewed.last_review_date, date(2024, 6, 10));
  assert_eq!(reviewed.next_review_date, Some(date(2024, 12, 31)));
}

#[tokio::test]
async fn review_logs_version_change_only_when_it_differs() {
  let (svc, _) = service().await;
  let doc = svc
    .create_document(&admin(), new_document("POL-AML-001"))
    .await
    .unwrap();

  // Same label: one REVIEWED entry, nothing else.
  svc
    .mark_as_reviewed(&admin(), doc.doc_id, None, Some("1.0".to_owned()))
    .await
    .unwrap()
    .unwrap();
  let history = svc.history_for(&admin(), doc.doc_id, 50).await.unwrap();
  assert_eq!(history.len(), 2); // CREATED + REVIEWED

  // New label: REVIEWED plus a version field change.
  let reviewed = svc
    .mark_as_reviewed(&admin(), doc.doc_id, None, Some("2.0".to_owned()))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(reviewed.version, "2.0");

  let history = svc.history_for(&admin(), doc.doc_id, 50).await.unwrap();
  let version_entry = history
    .iter()
    .find(|e| e.field_changed.as_deref() == Some("version"))
    .unwrap();
  assert_eq!(version_entry.old_value.as_deref(), Some("1.0"));
  assert_eq!(version_entry.new_value.as_deref(), Some("2.0"));
}

#[tokio::test]
async fn viewer_cannot_review() {
  let (svc, _) = service().await;
  let doc = svc
    .create_document(&admin(), new_document("POL-AML-001"))
    .await
    .unwrap();

  let err = svc
    .mark_as_reviewed(&viewer(), doc.doc_id, None, None)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Forbidden { .. }));
}

// ─── Deletion ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_removes_document_and_ledger() {
  let (svc, _) = service().await;
  let doc = svc
    .create_document(&admin(), new_document("POL-AML-001"))
    .await
    .unwrap();
  svc
    .mark_as_reviewed(&admin(), doc.doc_id, None, None)
    .await
    .unwrap();

  assert!(svc.delete_document(&admin(), doc.doc_id).await.unwrap());
  assert!(
    svc
      .get_document(&admin(), doc.doc_id)
      .await
      .unwrap()
      .is_none()
  );
  assert!(
    svc
      .history_for(&admin(), doc.doc_id, 50)
      .await
      .unwrap()
      .is_empty()
  );
  assert!(!svc.delete_document(&admin(), doc.doc_id).await.unwrap());
}

#[tokio::test]
async fn only_admins_delete() {
  let (svc, store) = service().await;
  let doc = svc
    .create_document(&admin(), new_document("POL-AML-001"))
    .await
    .unwrap();

  let err = svc
    .delete_document(&editor(), doc.doc_id)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Forbidden { .. }));
  assert_eq!(store.count_documents().await.unwrap(), 1);
}

// ─── Reference allocation ────────────────────────────────────────────────────

#[tokio::test]
async fn sequential_creates_get_sequential_refs() {
  let (svc, _) = service().await;

  let first = svc
    .generate_next_ref(DocumentType::Policy, "AML")
    .await
    .unwrap();
  assert_eq!(first, "POL-AML-001");
  svc
    .create_document(&admin(), new_document(&first))
    .await
    .unwrap();

  let second = svc
    .generate_next_ref(DocumentType::Policy, "AML")
    .await
    .unwrap();
  assert_eq!(second, "POL-AML-002");
  svc
    .create_document(&admin(), new_document(&second))
    .await
    .unwrap();

  assert_eq!(
    svc
      .generate_next_ref(DocumentType::Policy, "AML")
      .await
      .unwrap(),
    "POL-AML-003"
  );

  // Numbering is independent per (type, category) pair.
  assert_eq!(
    svc
      .generate_next_ref(DocumentType::Procedure, "AML")
      .await
      .unwrap(),
    "PROC-AML-001"
  );
  assert_eq!(
    svc
      .generate_next_ref(DocumentType::Policy, "GOV")
      .await
      .unwrap(),
    "POL-GOV-001"
  );
}

// ─── Dashboards & review status ──────────────────────────────────────────────

#[tokio::test]
async fn annual_policy_is_due_soon_in_mid_december() {
  let (svc, _) = service_on(date(2024, 12, 15)).await;

  let mut input = new_document("POL-AML-001");
  input.last_review_date = date(2024, 1, 1);
  input.next_review_date = Some(date(2025, 1, 1));
  let doc = svc.create_document(&admin(), input).await.unwrap();

  // 17 days out, inside the 30-day warning window.
  let due_soon = svc
    .list_documents(
      &viewer(),
      &DocumentFilter::default(),
      Some(ReviewStatus::DueSoon),
    )
    .await
    .unwrap();
  assert_eq!(due_soon.len(), 1);
  assert_eq!(due_soon[0].doc_id, doc.doc_id);

  let overdue = svc
    .list_documents(
      &viewer(),
      &DocumentFilter::default(),
      Some(ReviewStatus::Overdue),
    )
    .await
    .unwrap();
  assert!(overdue.is_empty());
}

#[tokio::test]
async fn attention_list_is_overdue_first_then_by_date() {
  let (svc, _) = service().await; // today = 2024-06-10

  let mut overdue_old = new_document("POL-AML-001");
  overdue_old.next_review_date = Some(date(2024, 5, 1));
  let mut overdue_recent = new_document("POL-AML-002");
  overdue_recent.next_review_date = Some(date(2024, 5, 20));
  let mut due_soon = new_document("POL-GOV-001");
  due_soon.category = "GOV".to_owned();
  due_soon.next_review_date = Some(date(2024, 7, 1));
  let mut on_track = new_document("POL-GOV-002");
  on_track.category = "GOV".to_owned();
  on_track.next_review_date = Some(date(2025, 6, 1));
  let mut archived = new_document("POL-GOV-003");
  archived.category = "GOV".to_owned();
  archived.status = DocumentStatus::Archived;
  archived.next_review_date = Some(date(2024, 1, 1));

  for input in [overdue_old, overdue_recent, due_soon, on_track, archived] {
    svc.create_document(&admin(), input).await.unwrap();
  }

  let attention = svc
    .documents_requiring_attention(&viewer(), 10)
    .await
    .unwrap();
  let refs: Vec<_> = attention.iter().map(|d| d.doc_ref.as_str()).collect();
  assert_eq!(refs, ["POL-AML-001", "POL-AML-002", "POL-GOV-001"]);

  let limited = svc
    .documents_requiring_attention(&viewer(), 2)
    .await
    .unwrap();
  assert_eq!(limited.len(), 2);
}

#[tokio::test]
async fn review_status_counts_cover_every_band() {
  let (svc, _) = service().await; // today = 2024-06-10

  let mut overdue = new_document("POL-AML-001");
  overdue.next_review_date = Some(date(2024, 5, 1));
  let mut on_track = new_document("POL-AML-002");
  on_track.next_review_date = Some(date(2025, 6, 1));
  let mut archived = new_document("POL-AML-003");
  archived.status = DocumentStatus::Archived;
  archived.next_review_date = Some(date(2024, 1, 1));

  for input in [overdue, on_track, archived] {
    svc.create_document(&admin(), input).await.unwrap();
  }

  let counts = svc.review_status_counts(&viewer()).await.unwrap();
  assert_eq!(counts.len(), 4);
  assert!(counts.contains(&(ReviewStatus::Overdue, 1)));
  assert!(counts.contains(&(ReviewStatus::DueSoon, 0)));
  assert!(counts.contains(&(ReviewStatus::Upcoming, 0)));
  assert!(counts.contains(&(ReviewStatus::OnTrack, 1)));
}

#[tokio::test]
async fn overdue_listing_covers_active_documents_only() {
  let (svc, _) = service().await; // today = 2024-06-10

  let mut overdue = new_document("POL-AML-001");
  overdue.next_review_date = Some(date(2024, 5, 1));
  let mut draft_overdue = new_document("POL-AML-002");
  draft_overdue.status = DocumentStatus::Draft;
  draft_overdue.next_review_date = Some(date(2024, 5, 1));

  for input in [overdue, draft_overdue] {
    svc.create_document(&admin(), input).await.unwrap();
  }

  let overdue = svc.overdue_documents(&viewer()).await.unwrap();
  assert_eq!(overdue.len(), 1);
  assert_eq!(overdue[0].doc_ref, "POL-AML-001");
}

#[tokio::test]
async fn thresholds_come_from_settings() {
  let (svc, store) = service().await; // today = 2024-06-10
  store.set_setting(WARNING_DAYS_KEY, "10").await.unwrap();

  // 20 days out: due-soon under the default 30, upcoming under 10.
  let mut input = new_document("POL-AML-001");
  input.next_review_date = Some(date(2024, 6, 30));
  svc.create_document(&admin(), input).await.unwrap();

  let due_soon = svc
    .list_documents(
      &viewer(),
      &DocumentFilter::default(),
      Some(ReviewStatus::DueSoon),
    )
    .await
    .unwrap();
  assert!(due_soon.is_empty());

  let upcoming = svc
    .list_documents(
      &viewer(),
      &DocumentFilter::default(),
      Some(ReviewStatus::Upcoming),
    )
    .await
    .unwrap();
  assert_eq!(upcoming.len(), 1);
}

// ─── Collaborator audit hooks ────────────────────────────────────────────────

#[tokio::test]
async fn attachment_and_link_events_reach_the_ledger() {
  let (svc, _) = service().await;
  let doc = svc
    .create_document(&admin(), new_document("POL-AML-001"))
    .await
    .unwrap();

  svc
    .log_attachment_added(&editor(), doc.doc_id, "policy-v1.pdf")
    .await
    .unwrap();
  svc
    .log_link_added(&editor(), doc.doc_id, "IMPLEMENTS", "PROC-AML-001")
    .await
    .unwrap();
  svc
    .log_attachment_removed(&editor(), doc.doc_id, "policy-v1.pdf")
    .await
    .unwrap();

  let history = svc.history_for(&admin(), doc.doc_id, 50).await.unwrap();
  assert_eq!(history.len(), 4);
  assert_eq!(history[0].action, HistoryAction::AttachmentRemoved);
  assert_eq!(history[0].old_value.as_deref(), Some("policy-v1.pdf"));
  assert_eq!(history[1].action, HistoryAction::LinkAdded);
  assert_eq!(
    history[1].new_value.as_deref(),
    Some("IMPLEMENTS: PROC-AML-001")
  );

  let err = svc
    .log_attachment_added(&viewer(), doc.doc_id, "sneaky.pdf")
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Forbidden { .. }));
}

#[tokio::test]
async fn recent_activity_spans_documents() {
  let (svc, _) = service().await;
  let a = svc
    .create_document(&admin(), new_document("POL-AML-001"))
    .await
    .unwrap();
  let b = svc
    .create_document(&admin(), new_document("POL-GOV-001"))
    .await
    .unwrap();
  svc
    .mark_as_reviewed(&editor(), a.doc_id, None, None)
    .await
    .unwrap();

  let recent = svc.recent_activity(&viewer(), 10).await.unwrap();
  assert_eq!(recent.len(), 3);
  assert_eq!(recent[0].action, HistoryAction::Reviewed);
  assert!(recent.iter().any(|e| e.doc_id == b.doc_id));
}
