//! Categories — the functional-area classification for documents.
//!
//! Category lifecycle (create, rename, deactivate) is owned by an
//! external collaborator; the core only requires that a code exist and
//! be active when a document references it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
  pub code:       String,
  pub name:       String,
  pub is_active:  bool,
  pub sort_order: i64,
}

/// Categories seeded into a fresh store: `(code, name, sort_order)`.
pub const DEFAULT_CATEGORIES: &[(&str, &str, i64)] = &[
  ("AML", "Anti-Money Laundering & CFT", 1),
  ("GOV", "Corporate Governance", 2),
  ("OPS", "Operations", 3),
  ("ACC", "Accounting & Valuation", 4),
  ("IT", "Information Technology & Security", 5),
  ("HR", "Human Resources", 6),
  ("DP", "Data Protection / GDPR", 7),
  ("BCP", "Business Continuity", 8),
  ("RISK", "Risk Management", 9),
  ("REG", "Regulatory & Compliance", 10),
  ("OTHER", "Other", 99),
];
