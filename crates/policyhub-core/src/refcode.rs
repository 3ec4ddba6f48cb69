//! Reference code allocation and validation.
//!
//! Reference codes have the shape `PREFIX-CATEGORY-NNN`, e.g.
//! `POL-AML-001`. Allocation only *suggests* the next free number — it
//! reserves nothing. Two concurrent callers can receive the same
//! suggestion; the loser of the race is caught by the uniqueness check
//! at creation time and surfaces as a conflict.

use crate::{
  document::DocumentType,
  error::{Error, Result},
};

/// Shared search key for a `(type, category)` pair: `"POL-AML-"`.
pub fn search_prefix(doc_type: DocumentType, category: &str) -> String {
  format!("{}-{}-", doc_type.ref_prefix(), category.trim().to_uppercase())
}

/// Compute the next sequential reference code given every existing code
/// that starts with the pair's search prefix.
///
/// Codes whose tail is not purely numeric are ignored, not errors. The
/// number is zero-padded to at least three digits and grows naturally
/// past 999.
pub fn next_ref(
  doc_type: DocumentType,
  category: &str,
  existing: &[String],
) -> String {
  let prefix = search_prefix(doc_type, category);
  let max = existing
    .iter()
    .filter_map(|r| numeric_suffix(r, &prefix))
    .max()
    .unwrap_or(0);
  format!("{prefix}{:03}", max + 1)
}

fn numeric_suffix(doc_ref: &str, prefix: &str) -> Option<u32> {
  let tail = doc_ref.strip_prefix(prefix)?;
  if tail.is_empty() || !tail.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  tail.parse().ok()
}

/// Fold a reference to its canonical stored form.
pub fn normalize_ref(doc_ref: &str) -> String {
  doc_ref.trim().to_uppercase()
}

/// Validate an already-normalised reference code.
pub fn validate_ref(doc_ref: &str) -> Result<()> {
  let invalid = |reason| Error::InvalidRef {
    reference: doc_ref.to_owned(),
    reason,
  };

  if doc_ref.len() < 5 {
    return Err(invalid("too short"));
  }
  if doc_ref.len() > 30 {
    return Err(invalid("too long"));
  }

  let mut parts = doc_ref.split('-');
  match (parts.next(), parts.next(), parts.next(), parts.next()) {
    (Some(prefix), Some(category), Some(number), None)
      if !prefix.is_empty()
        && prefix.bytes().all(|b| b.is_ascii_alphanumeric())
        && !category.is_empty()
        && category.bytes().all(|b| b.is_ascii_alphanumeric())
        && !number.is_empty()
        && number.bytes().all(|b| b.is_ascii_digit()) =>
    {
      Ok(())
    }
    _ => Err(invalid("expected PREFIX-CATEGORY-NUMBER, e.g. POL-AML-001")),
  }
}
