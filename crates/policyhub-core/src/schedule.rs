//! Review scheduling — pure date arithmetic, no wall-clock access.
//!
//! Both functions here are standalone on purpose: dashboard aggregates
//! classify whole result sets without going back through the lifecycle
//! service.

use std::fmt;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::document::ReviewFrequency;

/// Settings key for the "due soon" threshold, in days.
pub const WARNING_DAYS_KEY: &str = "warning_threshold_days";
/// Settings key for the "upcoming" threshold, in days.
pub const UPCOMING_DAYS_KEY: &str = "upcoming_threshold_days";

// ─── Review status ───────────────────────────────────────────────────────────

/// Urgency classification derived from the next review date. Computed
/// on read, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
  Overdue,
  DueSoon,
  Upcoming,
  OnTrack,
}

impl ReviewStatus {
  pub const ALL: [ReviewStatus; 4] = [
    ReviewStatus::Overdue,
    ReviewStatus::DueSoon,
    ReviewStatus::Upcoming,
    ReviewStatus::OnTrack,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Overdue => "OVERDUE",
      Self::DueSoon => "DUE_SOON",
      Self::Upcoming => "UPCOMING",
      Self::OnTrack => "ON_TRACK",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "OVERDUE" => Some(Self::Overdue),
      "DUE_SOON" => Some(Self::DueSoon),
      "UPCOMING" => Some(Self::Upcoming),
      "ON_TRACK" => Some(Self::OnTrack),
      _ => None,
    }
  }

  pub fn display_name(self) -> &'static str {
    match self {
      Self::Overdue => "Overdue",
      Self::DueSoon => "Due Soon",
      Self::Upcoming => "Upcoming",
      Self::OnTrack => "On Track",
    }
  }
}

impl fmt::Display for ReviewStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.pad(self.as_str())
  }
}

// ─── Thresholds ──────────────────────────────────────────────────────────────

/// Day thresholds for the DUE_SOON / UPCOMING bands. Deployments can
/// override the defaults through the settings table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewThresholds {
  pub warning_days:  i64,
  pub upcoming_days: i64,
}

impl Default for ReviewThresholds {
  fn default() -> Self {
    Self {
      warning_days:  30,
      upcoming_days: 90,
    }
  }
}

// ─── Scheduling ──────────────────────────────────────────────────────────────

/// Next review date for a document last reviewed on `last_review_date`.
///
/// Returns `None` for ad-hoc frequencies: no automatic value exists and
/// the caller must supply a date manually.
pub fn next_review(
  last_review_date: NaiveDate,
  frequency: ReviewFrequency,
) -> Option<NaiveDate> {
  let days = frequency.interval_days()?;
  last_review_date.checked_add_days(Days::new(days as u64))
}

/// Classify urgency by days remaining until `next_review_date`.
///
/// A missing date classifies as ON_TRACK.
pub fn review_status(
  next_review_date: Option<NaiveDate>,
  today: NaiveDate,
  thresholds: ReviewThresholds,
) -> ReviewStatus {
  let Some(next) = next_review_date else {
    return ReviewStatus::OnTrack;
  };

  let days_until = (next - today).num_days();
  if days_until < 0 {
    ReviewStatus::Overdue
  } else if days_until <= thresholds.warning_days {
    ReviewStatus::DueSoon
  } else if days_until <= thresholds.upcoming_days {
    ReviewStatus::Upcoming
  } else {
    ReviewStatus::OnTrack
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  #[test]
  fn annual_interval_is_365_days() {
    assert_eq!(
      next_review(date(2024, 3, 1), ReviewFrequency::Annual),
      Some(date(2025, 3, 1)),
    );
    // Across a leap day the anniversary shifts back by one.
    assert_eq!(
      next_review(date(2024, 1, 1), ReviewFrequency::Annual),
      Some(date(2024, 12, 31)),
    );
  }

  #[test]
  fn semi_annual_and_quarterly_intervals() {
    assert_eq!(
      next_review(date(2024, 3, 1), ReviewFrequency::SemiAnnual),
      Some(date(2024, 8, 30)),
    );
    assert_eq!(
      next_review(date(2024, 3, 1), ReviewFrequency::Quarterly),
      Some(date(2024, 5, 31)),
    );
  }

  #[test]
  fn ad_hoc_has_no_automatic_date() {
    assert_eq!(next_review(date(2024, 3, 1), ReviewFrequency::AdHoc), None);
  }

  #[test]
  fn status_bands() {
    let today = date(2024, 6, 1);
    let t = ReviewThresholds::default();

    let status = |next| review_status(Some(next), today, t);

    assert_eq!(status(date(2024, 5, 31)), ReviewStatus::Overdue);
    assert_eq!(status(today), ReviewStatus::DueSoon);
    assert_eq!(status(date(2024, 7, 1)), ReviewStatus::DueSoon); // +30
    assert_eq!(status(date(2024, 7, 2)), ReviewStatus::Upcoming); // +31
    assert_eq!(status(date(2024, 8, 30)), ReviewStatus::Upcoming); // +90
    assert_eq!(status(date(2024, 8, 31)), ReviewStatus::OnTrack); // +91
  }

  #[test]
  fn missing_date_is_on_track() {
    assert_eq!(
      review_status(None, date(2024, 6, 1), ReviewThresholds::default()),
      ReviewStatus::OnTrack,
    );
  }

  #[test]
  fn custom_thresholds_shift_the_bands() {
    let today = date(2024, 6, 1);
    let t = ReviewThresholds {
      warning_days:  7,
      upcoming_days: 14,
    };
    assert_eq!(review_status(Some(date(2024, 6, 8)), today, t), ReviewStatus::DueSoon);
    assert_eq!(review_status(Some(date(2024, 6, 9)), today, t), ReviewStatus::Upcoming);
    assert_eq!(review_status(Some(date(2024, 6, 16)), today, t), ReviewStatus::OnTrack);
  }
}
