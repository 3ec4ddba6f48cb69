//! Injected time source.
//!
//! Business logic never reads the wall clock directly: everything that
//! needs "today" or "now" takes it from a [`Clock`], so scheduling and
//! review-status behaviour is testable against a pinned date.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

pub trait Clock: Send + Sync {
  /// Current instant, used for `created_at` / `updated_at` /
  /// `changed_at` stamps.
  fn now(&self) -> DateTime<Utc>;

  /// Current calendar date, used by review scheduling.
  fn today(&self) -> NaiveDate {
    self.now().date_naive()
  }
}

/// Wall-clock implementation used outside tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// A clock pinned to a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
  /// Pin the clock to midnight UTC on `date`.
  pub fn on(date: NaiveDate) -> Self {
    Self(date.and_time(NaiveTime::MIN).and_utc())
  }
}

impl Clock for FixedClock {
  fn now(&self) -> DateTime<Utc> {
    self.0
  }
}
