use chrono::{DateTime, Datelike, Utc};

/// How far back a run re-fetches, chosen from the age of the last successful run.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SyncPlan {
    /// From the configured start year.
    Full,
    /// Previous and current calendar year.
    TwoYears,
    CurrentYear,
}

impl SyncPlan {
    pub fn choose(last_run: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        let Some(last_run) = last_run else {
            return SyncPlan::Full;
        };
        if last_run > now {
            return SyncPlan::Full;
        }
        match month_index(&now) - month_index(&last_run) {
            0 => SyncPlan::CurrentYear,
            1 => SyncPlan::TwoYears,
            _ => SyncPlan::Full,
        }
    }

    /// Never earlier than `configured_start_year`.
    pub fn start_year(self, now: DateTime<Utc>, configured_start_year: i32) -> i32 {
        let year = match self {
            SyncPlan::Full => configured_start_year,
            SyncPlan::TwoYears => now.year() - 1,
            SyncPlan::CurrentYear => now.year(),
        };
        year.max(configured_start_year)
    }
}

fn month_index(date: &DateTime<Utc>) -> i64 {
    date.year() as i64 * 12 + date.month0() as i64
}
