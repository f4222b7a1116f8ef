//! Diesel queries, one module per table family.
//!
//! Functions here take a plain `&mut PgConnection` so they can run inside
//! `db::run` from a handler, from the seed binary, or inside a test
//! transaction.

pub mod patients;
pub mod queue;
pub mod referrals;
pub mod requests;
pub mod stats;
pub mod users;
pub mod visits;

use chrono::{NaiveDate, NaiveDateTime, Utc};

/// Current time as stored in `TIMESTAMP` columns (UTC, no zone).
pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// UTC midnight at the start of the current day.
pub fn start_of_today() -> NaiveDateTime {
    today().and_time(chrono::NaiveTime::MIN)
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// `%term%` for ILIKE, with LIKE wildcards in the term escaped.
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" alice "), "%alice%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn today_starts_at_midnight() {
        let start = start_of_today();
        assert_eq!(start.date(), today());
        assert_eq!(start.time(), chrono::NaiveTime::MIN);
        assert!(start <= now());
    }
}
