//! # Report Helpers
//!
//! Date windows and shaping for the report aggregator. The sums and counts
//! themselves are single SQL aggregates in `kasir-db`; this module decides
//! which window they cover and fills in what SQL leaves out (days without
//! sales, payment methods nobody used).
//!
//! All windows are half-open `[start, end)` in UTC, so "2026-10-16" means
//! `2026-10-16T00:00:00Z <= created_at < 2026-10-17T00:00:00Z`.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{DailyRevenue, PaymentMethod, PaymentShare};

/// Longest trailing window the daily revenue report accepts.
pub const MAX_REPORT_DAYS: u32 = 366;

/// A half-open UTC time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

fn midnight(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

/// The window covering one whole day.
pub fn day_window(day: NaiveDate) -> Window {
    let start = midnight(day);
    Window {
        start,
        end: start + Duration::days(1),
    }
}

/// The window covering `start..=end`, both days included.
pub fn range_window(start: NaiveDate, end: NaiveDate) -> CoreResult<Window> {
    if end < start {
        return Err(ValidationError::invalid_format("end_date", "must not be before start_date").into());
    }

    Ok(Window {
        start: midnight(start),
        end: midnight(end) + Duration::days(1),
    })
}

/// The calendar month containing `day`, with its `YYYY-MM` label.
pub fn month_window(day: NaiveDate) -> CoreResult<(Window, String)> {
    let first = day - Duration::days(day.day0() as i64);
    let (year, month) = if day.month() == 12 {
        (day.year() + 1, 1)
    } else {
        (day.year(), day.month() + 1)
    };
    let next = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| ValidationError::OutOfRange {
        field: "date".to_string(),
        min: 1,
        max: 9999,
    })?;

    let window = Window {
        start: midnight(first),
        end: midnight(next),
    };
    Ok((window, first.format("%Y-%m").to_string()))
}

/// The last `days` calendar days ending with `today`, oldest first.
pub fn trailing_days(today: NaiveDate, days: u32) -> CoreResult<Vec<NaiveDate>> {
    if days == 0 || days > MAX_REPORT_DAYS {
        return Err(ValidationError::OutOfRange {
            field: "days".to_string(),
            min: 1,
            max: MAX_REPORT_DAYS as i64,
        }
        .into());
    }

    Ok((0..days as i64)
        .rev()
        .map(|back| today - Duration::days(back))
        .collect())
}

/// Lays per-day aggregates over `days`, zero-filling days with no rows.
///
/// `rows` are `(day, completed revenue, transaction count)`; rows outside
/// `days` are ignored.
pub fn fill_daily(days: &[NaiveDate], rows: &[(NaiveDate, Money, i64)]) -> Vec<DailyRevenue> {
    days.iter()
        .map(|day| {
            let (revenue, transactions) = rows
                .iter()
                .find(|(d, _, _)| d == day)
                .map(|(_, revenue, count)| (*revenue, *count))
                .unwrap_or((Money::zero(), 0));
            DailyRevenue {
                date: *day,
                revenue,
                transactions,
            }
        })
        .collect()
}

/// `count / total × 100`, defined as 0 when `total` is 0.
pub fn percentage(count: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    count as f64 / total as f64 * 100.0
}

/// One share per payment method, in `PaymentMethod::ALL` order, including
/// methods with no transactions.
pub fn payment_shares(counts: &[(PaymentMethod, i64)]) -> Vec<PaymentShare> {
    let total: i64 = counts.iter().map(|(_, c)| c).sum();

    PaymentMethod::ALL
        .into_iter()
        .map(|method| {
            let count = counts
                .iter()
                .filter(|(m, _)| *m == method)
                .map(|(_, c)| c)
                .sum();
            PaymentShare {
                payment_method: method,
                count,
                percentage: percentage(count, total),
            }
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_day_window_is_half_open() {
        let w = day_window(date(2026, 10, 16));
        assert_eq!(w.start.to_rfc3339(), "2026-10-16T00:00:00+00:00");
        assert_eq!(w.end.to_rfc3339(), "2026-10-17T00:00:00+00:00");
    }

    #[test]
    fn test_range_window_includes_end_day() {
        let w = range_window(date(2026, 10, 1), date(2026, 10, 16)).unwrap();
        assert_eq!(w.start, day_window(date(2026, 10, 1)).start);
        assert_eq!(w.end, day_window(date(2026, 10, 16)).end);

        assert!(range_window(date(2026, 10, 16), date(2026, 10, 1)).is_err());
        assert!(range_window(date(2026, 10, 16), date(2026, 10, 16)).is_ok());
    }

    #[test]
    fn test_month_window() {
        let (w, label) = month_window(date(2026, 12, 31)).unwrap();
        assert_eq!(label, "2026-12");
        assert_eq!(w.start, day_window(date(2026, 12, 1)).start);
        assert_eq!(w.end, day_window(date(2027, 1, 1)).start);

        let (w, label) = month_window(date(2028, 2, 10)).unwrap();
        assert_eq!(label, "2028-02");
        assert_eq!(w.end, day_window(date(2028, 3, 1)).start);
    }

    #[test]
    fn test_trailing_days() {
        let days = trailing_days(date(2026, 3, 2), 3).unwrap();
        assert_eq!(days, vec![date(2026, 2, 28), date(2026, 3, 1), date(2026, 3, 2)]);

        assert!(trailing_days(date(2026, 3, 2), 0).is_err());
        assert!(trailing_days(date(2026, 3, 2), MAX_REPORT_DAYS + 1).is_err());
    }

    #[test]
    fn test_fill_daily_zero_fills() {
        let days = trailing_days(date(2026, 10, 16), 3).unwrap();
        let rows = vec![(date(2026, 10, 15), Money::from_minor(11_100), 2)];

        let filled = fill_daily(&days, &rows);
        assert_eq!(filled.len(), 3);
        assert_eq!(filled[0].transactions, 0);
        assert!(filled[0].revenue.is_zero());
        assert_eq!(filled[1].revenue.minor(), 11_100);
        assert_eq!(filled[1].transactions, 2);
        assert_eq!(filled[2].date, date(2026, 10, 16));
    }

    #[test]
    fn test_percentage_zero_total() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(1, 4), 25.0);
    }

    #[test]
    fn test_payment_shares() {
        let shares = payment_shares(&[(PaymentMethod::Cash, 3), (PaymentMethod::Qris, 1)]);

        assert_eq!(shares.len(), 3);
        assert_eq!(shares[0].payment_method, PaymentMethod::Cash);
        assert_eq!(shares[0].percentage, 75.0);
        assert_eq!(shares[1].payment_method, PaymentMethod::Card);
        assert_eq!(shares[1].count, 0);
        assert_eq!(shares[1].percentage, 0.0);
        assert_eq!(shares[2].percentage, 25.0);

        let empty = payment_shares(&[]);
        assert!(empty.iter().all(|s| s.count == 0 && s.percentage == 0.0));
    }
}
