//! Restaurant opening hours with cross-midnight support.
//!
//! Default schedule: 09:00 until 03:00 the next day, restaurant-local
//! time. Open iff `hour >= opening || hour < closing` when the window
//! wraps midnight.

use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

use crate::config::RestaurantConfig;

#[derive(Debug, Clone, Copy)]
pub struct OpeningHours {
    pub opening: u32,
    pub closing: u32,
    pub tz: Tz,
}

impl OpeningHours {
    pub fn from_config(cfg: &RestaurantConfig) -> Self {
        Self {
            opening: cfg.opening_hour,
            closing: cfg.closing_hour,
            tz: cfg.timezone.parse().unwrap_or(chrono_tz::Asia::Riyadh),
        }
    }

    /// Open-now predicate over a local hour.
    pub fn is_open_hour(&self, hour: u32) -> bool {
        if self.closing < self.opening {
            // Cross-midnight window, e.g. 09:00 → 03:00.
            hour >= self.opening || hour < self.closing
        } else {
            hour >= self.opening && hour < self.closing
        }
    }

    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.is_open_hour(now.with_timezone(&self.tz).hour())
    }

    pub fn is_open_now(&self) -> bool {
        self.is_open_at(Utc::now())
    }

    /// The next opening instant, restaurant-local.
    pub fn next_opening(&self, now: DateTime<Utc>) -> DateTime<Tz> {
        let local = now.with_timezone(&self.tz);
        let days_ahead = if local.hour() < self.opening { 0 } else { 1 };
        let date = local.date_naive() + Duration::days(days_ahead);
        let naive = date
            .and_hms_opt(self.opening, 0, 0)
            .unwrap_or_else(|| local.naive_local());
        self.tz
            .from_local_datetime(&naive)
            .single()
            .unwrap_or(local)
    }

    /// Tonight's (or tomorrow's) closing instant, restaurant-local.
    pub fn closing_time(&self, now: DateTime<Utc>) -> DateTime<Tz> {
        let local = now.with_timezone(&self.tz);
        let days_ahead = if self.closing < self.opening && local.hour() >= self.opening {
            1
        } else {
            0
        };
        let date = local.date_naive() + Duration::days(days_ahead);
        let naive = date
            .and_hms_opt(self.closing, 0, 0)
            .unwrap_or_else(|| local.naive_local());
        self.tz
            .from_local_datetime(&naive)
            .single()
            .unwrap_or(local)
    }

    /// Arabic status line: open-until or closed-until.
    pub fn status_message_ar(&self, now: DateTime<Utc>) -> String {
        if self.is_open_at(now) {
            format!("المطعم مفتوح حتى {}", format_time_ar(&self.closing_time(now)))
        } else {
            format!(
                "المطعم مغلق حالياً. يفتح الساعة {}",
                format_time_ar(&self.next_opening(now))
            )
        }
    }

    /// Polite closed message for the greeting gate.
    pub fn closed_message_ar(&self, now: DateTime<Utc>) -> String {
        format!(
            "هلا فيك! للأسف المطعم مغلق حالياً. نفتح الساعة {} — نستناك! 🌙",
            format_time_ar(&self.next_opening(now))
        )
    }
}

/// 12-hour Arabic time: "9 صباحاً", "11:30 مساءً".
pub fn format_time_ar<T: TimeZone>(dt: &DateTime<T>) -> String {
    let hour = dt.hour();
    let minute = dt.minute();
    let (display_hour, period) = match hour {
        0 => (12, "صباحاً"),
        1..=11 => (hour, "صباحاً"),
        12 => (12, "مساءً"),
        _ => (hour - 12, "مساءً"),
    };
    if minute == 0 {
        format!("{display_hour} {period}")
    } else {
        format!("{display_hour}:{minute:02} {period}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn hours() -> OpeningHours {
        OpeningHours {
            opening: 9,
            closing: 3,
            tz: chrono_tz::Asia::Riyadh,
        }
    }

    fn riyadh_utc(h: u32, m: u32) -> DateTime<Utc> {
        let naive = NaiveDate::from_ymd_opt(2025, 6, 15)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap();
        chrono_tz::Asia::Riyadh
            .from_local_datetime(&naive)
            .single()
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn boundary_hours() {
        let hrs = hours();
        assert!(hrs.is_open_at(riyadh_utc(2, 59)));
        assert!(!hrs.is_open_at(riyadh_utc(3, 0)));
        assert!(!hrs.is_open_at(riyadh_utc(8, 59)));
        assert!(hrs.is_open_at(riyadh_utc(9, 0)));
    }

    #[test]
    fn midnight_is_open() {
        assert!(hours().is_open_at(riyadh_utc(0, 30)));
    }

    #[test]
    fn same_day_window() {
        let hrs = OpeningHours {
            opening: 9,
            closing: 23,
            tz: chrono_tz::Asia::Riyadh,
        };
        assert!(hrs.is_open_hour(9));
        assert!(hrs.is_open_hour(22));
        assert!(!hrs.is_open_hour(23));
        assert!(!hrs.is_open_hour(2));
    }

    #[test]
    fn next_opening_same_day_before_opening() {
        let next = hours().next_opening(riyadh_utc(5, 0));
        assert_eq!(next.hour(), 9);
        assert_eq!(next.date_naive(), NaiveDate::from_ymd_opt(2025, 6, 15).unwrap());
    }

    #[test]
    fn next_opening_rolls_to_tomorrow_after_opening() {
        let next = hours().next_opening(riyadh_utc(23, 0));
        assert_eq!(next.date_naive(), NaiveDate::from_ymd_opt(2025, 6, 16).unwrap());
    }

    #[test]
    fn closed_message_names_nine_am() {
        let msg = hours().closed_message_ar(riyadh_utc(5, 0));
        assert!(msg.contains("9 صباحاً"), "{msg}");
    }

    #[test]
    fn closing_time_crosses_midnight() {
        let closing = hours().closing_time(riyadh_utc(22, 0));
        assert_eq!(closing.hour(), 3);
        assert_eq!(
            closing.date_naive(),
            NaiveDate::from_ymd_opt(2025, 6, 16).unwrap()
        );
    }

    #[test]
    fn time_formatting() {
        let dt = riyadh_utc(9, 0).with_timezone(&chrono_tz::Asia::Riyadh);
        assert_eq!(format_time_ar(&dt), "9 صباحاً");
        let dt = riyadh_utc(15, 30).with_timezone(&chrono_tz::Asia::Riyadh);
        assert_eq!(format_time_ar(&dt), "3:30 مساءً");
    }
}
