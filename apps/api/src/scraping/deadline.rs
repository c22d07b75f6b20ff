//! Closing-date detection in free listing text.

use std::sync::OnceLock;

use chrono::{Datelike, Duration, NaiveDate};
use regex::Regex;

/// Listings that never state a closing date are assumed to stay open this long.
pub const DEFAULT_OPEN_DAYS: i64 = 30;

const KEYWORDS: &str =
    r"(?:closing(?:\s+date)?|closes|apply\s+(?:by|before)|deadline|applications?\s+close(?:\s+on)?)";
const MONTH: &str = r"\b(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\b\.?";

struct Patterns {
    numeric: Regex,
    day_month: Regex,
    month_day: Regex,
    relative: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        numeric: Regex::new(&format!(
            r"(?i){KEYWORDS}[^\d\n]{{0,30}}(\d{{1,2}})[/.-](\d{{1,2}})[/.-](\d{{2,4}})"
        ))
        .expect("valid regex"),
        day_month: Regex::new(&format!(
            r"(?i){KEYWORDS}[^\d\n]{{0,30}}(\d{{1,2}})(?:st|nd|rd|th)?\s+(?:of\s+)?{MONTH}(?:,?\s+(\d{{4}}))?"
        ))
        .expect("valid regex"),
        month_day: Regex::new(&format!(
            r"(?i){KEYWORDS}[^\d\n]{{0,30}}?{MONTH}\s+(\d{{1,2}})(?:st|nd|rd|th)?\b(?:,?\s+(\d{{4}}))?"
        ))
        .expect("valid regex"),
        relative: Regex::new(r"(?i)applications?\s+close\s+in\s+(\d{1,3})\s+(day|week)s?")
            .expect("valid regex"),
    })
}

/// Closing date mentioned in `text`, or `today + 30 days` when none is found.
pub fn extract_deadline(text: &str, today: NaiveDate) -> NaiveDate {
    find_deadline(text, today).unwrap_or_else(|| today + Duration::days(DEFAULT_OPEN_DAYS))
}

pub fn find_deadline(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let p = patterns();

    if let Some(caps) = p.numeric.captures(text) {
        let a: u32 = caps[1].parse().ok()?;
        let b: u32 = caps[2].parse().ok()?;
        let year = full_year(caps[3].parse().ok()?);
        // Day-first, then month-first.
        if let Some(date) =
            NaiveDate::from_ymd_opt(year, b, a).or_else(|| NaiveDate::from_ymd_opt(year, a, b))
        {
            return Some(date);
        }
    }

    if let Some(caps) = p.day_month.captures(text) {
        let day: u32 = caps[1].parse().ok()?;
        let month = month_number(&caps[2])?;
        let year = caps
            .get(3)
            .and_then(|y| y.as_str().parse().ok())
            .unwrap_or_else(|| today.year());
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }

    if let Some(caps) = p.month_day.captures(text) {
        let month = month_number(&caps[1])?;
        let day: u32 = caps[2].parse().ok()?;
        let year = caps
            .get(3)
            .and_then(|y| y.as_str().parse().ok())
            .unwrap_or_else(|| today.year());
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }

    if let Some(caps) = p.relative.captures(text) {
        let amount: i64 = caps[1].parse().ok()?;
        let days = if caps[2].eq_ignore_ascii_case("week") {
            amount * 7
        } else {
            amount
        };
        return Some(today + Duration::days(days));
    }

    None
}

fn full_year(year: i32) -> i32 {
    if year < 100 {
        2000 + year
    } else {
        year
    }
}

fn month_number(name: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let prefix = name.get(..3)?.to_lowercase();
    MONTHS
        .iter()
        .position(|m| *m == prefix)
        .map(|i| i as u32 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 10).unwrap()
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_numeric_dates_are_day_first() {
        assert_eq!(
            extract_deadline("Closing date: 05/03/2025", today()),
            ymd(2025, 3, 5)
        );
        assert_eq!(extract_deadline("Apply by 07-04-25.", today()), ymd(2025, 4, 7));
    }

    #[test]
    fn test_numeric_dates_fall_back_to_month_first() {
        assert_eq!(extract_deadline("Deadline 03/25/2025", today()), ymd(2025, 3, 25));
    }

    #[test]
    fn test_ordinal_month_names() {
        assert_eq!(
            extract_deadline("Applications close on 12th March 2025", today()),
            ymd(2025, 3, 12)
        );
        assert_eq!(extract_deadline("Closing: 1 Apr", today()), ymd(2025, 4, 1));
    }

    #[test]
    fn test_month_before_day() {
        assert_eq!(
            extract_deadline("Apply before March 14, 2026 to be considered", today()),
            ymd(2026, 3, 14)
        );
    }

    #[test]
    fn test_month_and_year_without_day_is_not_a_date() {
        assert_eq!(find_deadline("Apply by March 2026", today()), None);
        assert_eq!(
            find_deadline("Apply by Sept. 3rd", today()),
            Some(ymd(2025, 9, 3))
        );
    }

    #[test]
    fn test_words_that_start_like_months_are_ignored() {
        assert_eq!(find_deadline("Closing: 3 decades of history", today()), None);
        assert_eq!(find_deadline("Deadline: 4 marches to plan", today()), None);
        assert_eq!(
            find_deadline("Deadline: 4 December", today()),
            Some(ymd(2025, 12, 4))
        );
    }

    #[test]
    fn test_relative_close_in_weeks() {
        assert_eq!(
            extract_deadline("Applications close in 2 weeks", today()),
            ymd(2025, 2, 24)
        );
        assert_eq!(
            extract_deadline("applications close in 5 days", today()),
            ymd(2025, 2, 15)
        );
    }

    #[test]
    fn test_no_mention_defaults_to_thirty_days() {
        assert_eq!(
            extract_deadline("Great team, free snacks. Call 0400 123 456.", today()),
            ymd(2025, 3, 12)
        );
        assert_eq!(find_deadline("", today()), None);
    }

    #[test]
    fn test_impossible_dates_are_ignored() {
        assert_eq!(find_deadline("Closing date: 45/45/2025", today()), None);
    }
}
