//! Dates embedded in directory names.
//!
//! Date-sharded trees (`logs/2023-11-02/`, `archive/2021/`, `reports/mar-2024/`)
//! can be skipped wholesale when a search has a date range: a directory whose
//! name parses as a date outside the range is never descended into.
//!
//! ## Recognised names
//! - `YYYY-MM-DD`, `YYYY_MM_DD`, `YYYY.MM.DD`, `YYYYMMDD` (one day)
//! - `YYYY-MM`, `YYYY_MM`, `YYYYMM`, `MM-YYYY` (one month)
//! - `YYYY` between 1970 and 2100 (one year)
//! - month name and year in either order: `jan-2024`, `2024_March`, `sept2023`

use chrono::{Datelike, NaiveDate};

const MIN_YEAR: i32 = 1970;
const MAX_YEAR: i32 = 2100;

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Calendar days covered by a directory name, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateSpan {
    pub first: NaiveDate,
    pub last: NaiveDate,
}

impl DateSpan {
    fn day(year: i32, month: u32, day: u32) -> Option<Self> {
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        Some(Self {
            first: date,
            last: date,
        })
    }

    fn month(year: i32, month: u32) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        Some(Self {
            first,
            last: next.pred_opt()?,
        })
    }

    fn year(year: i32) -> Option<Self> {
        Some(Self {
            first: NaiveDate::from_ymd_opt(year, 1, 1)?,
            last: NaiveDate::from_ymd_opt(year, 12, 31)?,
        })
    }
}

/// Parses a directory name into the span of days it denotes.
pub fn parse_dir_date(name: &str) -> Option<DateSpan> {
    let name = name.trim().to_ascii_lowercase();
    if name.is_empty() {
        return None;
    }

    if name.bytes().all(|b| b.is_ascii_digit()) {
        return parse_compact(&name);
    }

    let parts: Vec<&str> = name
        .split(['-', '_', '.', ' '])
        .filter(|p| !p.is_empty())
        .collect();

    match parts.as_slice() {
        [y, m, d] if is_digits(y, 4) && is_digits_upto(m, 2) && is_digits_upto(d, 2) => {
            DateSpan::day(year_of(y)?, m.parse().ok()?, d.parse().ok()?)
        }
        [y, m] if is_digits(y, 4) && is_digits_upto(m, 2) => {
            DateSpan::month(year_of(y)?, m.parse().ok()?)
        }
        [m, y] if is_digits_upto(m, 2) && is_digits(y, 4) => {
            DateSpan::month(year_of(y)?, m.parse().ok()?)
        }
        [a, b] => month_year(a, b).or_else(|| month_year(b, a)),
        [single] => split_alpha_digits(single),
        _ => None,
    }
}

fn parse_compact(digits: &str) -> Option<DateSpan> {
    match digits.len() {
        8 => DateSpan::day(
            year_of(&digits[..4])?,
            digits[4..6].parse().ok()?,
            digits[6..].parse().ok()?,
        ),
        6 => DateSpan::month(year_of(&digits[..4])?, digits[4..].parse().ok()?),
        4 => DateSpan::year(year_of(digits)?),
        _ => None,
    }
}

/// `jan2024` / `2024jan`
fn split_alpha_digits(token: &str) -> Option<DateSpan> {
    let split = token.find(|c: char| c.is_ascii_digit())?;
    if split == 0 {
        let alpha = token.find(|c: char| c.is_ascii_alphabetic())?;
        return month_year(&token[alpha..], &token[..alpha]);
    }
    month_year(&token[..split], &token[split..])
}

fn month_year(month: &str, year: &str) -> Option<DateSpan> {
    if !is_digits(year, 4) {
        return None;
    }
    DateSpan::month(year_of(year)?, month_number(month)?)
}

fn month_number(name: &str) -> Option<u32> {
    if name.len() < 3 || !name.bytes().all(|b| b.is_ascii_alphabetic()) {
        return None;
    }
    MONTHS
        .iter()
        .position(|full| full.starts_with(name))
        .map(|idx| idx as u32 + 1)
}

fn year_of(digits: &str) -> Option<i32> {
    let year: i32 = digits.parse().ok()?;
    (MIN_YEAR..=MAX_YEAR).contains(&year).then_some(year)
}

fn is_digits(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_digits_upto(s: &str, max: usize) -> bool {
    !s.is_empty() && s.len() <= max && s.bytes().all(|b| b.is_ascii_digit())
}

/// Short form of a span for log lines.
pub fn span_label(span: &DateSpan) -> String {
    if span.first == span.last {
        span.first.to_string()
    } else if span.first.month() == span.last.month() && span.first.year() == span.last.year() {
        span.first.format("%Y-%m").to_string()
    } else {
        span.first.format("%Y").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_full_dates() {
        for name in ["2024-03-15", "2024_03_15", "2024.03.15", "20240315"] {
            let span = parse_dir_date(name).unwrap();
            assert_eq!(span.first, d(2024, 3, 15), "{name}");
            assert_eq!(span.last, d(2024, 3, 15), "{name}");
        }
    }

    #[test]
    fn test_months() {
        let feb = parse_dir_date("2024-02").unwrap();
        assert_eq!(feb.first, d(2024, 2, 1));
        assert_eq!(feb.last, d(2024, 2, 29));

        let dec = parse_dir_date("12-2023").unwrap();
        assert_eq!(dec.last, d(2023, 12, 31));

        assert_eq!(parse_dir_date("202311").unwrap().first, d(2023, 11, 1));
    }

    #[test]
    fn test_month_names() {
        assert_eq!(parse_dir_date("jan-2024").unwrap().first, d(2024, 1, 1));
        assert_eq!(parse_dir_date("2024_March").unwrap().last, d(2024, 3, 31));
        assert_eq!(parse_dir_date("sept2023").unwrap().first, d(2023, 9, 1));
        assert_eq!(parse_dir_date("2023oct").unwrap().first, d(2023, 10, 1));
    }

    #[test]
    fn test_years() {
        let span = parse_dir_date("2021").unwrap();
        assert_eq!(span.first, d(2021, 1, 1));
        assert_eq!(span.last, d(2021, 12, 31));
        assert!(parse_dir_date("1234").is_none());
    }

    #[test]
    fn test_non_dates() {
        for name in ["src", "v2", "2024-13", "2024-02-30", "build-2", "ma-2024", "123456789", ""] {
            assert!(parse_dir_date(name).is_none(), "{name}");
        }
    }

    #[test]
    fn test_span_label() {
        assert_eq!(span_label(&parse_dir_date("2024-03-15").unwrap()), "2024-03-15");
        assert_eq!(span_label(&parse_dir_date("mar-2024").unwrap()), "2024-03");
        assert_eq!(span_label(&parse_dir_date("2024").unwrap()), "2024");
    }
}
