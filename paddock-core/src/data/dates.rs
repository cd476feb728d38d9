//! Calendar-date parsing for scraped date columns.
//!
//! Race dates arrive as ISO strings, slash-separated strings, compact
//! `YYYYMMDD` integers, Japanese `2020年3月1日` text (sometimes with
//! full-width digits), or Arrow timestamps rendered with a time component.
//! Everything is truncated to calendar-day granularity.

use chrono::NaiveDate;

/// Parse a raw cell into a calendar date, discarding any time-of-day part.
///
/// Returns `None` for empty or unrecognised input; callers count those rows
/// rather than dropping them silently.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let normalized = normalize_width(raw.trim());
    if normalized.is_empty() {
        return None;
    }

    let date_part = strip_time(&normalized);

    if date_part.len() == 8 && date_part.bytes().all(|b| b.is_ascii_digit()) {
        let year = date_part[0..4].parse().ok()?;
        let month = date_part[4..6].parse().ok()?;
        let day = date_part[6..8].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    let unified: String = strip_weekday(date_part)
        .trim_end_matches('日')
        .chars()
        .map(|c| match c {
            '年' | '月' | '/' | '.' => '-',
            other => other,
        })
        .collect();

    NaiveDate::parse_from_str(&unified, "%Y-%m-%d").ok()
}

/// Fold full-width digits and separators to their ASCII forms.
fn normalize_width(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
            '／' => '/',
            '－' | 'ー' => '-',
            '：' => ':',
            '　' => ' ',
            other => other,
        })
        .collect()
}

/// Drop a trailing parenthesised weekday such as `(土)` or `（日）`.
fn strip_weekday(value: &str) -> &str {
    let value = value.trim_end();
    let Some(head) = value
        .strip_suffix(')')
        .or_else(|| value.strip_suffix('）'))
    else {
        return value;
    };
    match head.rfind(['(', '（']) {
        Some(open) => value[..open].trim_end(),
        None => value,
    }
}

fn strip_time(value: &str) -> &str {
    let cut = value
        .find(|c: char| c == 'T' || c == ' ')
        .unwrap_or(value.len());
    &value[..cut]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_iso_and_slash() {
        assert_eq!(parse_calendar_date("2020-03-01"), Some(ymd(2020, 3, 1)));
        assert_eq!(parse_calendar_date("2020/3/1"), Some(ymd(2020, 3, 1)));
    }

    #[test]
    fn test_time_component_truncated() {
        assert_eq!(
            parse_calendar_date("2020-03-28T15:40:00"),
            Some(ymd(2020, 3, 28))
        );
        assert_eq!(
            parse_calendar_date("2020-03-28 09:00:00+09:00"),
            Some(ymd(2020, 3, 28))
        );
    }

    #[test]
    fn test_compact() {
        assert_eq!(parse_calendar_date("20240106"), Some(ymd(2024, 1, 6)));
        assert_eq!(parse_calendar_date("20241340"), None);
    }

    #[test]
    fn test_japanese_full_width() {
        assert_eq!(parse_calendar_date("2020年3月28日"), Some(ymd(2020, 3, 28)));
        assert_eq!(
            parse_calendar_date("２０２０年３月２８日"),
            Some(ymd(2020, 3, 28))
        );
    }

    #[test]
    fn test_weekday_suffix() {
        assert_eq!(
            parse_calendar_date("2020年3月28日(土)"),
            Some(ymd(2020, 3, 28))
        );
        assert_eq!(
            parse_calendar_date("２０２０年３月２９日（日）"),
            Some(ymd(2020, 3, 29))
        );
        assert_eq!(parse_calendar_date("2020/03/28(土)"), Some(ymd(2020, 3, 28)));
        assert_eq!(parse_calendar_date("2020年3月28日(土"), None);
    }

    #[test]
    fn test_garbage() {
        assert_eq!(parse_calendar_date(""), None);
        assert_eq!(parse_calendar_date("   "), None);
        assert_eq!(parse_calendar_date("not a date"), None);
        assert_eq!(parse_calendar_date("2020-02-30"), None);
    }
}
