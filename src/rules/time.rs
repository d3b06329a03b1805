//! 时间格式归一化
//!
//! 证明图片里的时间五花八门（"09:05"、"2025-10-21 09:05:33"、"10/21 9:05"……），
//! 规则比较统一在 `HH:mm` 精度上进行。

use std::sync::OnceLock;

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use regex::Regex;

use crate::rules::policy::UNKNOWN;

/// 完整日期时间格式
const DATETIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

/// 不带年份的格式，解析时补一个占位年份
const MONTH_DAY_LAYOUTS: &[&str] = &["%Y-%m-%d %H:%M", "%Y/%m/%d %H:%M"];

fn clock_regex() -> Option<&'static Regex> {
    static CLOCK: OnceLock<Option<Regex>> = OnceLock::new();
    CLOCK
        .get_or_init(|| Regex::new(r"(\d{1,2}):(\d{2})").ok())
        .as_ref()
}

/// 把各种时间写法解析为分钟精度的时刻
///
/// 依次尝试 `HH:mm`、带日期的格式、不带年份的 `MM-dd HH:mm`，
/// 都失败时用正则提取第一个 `H:MM`。空字符串与 "未知" 返回 None。
pub fn parse_clock(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    if raw.is_empty() || raw == UNKNOWN {
        return None;
    }

    if let Ok(t) = NaiveTime::parse_from_str(raw, "%H:%M") {
        return Some(t);
    }

    for layout in DATETIME_LAYOUTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, layout) {
            return truncate_to_minute(dt.time());
        }
    }

    let with_year = format!("2000-{}", raw);
    let with_year_slash = format!("2000/{}", raw);
    for (candidate, layout) in [&with_year, &with_year_slash]
        .into_iter()
        .zip(MONTH_DAY_LAYOUTS)
    {
        if let Ok(dt) = NaiveDateTime::parse_from_str(candidate, layout) {
            return truncate_to_minute(dt.time());
        }
    }

    let caps = clock_regex()?.captures(raw)?;
    let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute: u32 = caps.get(2)?.as_str().parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

pub fn format_clock(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

fn truncate_to_minute(time: NaiveTime) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_plain_clock() {
        assert_eq!(parse_clock("09:05"), Some(hm(9, 5)));
        assert_eq!(parse_clock(" 18:32 "), Some(hm(18, 32)));
    }

    #[test]
    fn test_datetime_layouts() {
        assert_eq!(parse_clock("2025-10-21 09:05:33"), Some(hm(9, 5)));
        assert_eq!(parse_clock("2025/10/21 19:13"), Some(hm(19, 13)));
        assert_eq!(parse_clock("10-21 08:57"), Some(hm(8, 57)));
        assert_eq!(parse_clock("10/21 08:57"), Some(hm(8, 57)));
    }

    #[test]
    fn test_regex_fallback() {
        let normalized = |raw: &str| parse_clock(raw).map(format_clock);
        assert_eq!(normalized("上午 9:05 发送").as_deref(), Some("09:05"));
        assert_eq!(normalized("08:55:12").as_deref(), Some("08:55"));
        assert_eq!(normalized("昨天 23:59").as_deref(), Some("23:59"));
    }

    #[test]
    fn test_unparseable() {
        assert_eq!(parse_clock(""), None);
        assert_eq!(parse_clock("未知"), None);
        assert_eq!(parse_clock("上午九点"), None);
        assert_eq!(parse_clock("25:61"), None);
    }
}
