//! 游标格式 - 服务端时间戳的线上表示
//!
//! 游标对客户端不透明，实际为服务端分配的 UTC 毫秒时间戳，线上以
//! RFC3339（毫秒精度）传输。解析失败按「无游标」处理，回退 bootstrap。

use chrono::{DateTime, SecondsFormat, Utc};

/// 毫秒时间戳 → 线上游标字符串
pub fn format_cursor(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}

/// 线上游标字符串 → 毫秒时间戳；不可解析返回 None（调用方回退 bootstrap）
pub fn parse_cursor(cursor: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(cursor)
        .ok()
        .map(|dt| dt.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_round_trips_at_millisecond_precision() {
        let ms = 1_750_000_000_123;
        let cursor = format_cursor(ms);
        assert_eq!(parse_cursor(&cursor), Some(ms));
    }

    #[test]
    fn garbage_cursor_parses_to_none() {
        assert_eq!(parse_cursor("not-a-timestamp"), None);
        assert_eq!(parse_cursor(""), None);
    }

    #[test]
    fn cursor_ordering_matches_timestamp_ordering() {
        // RFC3339（同一时区、毫秒精度）字符串序与时间序一致
        let a = format_cursor(1_000);
        let b = format_cursor(2_000);
        assert!(a < b);
    }
}
