use chrono::{NaiveDate, NaiveDateTime};

/// Parses the quote source's timestamp strings.
///
/// Intraday entries arrive as `%Y-%m-%d %H:%M:%S`, daily entries as a bare
/// date (interpreted as midnight). Returns `None` for anything else.
pub fn parse_quote_time(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();

    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quote_time() {
        let intraday = parse_quote_time("2024-01-02 19:00:00").unwrap();
        assert_eq!(intraday.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-01-02 19:00:00");

        let daily = parse_quote_time("2024-01-02").unwrap();
        assert_eq!(daily.format("%H:%M:%S").to_string(), "00:00:00");

        assert!(parse_quote_time(" 2024-01-02 19:00:00 ").is_some());
        assert!(parse_quote_time("02/01/2024").is_none());
        assert!(parse_quote_time("not a time").is_none());
        assert!(parse_quote_time("").is_none());
    }
}
