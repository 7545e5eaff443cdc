use chrono::NaiveDate;

/// Broker files use the Latin-American day-before-month convention.
pub const DAY_FIRST_FORMAT: &str = "%d/%m/%Y";

/// Parse a day-first date cell. `None` is the explicit empty/unparseable
/// sentinel; the caller decides whether that skips the row.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    parse_date_with(raw, DAY_FIRST_FORMAT)
}

pub fn parse_date_with(raw: &str, format: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, format).ok()
}

/// Parse a date cell that may hold an Excel serial number instead of text.
///
/// Spreadsheet exports frequently surface dates as serial days counted from
/// 1899-12-30.
pub fn parse_date_or_serial(raw: &str, format: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();

    if let Ok(serial) = trimmed.parse::<f64>() {
        if (1.0..100000.0).contains(&serial) {
            let days = serial.floor() as i64;
            let base_date = NaiveDate::from_ymd_opt(1899, 12, 30)?;
            return base_date.checked_add_signed(chrono::Duration::days(days));
        }
    }

    parse_date_with(trimmed, format)
}
