use time::{format_description::well_known::Rfc3339, OffsetDateTime, PrimitiveDateTime, UtcOffset};

pub(crate) fn primitive_now_utc() -> PrimitiveDateTime {
    to_primitive_utc(OffsetDateTime::now_utc())
}

pub(crate) fn to_primitive_utc(value: OffsetDateTime) -> PrimitiveDateTime {
    let utc = value.to_offset(UtcOffset::UTC);
    PrimitiveDateTime::new(utc.date(), utc.time())
}

pub(crate) fn format_primitive(value: PrimitiveDateTime) -> String {
    value.assume_utc().format(&Rfc3339).unwrap_or_else(|_| value.assume_utc().to_string())
}

/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates (midnight UTC),
/// the two shapes due dates arrive in from the upload forms.
pub(crate) fn parse_due_date(raw: &str) -> Option<PrimitiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(to_primitive_utc(value));
    }

    let format = time::macros::format_description!("[year]-[month]-[day]");
    time::Date::parse(raw, &format).ok().map(|date| date.midnight())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Date, Time};

    #[test]
    fn format_primitive_outputs_utc_z() {
        let date = Date::from_calendar_date(2025, time::Month::January, 2).unwrap();
        let time = Time::from_hms(10, 20, 30).unwrap();
        let value = PrimitiveDateTime::new(date, time);
        assert_eq!(format_primitive(value), "2025-01-02T10:20:30Z");
    }

    #[test]
    fn parse_due_date_accepts_rfc3339_with_offset() {
        let parsed = parse_due_date("2025-03-01T12:00:00+02:00").expect("due date");
        assert_eq!(format_primitive(parsed), "2025-03-01T10:00:00Z");
    }

    #[test]
    fn parse_due_date_accepts_plain_date() {
        let parsed = parse_due_date("2025-03-01").expect("due date");
        assert_eq!(format_primitive(parsed), "2025-03-01T00:00:00Z");
    }

    #[test]
    fn parse_due_date_rejects_garbage() {
        assert!(parse_due_date("next tuesday").is_none());
        assert!(parse_due_date("  ").is_none());
    }
}
