use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub msg: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            msg: msg.into(),
        }
    }
}

/// Collects every violation of a request before reporting them together.
#[derive(Debug, Default)]
pub struct Violations(Vec<FieldError>);

impl Violations {
    pub fn push(&mut self, field: &str, msg: impl Into<String>) {
        self.0.push(FieldError::new(field, msg));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result(self) -> Result<(), Vec<FieldError>> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self.0)
        }
    }

    /// Parses an optional integer within `[min, max]`, recording `msg` on failure.
    pub fn int_in_range(
        &mut self,
        field: &str,
        raw: Option<&str>,
        min: i64,
        max: i64,
        msg: &str,
    ) -> Option<i64> {
        let raw = raw?.trim();
        match raw.parse::<i64>() {
            Ok(v) if (min..=max).contains(&v) => Some(v),
            _ => {
                self.push(field, msg);
                None
            }
        }
    }

    pub fn positive_id(&mut self, field: &str, raw: Option<&str>) -> Option<i32> {
        let msg = format!("{} debe ser un entero positivo.", field);
        self.int_in_range(field, raw, 1, i32::MAX as i64, &msg)
            .map(|v| v as i32)
    }

    pub fn iso8601(&mut self, field: &str, raw: Option<&str>) -> Option<DateTime<Utc>> {
        let raw = raw?.trim();
        match parse_iso8601(raw) {
            Some(v) => Some(v),
            None => {
                self.push(
                    field,
                    format!(
                        "{} debe ser una fecha válida en formato ISO 8601.",
                        field
                    ),
                );
                None
            }
        }
    }
}

/// Accepts RFC 3339 timestamps, naive date-times (read as UTC) and plain
/// `YYYY-MM-DD` dates (UTC midnight).
pub fn parse_iso8601(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Path ids must be positive integers.
pub fn parse_file_id(raw: &str) -> Result<i32, Vec<FieldError>> {
    let mut v = Violations::default();
    let id = v.int_in_range(
        "fileId",
        Some(raw),
        1,
        i32::MAX as i64,
        "El fileId debe ser un entero positivo.",
    );
    v.into_result()?;
    id.map(|id| id as i32).ok_or_else(Vec::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_supported_date_shapes() {
        let midnight = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        assert_eq!(parse_iso8601("2024-03-05"), Some(midnight));
        assert_eq!(
            parse_iso8601("2024-03-05T10:30:00Z"),
            Some(Utc.with_ymd_and_hms(2024, 3, 5, 10, 30, 0).unwrap())
        );
        assert_eq!(
            parse_iso8601("2024-03-05T10:30:00-03:00"),
            Some(Utc.with_ymd_and_hms(2024, 3, 5, 13, 30, 0).unwrap())
        );
        assert_eq!(
            parse_iso8601("2024-03-05T10:30:00"),
            Some(Utc.with_ymd_and_hms(2024, 3, 5, 10, 30, 0).unwrap())
        );
        assert_eq!(parse_iso8601("not-a-date"), None);
        assert_eq!(parse_iso8601("2024-13-40"), None);
    }

    #[test]
    fn file_id_must_be_positive_integer() {
        assert_eq!(parse_file_id("42"), Ok(42));
        for bad in ["0", "-3", "abc", "1.5", "99999999999"] {
            let errs = parse_file_id(bad).unwrap_err();
            assert_eq!(errs[0].field, "fileId");
            assert_eq!(errs[0].msg, "El fileId debe ser un entero positivo.");
        }
    }

    #[test]
    fn violations_accumulate() {
        let mut v = Violations::default();
        assert_eq!(v.positive_id("cliente_id", Some("x")), None);
        assert_eq!(v.positive_id("lugar_id", Some("7")), Some(7));
        assert_eq!(v.iso8601("fechaRealizacionServicio", Some("ayer")), None);
        assert_eq!(v.positive_id("tipo_servicio_id", None), None);
        let errs = v.into_result().unwrap_err();
        assert_eq!(errs.len(), 2);
        assert_eq!(errs[0].msg, "cliente_id debe ser un entero positivo.");
        assert_eq!(errs[1].field, "fechaRealizacionServicio");
    }
}
