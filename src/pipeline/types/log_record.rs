use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::pipeline::types::{CodeType, ScanEvent};

pub const RESULT_OK: &str = "OK";

/// One row of the `access_logs` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub code_value: String,
    pub code_type: CodeType,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub timestamp: DateTime<Utc>,
    // Rows written by older scanners carry no result; they were all accepted scans.
    #[serde(default = "default_result", deserialize_with = "result_or_ok")]
    pub result: String,
}

impl LogRecord {
    pub fn accepted(event: &ScanEvent) -> Self {
        Self {
            code_value: event.code_value.clone(),
            code_type: event.code_type,
            timestamp: event.detected_at,
            result: RESULT_OK.to_string(),
        }
    }
}

fn default_result() -> String {
    RESULT_OK.to_string()
}

fn result_or_ok<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_result))
}

/// Accepts RFC 3339 as well as offset-less ISO timestamps, which are taken as UTC.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f%#z"]
        .iter()
        .find_map(|format| {
            DateTime::parse_from_str(raw, format)
                .map(|parsed| parsed.with_timezone(&Utc))
                .ok()
                .or_else(|| NaiveDateTime::parse_from_str(raw, format).ok().map(|naive| naive.and_utc()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn rows_without_result_or_offset_are_read() {
        let row = r#"{"code_value":"EMP-0001","code_type":"QRCODE","timestamp":"2025-03-04T05:06:07.123456"}"#;
        let record: LogRecord = serde_json::from_str(row).unwrap();
        assert_eq!(record.result, RESULT_OK);
        assert_eq!(
            record.timestamp,
            Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap() + chrono::TimeDelta::microseconds(123_456)
        );

        let row = r#"{"code_value":"EMP-0001","code_type":"QRCODE","timestamp":"2025-03-04T05:06:07","result":null}"#;
        let record: LogRecord = serde_json::from_str(row).unwrap();
        assert_eq!(record.result, RESULT_OK);
    }

    #[test]
    fn offset_timestamps_are_normalised_to_utc() {
        assert_eq!(
            parse_timestamp("2025-03-04T07:06:07+02:00"),
            Some(Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap())
        );
        assert_eq!(
            parse_timestamp("2025-03-04 05:06:07+00"),
            Some(Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap())
        );
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn written_rows_read_back_unchanged() {
        let event = ScanEvent::new("A1", CodeType::Ean13, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        let record = LogRecord::accepted(&event);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(serde_json::from_str::<LogRecord>(&json).unwrap(), record);
    }
}
