use std::fmt;

use chrono::{DateTime, FixedOffset, TimeDelta};
use serde::{Serialize, Serializer};

/// A calendar event as fetched from the calendar service, before decoding.
///
/// Start and end times are kept as the raw RFC3339 strings returned by the
/// API; the parser is responsible for decoding them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawEvent {
    #[serde(rename = "Summary")]
    pub summary: String,
    #[serde(rename = "StartTime")]
    pub start_time: String,
    #[serde(rename = "EndTime")]
    pub end_time: String,
}

impl fmt::Display for RawEvent {
    /// Formats the event as its canonical single-line JSON representation,
    /// which error messages embed verbatim.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&data)
    }
}

/// A decoded or synthesized unit of tracked time.
///
/// Freshly decoded records always carry a non-empty project and activity and
/// `Some` tag/person lists (possibly empty). The aggregation stage emits
/// records with `None` tags/persons, while the total stage emits `Some`
/// empty lists; the distinction is observable in the JSON output (`null`
/// versus `[]`) and must not be collapsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    #[serde(rename = "Project")]
    pub project: String,
    #[serde(rename = "Activity")]
    pub activity: String,
    #[serde(rename = "Tags")]
    pub tags: Option<Vec<String>>,
    #[serde(rename = "Persons")]
    pub persons: Option<Vec<String>>,
    #[serde(rename = "StartTime")]
    pub start_time: DateTime<FixedOffset>,
    #[serde(rename = "Duration", serialize_with = "serialize_nanos")]
    pub duration: TimeDelta,
}

/// Serializes a duration as an integer number of nanoseconds, saturating
/// toward the sign of the span when the count overflows an i64.
fn serialize_nanos<S: Serializer>(delta: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error> {
    let nanos = delta.num_nanoseconds().unwrap_or(if *delta < TimeDelta::zero() {
        i64::MIN
    } else {
        i64::MAX
    });
    serializer.serialize_i64(nanos)
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;

    #[test]
    fn raw_event_display_is_canonical_json() {
        let raw = RawEvent {
            summary: "$nexa %development".to_string(),
            start_time: "2017-11-03T10:00:00+01:00".to_string(),
            end_time: "2017-11-03T11:00:00+01:00".to_string(),
        };
        assert_eq!(
            raw.to_string(),
            r#"{"Summary":"$nexa %development","StartTime":"2017-11-03T10:00:00+01:00","EndTime":"2017-11-03T11:00:00+01:00"}"#,
        );
    }

    #[test]
    fn record_serializes_fields_in_order() {
        let record = Record {
            project: "nexa".to_string(),
            activity: "development".to_string(),
            tags: Some(vec!["neubot".to_string()]),
            persons: Some(Vec::new()),
            start_time: DateTime::parse_from_rfc3339("2017-11-03T10:00:00+01:00").unwrap(),
            duration: TimeDelta::hours(1),
        };
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"Project":"nexa","Activity":"development","Tags":["neubot"],"Persons":[],"StartTime":"2017-11-03T10:00:00+01:00","Duration":3600000000000}"#,
        );
    }

    #[test]
    fn duration_nanos_saturate_by_sign() {
        let mut record = Record {
            project: "nexa".to_string(),
            activity: "development".to_string(),
            tags: Some(Vec::new()),
            persons: Some(Vec::new()),
            start_time: DateTime::parse_from_rfc3339("2017-11-03T10:00:00+01:00").unwrap(),
            // About 547 years: the nanosecond count no longer fits an i64.
            duration: TimeDelta::days(200_000),
        };
        let serialized = serde_json::to_string(&record).unwrap();
        assert!(serialized.contains(&format!("\"Duration\":{}", i64::MAX)));

        record.duration = TimeDelta::days(-200_000);
        let serialized = serde_json::to_string(&record).unwrap();
        assert!(serialized.contains(&format!("\"Duration\":{}", i64::MIN)));
    }

    #[test]
    fn record_serializes_absent_tags_and_persons_as_null() {
        let record = Record {
            project: "nexa".to_string(),
            activity: String::new(),
            tags: None,
            persons: None,
            start_time: DateTime::parse_from_rfc3339("2017-11-03T00:00:00+00:00").unwrap(),
            duration: TimeDelta::minutes(105),
        };
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"Project":"nexa","Activity":"","Tags":null,"Persons":null,"StartTime":"2017-11-03T00:00:00+00:00","Duration":6300000000000}"#,
        );
    }
}
