use std::io;

use chrono::{SecondsFormat, TimeDelta};
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};

use crate::event::Record;

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("the --format flag accepts one of these values: box, csv, invoice, json")]
    UnknownFormat,

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Writes the records using the given writer and output format.
pub fn write<W: io::Write>(writer: W, format: &str, records: &[Record]) -> Result<(), OutputError> {
    match format {
        "box" => write_format_box(writer, records),
        "csv" => write_format_csv(writer, records),
        "invoice" => write_format_invoice(writer, records),
        "json" => write_format_json(writer, records),
        _ => Err(OutputError::UnknownFormat),
    }
}

/// One single-line JSON object per record, newline terminated.
fn write_format_json<W: io::Write>(mut writer: W, records: &[Record]) -> Result<(), OutputError> {
    for record in records {
        let serialized = serde_json::to_string(record)?;
        writeln!(writer, "{serialized}")?;
    }
    Ok(())
}

fn write_format_csv<W: io::Write>(writer: W, records: &[Record]) -> Result<(), OutputError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.write_record([
            record
                .start_time
                .to_rfc3339_opts(SecondsFormat::Secs, false),
            humanize(record.duration),
            record.project.clone(),
            record.activity.clone(),
            record.tags.as_deref().unwrap_or_default().join(" "),
            record.persons.as_deref().unwrap_or_default().join(" "),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Per-project rows suitable for invoicing: date only, decimal hours.
fn write_format_invoice<W: io::Write>(writer: W, records: &[Record]) -> Result<(), OutputError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.write_record([
            record.project.clone(),
            record.start_time.format("%Y-%m-%d").to_string(),
            format!("{}", hours(record.duration)),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

fn write_format_box<W: io::Write>(mut writer: W, records: &[Record]) -> Result<(), OutputError> {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "StartTime", "Hours", "Project", "Activity", "Tags", "Persons",
        ]);
    for record in records {
        table.add_row(vec![
            Cell::new(record.start_time.format("%Y-%m-%d %H:%M")),
            Cell::new(format!("{:.1}", hours(record.duration)))
                .set_alignment(CellAlignment::Right),
            Cell::new(&record.project),
            Cell::new(&record.activity),
            Cell::new(record.tags.as_deref().unwrap_or_default().join(" ")),
            Cell::new(record.persons.as_deref().unwrap_or_default().join(" ")),
        ]);
    }
    writeln!(writer, "{table}")?;
    Ok(())
}

/// Renders a duration the way Go's `time.Duration` prints whole seconds:
/// `1h45m0s`, `30m0s`, `45s`, with a leading minus for negative spans.
fn humanize(duration: TimeDelta) -> String {
    let mut seconds = duration.num_seconds();
    let sign = if seconds < 0 {
        seconds = -seconds;
        "-"
    } else {
        ""
    };
    let (hours, minutes, seconds) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if hours > 0 {
        format!("{sign}{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{sign}{minutes}m{seconds}s")
    } else {
        format!("{sign}{seconds}s")
    }
}

fn hours(duration: TimeDelta) -> f64 {
    duration.num_seconds() as f64 / 3600.0
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, FixedOffset};

    use super::*;
    use crate::parser::TIME_FORMAT;

    fn ts(value: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_str(value, TIME_FORMAT).unwrap()
    }

    fn sample() -> Vec<Record> {
        vec![
            Record {
                project: "nexa".to_string(),
                activity: "development".to_string(),
                tags: Some(vec!["neubot".to_string(), "pr42".to_string()]),
                persons: Some(Vec::new()),
                start_time: ts("2017-11-03T10:00:00+01:00"),
                duration: TimeDelta::hours(1),
            },
            Record {
                project: "mlab".to_string(),
                activity: "meeting".to_string(),
                tags: Some(vec!["staff".to_string()]),
                persons: Some(vec!["alice".to_string(), "bob".to_string()]),
                start_time: ts("2017-11-03T11:30:00+01:00"),
                duration: TimeDelta::minutes(45),
            },
        ]
    }

    fn render(format: &str, records: &[Record]) -> String {
        let mut buffer = Vec::new();
        write(&mut buffer, format, records).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn unknown_format() {
        let mut buffer = Vec::new();
        let err = write(&mut buffer, "yaml", &sample()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "the --format flag accepts one of these values: box, csv, invoice, json",
        );
        assert!(buffer.is_empty());
    }

    #[test]
    fn json_lines() {
        assert_eq!(
            render("json", &sample()),
            concat!(
                r#"{"Project":"nexa","Activity":"development","Tags":["neubot","pr42"],"Persons":[],"StartTime":"2017-11-03T10:00:00+01:00","Duration":3600000000000}"#,
                "\n",
                r#"{"Project":"mlab","Activity":"meeting","Tags":["staff"],"Persons":["alice","bob"],"StartTime":"2017-11-03T11:30:00+01:00","Duration":2700000000000}"#,
                "\n",
            ),
        );
    }

    #[test]
    fn json_serializes_aggregated_records_with_null_lists() {
        let records = vec![Record {
            project: "nexa".to_string(),
            activity: String::new(),
            tags: None,
            persons: None,
            start_time: ts("2017-11-03T00:00:00+00:00"),
            duration: TimeDelta::minutes(105),
        }];
        assert_eq!(
            render("json", &records),
            concat!(
                r#"{"Project":"nexa","Activity":"","Tags":null,"Persons":null,"StartTime":"2017-11-03T00:00:00+00:00","Duration":6300000000000}"#,
                "\n",
            ),
        );
    }

    #[test]
    fn csv_rows() {
        assert_eq!(
            render("csv", &sample()),
            "2017-11-03T10:00:00+01:00,1h0m0s,nexa,development,neubot pr42,\n\
             2017-11-03T11:30:00+01:00,45m0s,mlab,meeting,staff,alice bob\n",
        );
    }

    #[test]
    fn invoice_rows() {
        let records = vec![Record {
            project: "nexa".to_string(),
            activity: String::new(),
            tags: Some(Vec::new()),
            persons: Some(Vec::new()),
            start_time: ts("2017-11-03T00:00:00+00:00"),
            duration: TimeDelta::minutes(45),
        }];
        assert_eq!(render("invoice", &records), "nexa,2017-11-03,0.75\n");
    }

    #[test]
    fn box_table() {
        let records = vec![Record {
            project: "nexa".to_string(),
            activity: "development".to_string(),
            tags: Some(vec!["neubot".to_string()]),
            persons: Some(Vec::new()),
            start_time: ts("2017-11-03T10:00:00+01:00"),
            duration: TimeDelta::hours(1),
        }];
        let rendered = render("box", &records);
        assert!(rendered.starts_with('┌'));
        assert!(rendered.trim_end().ends_with('┘'));
        for needle in [
            "StartTime",
            "Hours",
            "Project",
            "Activity",
            "Tags",
            "Persons",
            "2017-11-03 10:00",
            "1.0",
            "nexa",
            "development",
            "neubot",
        ] {
            assert!(rendered.contains(needle), "missing {needle:?} in:\n{rendered}");
        }
    }

    #[test]
    fn box_table_with_no_records() {
        let rendered = render("box", &[]);
        assert!(rendered.starts_with('┌'));
        for needle in ["StartTime", "Hours", "Project", "Activity", "Tags", "Persons"] {
            assert!(rendered.contains(needle), "missing {needle:?} in:\n{rendered}");
        }
    }

    #[test]
    fn humanize_durations() {
        assert_eq!(humanize(TimeDelta::zero()), "0s");
        assert_eq!(humanize(TimeDelta::seconds(45)), "45s");
        assert_eq!(humanize(TimeDelta::minutes(30)), "30m0s");
        assert_eq!(humanize(TimeDelta::hours(1)), "1h0m0s");
        assert_eq!(
            humanize(TimeDelta::hours(1) + TimeDelta::minutes(45)),
            "1h45m0s"
        );
        assert_eq!(humanize(TimeDelta::minutes(-30)), "-30m0s");
    }

    #[test]
    fn decimal_hours() {
        assert_eq!(format!("{}", hours(TimeDelta::minutes(45))), "0.75");
        assert_eq!(format!("{}", hours(TimeDelta::hours(2))), "2");
        assert_eq!(
            format!("{}", hours(TimeDelta::hours(1) + TimeDelta::minutes(45))),
            "1.75"
        );
    }
}
