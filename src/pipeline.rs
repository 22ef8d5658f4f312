use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, TimeDelta};

use crate::event::Record;

/// Reporting pipeline configuration.
///
/// Every field is optional: an empty string (or `false`) turns the
/// corresponding stage into a pass-through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Only keep records belonging to this project.
    pub project: String,

    /// Only keep records carrying this tag.
    pub tag: String,

    /// Aggregation policy: one of "daily", "weekly", "monthly".
    pub aggregate: String,

    /// Sum the total time by project.
    pub total: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    // The wording intentionally omits weekly: compatibility tests match
    // this message verbatim.
    #[error("invalid aggregation policy: {0} (valid values: daily, monthly)")]
    InvalidAggregationPolicy(String),
}

/// Runs the filter, aggregate, and total stages in that fixed order.
///
/// Each stage produces a fresh list and never mutates its input. The result
/// is `None` when no stage produced any record, which the JSON output
/// distinguishes from an empty list; the total stage always produces `Some`.
pub fn run(config: &Config, records: &[Record]) -> Result<Option<Vec<Record>>, PipelineError> {
    let records = filter(&config.project, &config.tag, records);
    let records = aggregate(&config.aggregate, records)?;
    Ok(total(config.total, records))
}

/// A record survives if it matches the project filter and the tag filter;
/// an empty filter matches everything. Order is preserved.
fn filter(project: &str, tag: &str, inputs: &[Record]) -> Option<Vec<Record>> {
    let mut outputs: Option<Vec<Record>> = None;
    for record in inputs {
        let project_matches = project.is_empty() || record.project == project;
        let tag_matches = tag.is_empty()
            || record
                .tags
                .as_deref()
                .unwrap_or_default()
                .iter()
                .any(|candidate| candidate == tag);
        if project_matches && tag_matches {
            outputs.get_or_insert_with(Vec::new).push(record.clone());
        }
    }
    outputs
}

#[derive(Debug, Clone, Copy)]
enum Policy {
    Daily,
    Weekly,
    Monthly,
}

/// Buckets records by (period start, project) and sums durations per bucket.
///
/// The period start is truncated on the record's own offset-local civil date
/// and then relabelled as a UTC instant bearing the same calendar components.
/// Discarding the offset here is a documented quirk of the format that
/// downstream consumers rely on; do not normalize to UTC before truncating.
fn aggregate(
    policy: &str,
    inputs: Option<Vec<Record>>,
) -> Result<Option<Vec<Record>>, PipelineError> {
    let policy = match policy {
        "" => return Ok(inputs),
        "daily" => Policy::Daily,
        "weekly" => Policy::Weekly,
        "monthly" => Policy::Monthly,
        other => {
            return Err(PipelineError::InvalidAggregationPolicy(other.to_string()));
        }
    };

    // BTreeMap iteration gives the required ordering for free: ascending by
    // period start, then lexicographically by project within a period.
    let mut sums: BTreeMap<NaiveDate, BTreeMap<String, TimeDelta>> = BTreeMap::new();
    for record in inputs.iter().flatten() {
        let period = period_start(policy, record.start_time.date_naive());
        let slot = sums
            .entry(period)
            .or_default()
            .entry(record.project.clone())
            .or_insert_with(TimeDelta::zero);
        *slot = *slot + record.duration;
    }

    let mut outputs: Option<Vec<Record>> = None;
    for (period, projects) in &sums {
        let start_time = utc_midnight(*period);
        for (project, duration) in projects {
            outputs.get_or_insert_with(Vec::new).push(Record {
                project: project.clone(),
                activity: String::new(),
                tags: None,
                persons: None,
                start_time,
                duration: *duration,
            });
        }
    }
    Ok(outputs)
}

fn period_start(policy: Policy, date: NaiveDate) -> NaiveDate {
    match policy {
        Policy::Daily => date,
        // ISO week: truncate to the Monday on or before the civil date.
        Policy::Weekly => date - TimeDelta::days(i64::from(date.weekday().num_days_from_monday())),
        Policy::Monthly => date.with_day(1).unwrap(),
    }
}

fn utc_midnight(date: NaiveDate) -> DateTime<FixedOffset> {
    date.and_hms_opt(0, 0, 0).unwrap().and_utc().fixed_offset()
}

/// Regroups records strictly by project, ignoring time buckets.
///
/// The start time of each output record is the one of the first input record
/// encountered for that project (first-write-wins); durations accumulate
/// across all records sharing the project. Output is ordered by project.
fn total(enabled: bool, inputs: Option<Vec<Record>>) -> Option<Vec<Record>> {
    if !enabled {
        return inputs;
    }

    let mut sums: BTreeMap<String, Record> = BTreeMap::new();
    for record in inputs.iter().flatten() {
        match sums.get_mut(&record.project) {
            Some(existing) => existing.duration = existing.duration + record.duration,
            None => {
                sums.insert(
                    record.project.clone(),
                    Record {
                        project: record.project.clone(),
                        activity: String::new(),
                        tags: Some(Vec::new()),
                        persons: Some(Vec::new()),
                        start_time: record.start_time,
                        duration: record.duration,
                    },
                );
            }
        }
    }

    // Always a list, even when empty.
    Some(sums.into_values().collect())
}
