use chrono::{DateTime, FixedOffset};

use crate::event::{RawEvent, Record};

pub type Result<T> = std::result::Result<T, ParseError>;

/// Timestamps must carry an explicit numeric UTC offset.
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// A grammar or timestamp violation in a fetched event.
///
/// Every variant embeds the offending [`RawEvent`] so the message can show
/// exactly which calendar entry needs fixing.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseError {
    #[error("multiple projects in {0}")]
    MultipleProjects(RawEvent),

    #[error("multiple activities in {0}")]
    MultipleActivities(RawEvent),

    #[error("no project or activity in {0}")]
    MissingProjectOrActivity(RawEvent),

    #[error("invalid start time in {event}: {source}")]
    InvalidStartTime {
        event: RawEvent,
        source: chrono::ParseError,
    },

    #[error("invalid end time in {event}: {source}")]
    InvalidEndTime {
        event: RawEvent,
        source: chrono::ParseError,
    },
}

/// Decodes a single fetched event into a [`Record`].
///
/// The summary is split on single spaces and each token is dispatched on its
/// first character: `$project`, `%activity`, `#tag`, `@person`. Any other
/// token is free text and is ignored, which keeps the grammar forward
/// compatible with plain prose in event titles.
pub fn decode(raw: &RawEvent) -> Result<Record> {
    let mut project = String::new();
    let mut activity = String::new();
    let mut tags = Vec::new();
    let mut persons = Vec::new();

    for token in raw.summary.split(' ') {
        if let Some(name) = token.strip_prefix('$') {
            if !project.is_empty() {
                return Err(ParseError::MultipleProjects(raw.clone()));
            }
            project = name.to_string();
        } else if let Some(name) = token.strip_prefix('%') {
            if !activity.is_empty() {
                return Err(ParseError::MultipleActivities(raw.clone()));
            }
            activity = name.to_string();
        } else if let Some(tag) = token.strip_prefix('#') {
            tags.push(tag.to_string());
        } else if let Some(person) = token.strip_prefix('@') {
            persons.push(person.to_string());
        }
    }

    if project.is_empty() || activity.is_empty() {
        return Err(ParseError::MissingProjectOrActivity(raw.clone()));
    }

    let start_time = decode_time(&raw.start_time).map_err(|source| ParseError::InvalidStartTime {
        event: raw.clone(),
        source,
    })?;
    let end_time = decode_time(&raw.end_time).map_err(|source| ParseError::InvalidEndTime {
        event: raw.clone(),
        source,
    })?;

    Ok(Record {
        project,
        activity,
        tags: Some(tags),
        persons: Some(persons),
        start_time,
        // May be negative when the end precedes the start; this is accepted
        // as-is rather than validated.
        duration: end_time - start_time,
    })
}

fn decode_time(value: &str) -> std::result::Result<DateTime<FixedOffset>, chrono::ParseError> {
    DateTime::parse_from_str(value, TIME_FORMAT)
}

/// Decodes a batch of fetched events, all-or-nothing.
///
/// The first event that fails to decode aborts the whole batch with no
/// partial output.
pub fn decode_all(raws: &[RawEvent]) -> Result<Vec<Record>> {
    raws.iter().map(decode).collect()
}
