use chrono::{DateTime, Local, SecondsFormat};
use serde::Deserialize;

use crate::event::RawEvent;

const API_BASE: &str = "https://www.googleapis.com/calendar/v3";

#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("unable to retrieve events: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("calendar API error ({status}): {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Parameters for [`Client::fetch_events`]. All fields are mandatory.
#[derive(Debug, Clone)]
pub struct FetchEventsConfig {
    pub calendar_id: String,
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
    pub max_events: i64,
}

/// A Google Calendar API client authenticated with a bearer token.
///
/// Token provisioning is out of scope here: the caller obtains a valid
/// OAuth2 access token elsewhere and hands it to [`Client::new`].
pub struct Client {
    http: reqwest::blocking::Client,
    access_token: String,
}

impl Client {
    pub fn new(access_token: String) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            access_token,
        }
    }

    /// Retrieves the events within the configured time range, expanding
    /// recurring events and ordering by start time.
    pub fn fetch_events(&self, config: &FetchEventsConfig) -> Result<Vec<RawEvent>, CalendarError> {
        let url = format!("{API_BASE}/calendars/{}/events", config.calendar_id);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[
                (
                    "timeMin",
                    config
                        .start_time
                        .to_rfc3339_opts(SecondsFormat::Secs, false),
                ),
                (
                    "timeMax",
                    config.end_time.to_rfc3339_opts(SecondsFormat::Secs, false),
                ),
                ("maxResults", config.max_events.to_string()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ])
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_else(|_| "unknown error".to_string());
            return Err(CalendarError::Api { status, body });
        }

        let events: EventsResponse = response.json()?;
        Ok(events.items.into_iter().map(RawEvent::from).collect())
    }
}

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
}

#[derive(Debug, Deserialize)]
struct ApiEvent {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    start: ApiEventTime,
    #[serde(default)]
    end: ApiEventTime,
}

/// Timed events carry `dateTime`; all-day events carry `date` only. The
/// parser will reject all-day events anyway since a bare date has no offset.
#[derive(Debug, Default, Deserialize)]
struct ApiEventTime {
    #[serde(rename = "dateTime")]
    date_time: Option<String>,
    date: Option<String>,
}

impl ApiEventTime {
    fn into_timestamp(self) -> String {
        self.date_time.or(self.date).unwrap_or_default()
    }
}

impl From<ApiEvent> for RawEvent {
    fn from(event: ApiEvent) -> Self {
        RawEvent {
            summary: event.summary,
            start_time: event.start.into_timestamp(),
            end_time: event.end.into_timestamp(),
        }
    }
}
