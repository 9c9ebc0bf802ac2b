use crate::MatchCalendar;
use crate::ligue1::{CalendarResponse, RawMatch};
use chrono::NaiveDate;
use log::{debug, error, info, warn};
use reqwest::{Client, Url};
use std::fmt;
use std::time::Duration;

pub type ApiResult<T> = Result<T, ApiError>;

const LIGUE1_API_BASE: &str = "https://ma-api.ligue1.fr";
const DAILY_CALENDAR_ENDPOINT: &str = "/championships-daily-calendars/matches";
const CALENDAR_TIMEZONE: &str = "Europe/Paris";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Ligue 1 calendar API client.
#[derive(Debug, Clone)]
pub struct Ligue1Api {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl Default for Ligue1Api {
    fn default() -> Self {
        Self {
            client: Client::builder()
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_default(),
            base_url: LIGUE1_API_BASE.to_owned(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    Network(reqwest::Error, String),
    Api(reqwest::Error, String),
    Parsing(reqwest::Error, String),
    InvalidUrl(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(e, url) => write!(f, "Network error for {url}: {e}"),
            ApiError::Api(e, url) => write!(f, "API error for {url}: {e}"),
            ApiError::Parsing(e, url) => write!(f, "Parse error for {url}: {e}"),
            ApiError::InvalidUrl(msg) => write!(f, "Invalid URL: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

/// Query parameters of one calendar request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarQuery {
    pub from_date: NaiveDate,
    pub days_limit: u32,
    pub look_after: bool,
}

impl CalendarQuery {
    pub fn single_day(from_date: NaiveDate) -> Self {
        Self { from_date, days_limit: 1, look_after: true }
    }

    fn params(&self) -> [(&'static str, String); 4] {
        [
            ("fromDate", self.from_date.format("%Y-%m-%d").to_string()),
            ("timezone", CALENDAR_TIMEZONE.to_owned()),
            ("daysLimit", self.days_limit.to_string()),
            ("lookAfter", self.look_after.to_string()),
        ]
    }
}

impl Ligue1Api {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the client at another host, e.g. a mirror or a mock server.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            ..Self::default()
        }
    }

    /// Fetch every day in `[start, end]` with one request per day and merge
    /// the results by match id.
    ///
    /// A failed day is logged and counts as a day without matches. Returns
    /// `None` when nothing at all came back.
    pub async fn fetch_range(&self, start: NaiveDate, end: NaiveDate) -> Option<MatchCalendar> {
        let mut calendar = MatchCalendar::new();

        for day in start.iter_days().take_while(|d| *d <= end) {
            match self.fetch_day(day).await {
                Ok(matches) => {
                    debug!("{day}: {} matches", matches.len());
                    calendar.merge(matches);
                }
                Err(e) => error!("Could not fetch matches for {day}: {e}"),
            }
        }

        if calendar.is_empty() {
            warn!("No matches returned between {start} and {end}");
            None
        } else {
            info!("Retrieved {} matches between {start} and {end}", calendar.len());
            Some(calendar)
        }
    }

    /// Fetch the matches of a single day.
    pub async fn fetch_day(&self, day: NaiveDate) -> ApiResult<Vec<RawMatch>> {
        let raw = self.fetch_calendar(CalendarQuery::single_day(day)).await?;
        Ok(raw.into_matches())
    }

    pub async fn fetch_calendar(&self, query: CalendarQuery) -> ApiResult<CalendarResponse> {
        let endpoint = format!("{}{DAILY_CALENDAR_ENDPOINT}", self.base_url);
        let url = Url::parse_with_params(&endpoint, query.params())
            .map_err(|e| ApiError::InvalidUrl(format!("{endpoint}: {e}")))?;
        info!("Fetching matches from: {url}");
        self.get(url).await
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: Url) -> ApiResult<T> {
        let display = url.to_string();
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ApiError::Network(e, display.clone()))?;

        response
            .error_for_status()
            .map_err(|e| ApiError::Api(e, display.clone()))?
            .json::<T>()
            .await
            .map_err(|e| ApiError::Parsing(e, display))
    }
}
