use crate::config::EpgConfig;
use crate::programme::{self, Programme};
use crate::xmltv;
use anyhow::{Context, bail};
use chrono::{DateTime, Days, NaiveDate, Utc};
use ligue1_api::MatchCalendar;
use ligue1_api::client::Ligue1Api;
use ligue1_api::normalize::Normalizer;
use log::{info, warn};

/// A rendered guide and what went into it.
#[derive(Debug, Clone)]
pub struct Listing {
    pub xml: String,
    pub programmes: Vec<Programme>,
    pub match_count: usize,
}

impl Listing {
    pub fn multiplex_count(&self) -> usize {
        self.programmes
            .iter()
            .filter(|p| matches!(p, Programme::Multiplex(_)))
            .count()
    }
}

/// Fetch `days` days ahead of today, build the guide and write it to
/// `config.output`.
pub async fn generate(config: &EpgConfig, days: u32, now: DateTime<Utc>) -> anyhow::Result<Listing> {
    let start = now.with_timezone(&config.feed.default_offset).date_naive();
    let end = start
        .checked_add_days(Days::new(u64::from(days)))
        .with_context(|| format!("{days} days from {start} is out of range"))?;

    info!("Fetching matches from {start} to {end}");
    let calendar = load_calendar(config, start, end).await?;

    let listing = build_listing(config, &calendar, now)?;
    xmltv::write_listing(&config.output, &listing.xml)?;
    Ok(listing)
}

/// The raw calendar, from a local snapshot when one is configured and from
/// the API otherwise. An empty result is an error: there is nothing to list.
pub async fn load_calendar(
    config: &EpgConfig,
    start: NaiveDate,
    end: NaiveDate,
) -> anyhow::Result<MatchCalendar> {
    let calendar = match &config.calendar_json {
        Some(path) => {
            info!("Loading calendar snapshot from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("could not read {}", path.display()))?;
            let calendar = MatchCalendar::from_json(&content)
                .with_context(|| format!("invalid calendar json at {}", path.display()))?;
            Some(calendar).filter(|c| !c.is_empty())
        }
        None => {
            let api = match &config.api_base {
                Some(base) => Ligue1Api::with_base_url(base.as_str()),
                None => Ligue1Api::new(),
            };
            api.fetch_range(start, end).await
        }
    };

    match calendar {
        Some(calendar) => Ok(calendar),
        None => bail!("could not retrieve any match data between {start} and {end}"),
    }
}

/// Normalize, group and render. Zero matches for the channel still yields a
/// valid document holding only the channel block.
pub fn build_listing(
    config: &EpgConfig,
    calendar: &MatchCalendar,
    now: DateTime<Utc>,
) -> anyhow::Result<Listing> {
    let matches = Normalizer::new(config.feed.clone()).normalize(calendar, now);
    if matches.is_empty() {
        warn!("No {} matches found for the period", config.feed.broadcaster);
    }
    let match_count = matches.len();

    let programmes = programme::group(matches);
    let xml = xmltv::render(&config.channel, &programmes)?;

    Ok(Listing { xml, programmes, match_count })
}
