pub mod client;
pub mod ligue1;
pub mod normalize;

use crate::ligue1::{CalendarResponse, RawMatch};
use chrono::{DateTime, FixedOffset, Offset, TimeDelta, Utc};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Domain types — clean model, independent of the Ligue 1 wire format
// ---------------------------------------------------------------------------

/// Raw matches gathered over a date range, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct MatchCalendar {
    matches: Vec<RawMatch>,
    index: HashMap<String, usize>,
}

impl MatchCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an upstream-format calendar document.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        let response: CalendarResponse = serde_json::from_str(raw)?;
        let mut calendar = Self::new();
        calendar.merge(response.into_matches());
        Ok(calendar)
    }

    /// Merge one day's matches. A repeated id replaces the earlier record in place.
    pub fn merge(&mut self, updates: Vec<RawMatch>) {
        for update in updates {
            match self.index.get(&update.id) {
                Some(&pos) => self.matches[pos] = update,
                None => {
                    self.index.insert(update.id.clone(), self.matches.len());
                    self.matches.push(update);
                }
            }
        }
    }

    pub fn matches(&self) -> &[RawMatch] {
        &self.matches
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Feed-level settings for turning raw matches into [`MatchRecord`]s.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Code looked up in `broadcasters.local[]`.
    pub broadcaster: String,
    /// The feed has no end times, every match gets this slot length.
    /// Must be positive; `Normalizer::new` replaces anything else with the default.
    pub match_duration: TimeDelta,
    /// Applied to kickoff strings that carry no offset.
    pub default_offset: FixedOffset,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            broadcaster: "L1+".into(),
            match_duration: TimeDelta::minutes(120),
            default_offset: FixedOffset::east_opt(3600).unwrap_or_else(|| Utc.fix()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    pub id: String,
    pub home_team: String,
    pub away_team: String,
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>, // start_time + FeedConfig::match_duration
    pub title: String,
    pub description: String,
    pub championship: String, // "Ligue 1 - J28"
    pub status: KickoffStatus,
}

impl MatchRecord {
    /// "PSG vs OM"
    pub fn fixture(&self) -> String {
        format!("{} vs {}", self.home_team, self.away_team)
    }
}

/// Where a match stands relative to "now" when the guide is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KickoffStatus {
    Live,
    Finished,
    Started, // kicked off but the feed does not flag it live yet
    Imminent,
    Today,
    Tomorrow,
    Upcoming,
}

impl KickoffStatus {
    pub fn prefix(&self) -> Option<&'static str> {
        match self {
            KickoffStatus::Live | KickoffStatus::Started => None,
            KickoffStatus::Finished => Some("[TERMINÉ]"),
            KickoffStatus::Imminent => Some("[IMMINENT]"),
            KickoffStatus::Today => Some("[AUJOURD'HUI]"),
            KickoffStatus::Tomorrow => Some("[DEMAIN]"),
            KickoffStatus::Upcoming => Some("[PROCHAIN MATCH]"),
        }
    }
}
