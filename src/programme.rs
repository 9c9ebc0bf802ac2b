use chrono::{DateTime, FixedOffset};
use ligue1_api::MatchRecord;
use log::info;
use std::collections::BTreeMap;

/// One guide slot: a single match, or several simultaneous kickoffs shown
/// as a multiplex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Programme {
    Single(MatchRecord),
    Multiplex(Multiplex),
}

impl Programme {
    pub fn start_time(&self) -> DateTime<FixedOffset> {
        match self {
            Programme::Single(m) => m.start_time,
            Programme::Multiplex(mx) => mx.lead().start_time,
        }
    }

    pub fn end_time(&self) -> DateTime<FixedOffset> {
        match self {
            Programme::Single(m) => m.end_time,
            Programme::Multiplex(mx) => mx.lead().end_time,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Programme::Single(m) => &m.title,
            Programme::Multiplex(mx) => &mx.title,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Programme::Single(m) => &m.description,
            Programme::Multiplex(mx) => &mx.description,
        }
    }

    pub fn championship(&self) -> &str {
        match self {
            Programme::Single(m) => &m.championship,
            // Mixed-competition slots are labelled after their first match.
            Programme::Multiplex(mx) => &mx.lead().championship,
        }
    }

    pub fn matches(&self) -> &[MatchRecord] {
        match self {
            Programme::Single(m) => std::slice::from_ref(m),
            Programme::Multiplex(mx) => &mx.matches,
        }
    }
}

/// Two or more matches sharing a kickoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Multiplex {
    matches: Vec<MatchRecord>,
    title: String,
    description: String,
}

impl Multiplex {
    /// `None` unless at least two matches are given.
    pub fn new(matches: Vec<MatchRecord>) -> Option<Self> {
        if matches.len() < 2 {
            return None;
        }

        let title = format!("{} - Multiplex", matches[0].championship);
        let listing: Vec<String> = matches
            .iter()
            .enumerate()
            .map(|(i, m)| format!("{}. {}", i + 1, m.fixture()))
            .collect();
        let description = format!("Multiplex : {}", listing.join(" "));

        Some(Self { matches, title, description })
    }

    fn lead(&self) -> &MatchRecord {
        &self.matches[0]
    }

    pub fn matches(&self) -> &[MatchRecord] {
        &self.matches
    }
}

/// Bucket matches by kickoff minute and build one programme per bucket,
/// ordered by start time. Matches keep their relative order inside a bucket.
pub fn group(matches: Vec<MatchRecord>) -> Vec<Programme> {
    let total = matches.len();

    let mut slots: BTreeMap<i64, Vec<MatchRecord>> = BTreeMap::new();
    for m in matches {
        slots.entry(m.start_time.timestamp().div_euclid(60)).or_default().push(m);
    }

    let programmes: Vec<Programme> = slots
        .into_values()
        .filter_map(|mut slot| match slot.len() {
            1 => slot.pop().map(Programme::Single),
            _ => Multiplex::new(slot).map(Programme::Multiplex),
        })
        .collect();

    info!("Created {} programmes from {total} matches", programmes.len());
    for programme in &programmes {
        if let Programme::Multiplex(mx) = programme {
            info!(
                "  Multiplex: {} simultaneous matches at {}",
                mx.matches.len(),
                programme.start_time().format("%d/%m %H:%M")
            );
        }
    }

    programmes
}
