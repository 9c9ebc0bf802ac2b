/// Ligue 1 calendar API raw wire types — serde shapes for deserializing responses.
/// Endpoint: https://ma-api.ligue1.fr/championships-daily-calendars/matches
/// These map to our clean domain types in normalize.rs.
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

// ---------------------------------------------------------------------------
// Daily calendar envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
pub struct CalendarResponse {
    pub results: Option<CalendarResults>,
}

impl CalendarResponse {
    pub fn into_matches(self) -> Vec<RawMatch> {
        self.results.map(|r| r.matches).unwrap_or_default()
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct CalendarResults {
    /// Keyed by match id upstream. Kept in document order rather than hashed.
    #[serde(default, deserialize_with = "ordered_matches")]
    pub matches: Vec<RawMatch>,
}

/// One upstream match, still opaque. Decoded lazily so a single malformed
/// record cannot fail the whole day.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMatch {
    pub id: String,
    pub payload: Value,
}

impl RawMatch {
    /// True when `broadcasters.local[]` lists `code`.
    pub fn is_broadcast_by(&self, code: &str) -> bool {
        self.payload
            .pointer("/broadcasters/local")
            .and_then(Value::as_array)
            .map(|local| {
                local
                    .iter()
                    .any(|b| b.get("code").and_then(Value::as_str) == Some(code))
            })
            .unwrap_or(false)
    }

    pub fn decode(&self) -> serde_json::Result<MatchPayload> {
        MatchPayload::deserialize(&self.payload)
    }
}

fn ordered_matches<'de, D>(deserializer: D) -> Result<Vec<RawMatch>, D::Error>
where
    D: Deserializer<'de>,
{
    struct MatchesVisitor;

    impl<'de> Visitor<'de> for MatchesVisitor {
        type Value = Vec<RawMatch>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of match id to match")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut matches = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((id, payload)) = map.next_entry::<String, Value>()? {
                matches.push(RawMatch { id, payload });
            }
            Ok(matches)
        }

        // Days without fixtures come back as `[]` instead of `{}`.
        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            if seq.next_element::<de::IgnoredAny>()?.is_some() {
                return Err(de::Error::invalid_type(de::Unexpected::Seq, &self));
            }
            Ok(Vec::new())
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(MatchesVisitor)
}

// ---------------------------------------------------------------------------
// Match payload
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MatchPayload {
    pub date: Option<String>, // "2024-03-10T21:00:00+01:00", offset optional
    pub home: Option<MatchSide>,
    pub away: Option<MatchSide>,
    pub championship_id: Option<i64>,
    pub game_week_number: Option<u32>,
    pub is_live: Option<bool>,
    pub period: Option<Period>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MatchSide {
    pub club_identity: Option<ClubIdentity>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ClubIdentity {
    pub display_name: Option<String>,
    pub name: Option<String>,
    pub short_name: Option<String>,
    pub official_name: Option<String>,
}

impl ClubIdentity {
    /// Name candidates in preference order.
    pub fn candidates(&self) -> [Option<&str>; 4] {
        [
            self.display_name.as_deref(),
            self.name.as_deref(),
            self.short_name.as_deref(),
            self.official_name.as_deref(),
        ]
    }
}

#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Period {
    #[default]
    PreMatch,
    Live,
    PostMatch,
    #[serde(other)]
    Unknown, // half-time and friends
}
