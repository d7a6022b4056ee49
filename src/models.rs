use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize};

use crate::aggregate::AggregationCell;
use crate::duplicates::DuplicateGroup;
use crate::window::WeekLabel;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Venue {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    pub name: String,
}

/// One listing as returned by the gig query endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Gig {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    pub name: String,
    #[serde(deserialize_with = "gig_date")]
    pub date: NaiveDateTime,
    pub venue: Venue,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub genre_tags: Vec<String>,
}

/// The part of a gig a calendar cell keeps for tooltips.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GigSummary {
    pub id: String,
    pub name: String,
    pub date: NaiveDateTime,
    pub genre_tags: Vec<String>,
}

impl GigSummary {
    pub fn missing_genres(&self) -> bool {
        self.genre_tags.is_empty()
    }
}

impl From<&Gig> for GigSummary {
    fn from(gig: &Gig) -> Self {
        Self {
            id: gig.id.clone(),
            name: gig.name.clone(),
            date: gig.date,
            genre_tags: gig.genre_tags.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotStatus {
    Ready,
    NoData,
}

#[derive(Debug, Serialize)]
pub struct VenueResponse {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub total: u64,
    pub cells: Vec<AggregationCell>,
}

#[derive(Debug, Serialize)]
pub struct CalendarResponse {
    pub location: String,
    pub generated_at: NaiveDateTime,
    pub status: SnapshotStatus,
    pub labels: Vec<WeekLabel>,
    pub venues: Vec<VenueResponse>,
    pub dropped: u64,
    pub duplicates: Vec<DuplicateGroup>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RefreshRequest {
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProgressResponse {
    pub percent: u8,
    pub refreshing: bool,
}

/// Accepts RFC 3339, a naive date-time, or a bare date (local midnight).
pub fn parse_gig_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN))
}

fn gig_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_gig_date(&raw).ok_or_else(|| D::Error::custom(format!("unrecognised gig date: {raw}")))
}

fn opaque_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(id) => Ok(id),
        serde_json::Value::Number(id) => Ok(id.to_string()),
        other => Err(D::Error::custom(format!("unsupported id: {other}"))),
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gig_decodes_numeric_ids_and_missing_genres() {
        let raw = r#"{
            "id": 42,
            "name": "Late Show",
            "date": "2026-10-20",
            "venue": { "id": "v-1", "name": "Hall", "address": "ignored" },
            "genre_tags": null
        }"#;
        let gig: Gig = serde_json::from_str(raw).unwrap();
        assert_eq!(gig.id, "42");
        assert_eq!(gig.venue.id, "v-1");
        assert!(gig.genre_tags.is_empty());
        assert_eq!(gig.date.to_string(), "2026-10-20 00:00:00");
    }

    #[test]
    fn gig_without_genre_field_decodes() {
        let raw = r#"{"id":"a","name":"x","date":"2026-10-20T21:30:00","venue":{"id":7,"name":"Bar"}}"#;
        let gig: Gig = serde_json::from_str(raw).unwrap();
        assert_eq!(gig.venue.id, "7");
        assert!(GigSummary::from(&gig).missing_genres());
    }

    #[test]
    fn only_an_empty_tag_list_counts_as_missing() {
        let summary = |tags: &[&str]| GigSummary {
            id: "a".into(),
            name: "x".into(),
            date: parse_gig_date("2026-10-20").unwrap(),
            genre_tags: tags.iter().map(|tag| tag.to_string()).collect(),
        };
        assert!(summary(&[]).missing_genres());
        assert!(!summary(&[" "]).missing_genres());
        assert!(!summary(&["folk"]).missing_genres());
    }

    #[test]
    fn rfc3339_dates_keep_local_wall_clock() {
        let dt = parse_gig_date("2026-10-19T04:00:00+11:00").unwrap();
        assert_eq!(dt.to_string(), "2026-10-19 04:00:00");
        assert!(parse_gig_date("next tuesday").is_none());
    }
}
