use crate::config::FailurePolicy;
use crate::errors::FetchError;
use crate::models::Gig;
use crate::window::{Period, WeekWindow};
use reqwest::Client;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Queries the gig API one week at a time.
#[derive(Clone)]
pub struct GigFetcher {
    client: Client,
    base_url: String,
    policy: FailurePolicy,
}

impl GigFetcher {
    pub fn new(base_url: impl Into<String>, policy: FailurePolicy) -> Self {
        Self::with_client(Client::new(), base_url, policy)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>, policy: FailurePolicy) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            policy,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Fetches every week of `window` in order, one request in flight at a time.
    ///
    /// A failed week is logged and then skipped or ends the fetch, depending on
    /// the policy. `on_progress` receives a percentage after every week and
    /// always ends on 100. Each week keeps only gigs inside its own bounds,
    /// and the result is de-duplicated by gig id.
    pub async fn fetch_gigs(
        &self,
        location: &str,
        window: &WeekWindow,
        mut on_progress: impl FnMut(u8),
    ) -> Vec<Gig> {
        let periods = window.periods();
        let total = periods.len();
        let mut gigs = Vec::new();

        for (index, period) in periods.iter().enumerate() {
            match self.fetch_period(location, period).await {
                Ok(week) => {
                    debug!(label = %period.label, count = week.len(), "fetched week");
                    gigs.extend(week);
                }
                Err(err) => {
                    warn!(label = %period.label, from = %period.start, "week fetch failed: {err}");
                    if self.policy == FailurePolicy::Abort {
                        info!(fetched = gigs.len(), "aborting fetch after failed week");
                        on_progress(100);
                        break;
                    }
                }
            }
            on_progress(percent(index + 1, total));
        }

        let gigs = dedupe_by_id(gigs);
        info!(location, count = gigs.len(), weeks = total, "gig fetch finished");
        gigs
    }

    async fn fetch_period(&self, location: &str, period: &Period) -> Result<Vec<Gig>, FetchError> {
        let date_from = period.start.date().to_string();
        let date_to = period.end.date().to_string();

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("location", location),
                ("date_from", date_from.as_str()),
                ("date_to", date_to.as_str()),
            ])
            .send()
            .await
            .map_err(FetchError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let gigs = response.json::<Vec<Gig>>().await.map_err(FetchError::Decode)?;
        Ok(within_period(gigs, period))
    }
}

/// Drops gigs the date-only query returned from outside `[start, end)`.
fn within_period(gigs: Vec<Gig>, period: &Period) -> Vec<Gig> {
    let returned = gigs.len();
    let kept: Vec<Gig> = gigs
        .into_iter()
        .filter(|gig| period.start <= gig.date && gig.date < period.end)
        .collect();
    if kept.len() < returned {
        debug!(label = %period.label, trimmed = returned - kept.len(), "trimmed edge gigs");
    }
    kept
}

fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done * 100) as f64 / total as f64).round().min(100.0) as u8
}

/// Keeps the first occurrence of every gig id.
pub fn dedupe_by_id(gigs: Vec<Gig>) -> Vec<Gig> {
    let mut seen = HashSet::new();
    gigs.into_iter()
        .filter(|gig| seen.insert(gig.id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Venue;
    use chrono::NaiveDate;

    fn gig(id: &str) -> Gig {
        gig_at(id, 20, 20)
    }

    fn gig_at(id: &str, day: u32, hour: u32) -> Gig {
        Gig {
            id: id.to_string(),
            name: format!("gig {id}"),
            date: NaiveDate::from_ymd_opt(2026, 10, day)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
            venue: Venue {
                id: "v1".into(),
                name: "Hall".into(),
            },
            genre_tags: vec![],
        }
    }

    #[test]
    fn dedupe_keeps_first_seen_order() {
        let deduped = dedupe_by_id(vec![gig("b"), gig("a"), gig("b"), gig("c"), gig("a")]);
        let ids: Vec<_> = deduped.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, ["b", "a", "c"]);
    }

    #[test]
    fn period_bounds_are_half_open() {
        let start = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap().and_hms_opt(4, 0, 0).unwrap();
        let period = Period {
            offset: 0,
            start,
            end: start + chrono::Duration::weeks(1),
            label: crate::window::WeekLabel::Current,
        };
        let gigs = vec![
            gig_at("early", 19, 2),
            gig_at("open", 19, 4),
            gig_at("mid", 22, 20),
            gig_at("close", 26, 4),
            gig_at("late", 26, 21),
        ];
        let ids: Vec<_> = within_period(gigs, &period).into_iter().map(|g| g.id).collect();
        assert_eq!(ids, ["open", "mid"]);
    }

    #[test]
    fn percent_rounds_and_caps() {
        assert_eq!(percent(1, 17), 6);
        assert_eq!(percent(17, 17), 100);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(0, 0), 100);
    }
}
