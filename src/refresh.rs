use crate::aggregate::{aggregate, CalendarMatrix};
use crate::duplicates::{find_duplicates, DuplicateGroup};
use crate::errors::RefreshError;
use crate::models::{CalendarResponse, SnapshotStatus, VenueResponse};
use crate::owners::{fetch_owner_map, VenueOwnerMap};
use crate::state::AppState;
use crate::window::WeekWindow;
use chrono::NaiveDateTime;
use std::sync::{atomic::Ordering, Arc};
use tracing::info;

/// Everything one refresh produced. Replaced whole by the next refresh.
#[derive(Debug)]
pub struct CalendarSnapshot {
    pub location: String,
    pub generated_at: NaiveDateTime,
    pub status: SnapshotStatus,
    pub matrix: CalendarMatrix,
    pub owners: VenueOwnerMap,
    pub duplicates: Vec<DuplicateGroup>,
}

impl CalendarSnapshot {
    pub fn owner_of(&self, venue_id: &str) -> &str {
        self.owners.owner_of(venue_id)
    }

    pub fn is_duplicate(&self, gig_id: &str) -> bool {
        self.duplicates
            .iter()
            .any(|group| group.gig_ids.iter().any(|id| id == gig_id))
    }

    pub fn to_response(&self) -> CalendarResponse {
        CalendarResponse {
            location: self.location.clone(),
            generated_at: self.generated_at,
            status: self.status,
            labels: self.matrix.labels.clone(),
            venues: self
                .matrix
                .venues
                .iter()
                .map(|venue| VenueResponse {
                    id: venue.id.clone(),
                    name: venue.name.clone(),
                    owner: self.owner_of(&venue.id).to_string(),
                    total: venue.total(),
                    cells: venue.cells.clone(),
                })
                .collect(),
            dropped: self.matrix.dropped,
            duplicates: self.duplicates.clone(),
        }
    }
}

#[derive(Debug)]
pub enum RefreshOutcome {
    Ready(Arc<CalendarSnapshot>),
    /// The fetch completed but nothing landed in the window.
    NoData(Arc<CalendarSnapshot>),
}

impl RefreshOutcome {
    pub fn snapshot(&self) -> &Arc<CalendarSnapshot> {
        match self {
            RefreshOutcome::Ready(snapshot) | RefreshOutcome::NoData(snapshot) => snapshot,
        }
    }
}

/// Rebuilds the calendar for `location` as of `now`.
///
/// Only one refresh runs at a time; a second caller gets
/// [`RefreshError::InProgress`] instead of waiting.
pub async fn refresh(
    state: &AppState,
    location: &str,
    now: NaiveDateTime,
) -> Result<RefreshOutcome, RefreshError> {
    if !state.config.knows_location(location) {
        return Err(RefreshError::UnknownLocation(location.to_string()));
    }
    let _guard = state.try_begin_refresh().ok_or(RefreshError::InProgress)?;

    let config = &state.config;
    state.progress.store(0, Ordering::Relaxed);
    let window = WeekWindow::new(now, config.weeks_past, config.weeks_future, config.anchor);
    info!(
        location,
        weeks = window.len(),
        from = %window.current_start(),
        "refreshing gig calendar"
    );

    let progress = Arc::clone(&state.progress);
    let gigs = state.fetcher.fetch_gigs(location, &window, move |percent| {
        progress.store(percent, Ordering::Relaxed);
    });
    let owners = async {
        match &config.owners_csv_url {
            Some(url) => fetch_owner_map(state.fetcher.client(), url).await,
            None => VenueOwnerMap::default(),
        }
    };
    let (gigs, owners) = tokio::join!(gigs, owners);

    let matrix = aggregate(&gigs, &window);
    let duplicates = find_duplicates(&matrix);
    let status = if matrix.is_empty() {
        SnapshotStatus::NoData
    } else {
        SnapshotStatus::Ready
    };
    info!(
        location,
        venues = matrix.venues.len(),
        gigs = matrix.total(),
        dropped = matrix.dropped,
        duplicates = duplicates.len(),
        "gig calendar rebuilt"
    );

    let snapshot = Arc::new(CalendarSnapshot {
        location: location.to_string(),
        generated_at: now,
        status,
        matrix,
        owners,
        duplicates,
    });
    *state.snapshot.lock().await = Some(Arc::clone(&snapshot));
    state.progress.store(100, Ordering::Relaxed);

    Ok(match status {
        SnapshotStatus::Ready => RefreshOutcome::Ready(snapshot),
        SnapshotStatus::NoData => RefreshOutcome::NoData(snapshot),
    })
}
