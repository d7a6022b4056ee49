use crate::models::{Gig, GigSummary};
use crate::window::{WeekLabel, WeekWindow};
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AggregationCell {
    pub label: WeekLabel,
    pub count: u64,
    pub gigs: Vec<GigSummary>,
}

impl AggregationCell {
    fn empty(label: WeekLabel) -> Self {
        Self {
            label,
            count: 0,
            gigs: Vec::new(),
        }
    }

    pub fn has_missing_genres(&self) -> bool {
        self.gigs.iter().any(GigSummary::missing_genres)
    }
}

/// One venue's row, with a cell for every label of the window in window order.
#[derive(Debug, Clone, Serialize)]
pub struct VenueRow {
    pub id: String,
    pub name: String,
    pub cells: Vec<AggregationCell>,
}

impl VenueRow {
    pub fn cell(&self, label: WeekLabel) -> Option<&AggregationCell> {
        self.cells.iter().find(|cell| cell.label == label)
    }

    pub fn total(&self) -> u64 {
        self.cells.iter().map(|cell| cell.count).sum()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CalendarMatrix {
    pub labels: Vec<WeekLabel>,
    pub venues: Vec<VenueRow>,
    /// Gigs whose week fell outside the window.
    pub dropped: u64,
}

impl CalendarMatrix {
    pub fn venue(&self, id: &str) -> Option<&VenueRow> {
        self.venues.iter().find(|venue| venue.id == id)
    }

    pub fn total(&self) -> u64 {
        self.venues.iter().map(VenueRow::total).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.venues.is_empty()
    }
}

/// Buckets gigs into a venue x week matrix.
pub fn aggregate(gigs: &[Gig], window: &WeekWindow) -> CalendarMatrix {
    let labels = window.generate_labels();
    let column: HashMap<WeekLabel, usize> = labels
        .iter()
        .enumerate()
        .map(|(index, label)| (*label, index))
        .collect();

    let mut venues: Vec<VenueRow> = Vec::new();
    let mut rows: HashMap<&str, usize> = HashMap::new();
    let mut dropped = 0u64;

    for gig in gigs {
        let Some(&index) = window.label_for(gig.date).and_then(|label| column.get(&label)) else {
            dropped += 1;
            warn!(
                gig_id = %gig.id,
                venue_id = %gig.venue.id,
                date = %gig.date,
                offset = window.offset_of(gig.date),
                "gig outside the week window, dropped"
            );
            continue;
        };

        let row = *rows.entry(gig.venue.id.as_str()).or_insert_with(|| {
            venues.push(VenueRow {
                id: gig.venue.id.clone(),
                name: gig.venue.name.clone(),
                cells: labels.iter().copied().map(AggregationCell::empty).collect(),
            });
            venues.len() - 1
        });

        let cell = &mut venues[row].cells[index];
        cell.count += 1;
        cell.gigs.push(GigSummary::from(gig));
    }

    CalendarMatrix {
        labels,
        venues,
        dropped,
    }
}
