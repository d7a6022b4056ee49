//! Flags gigs inside one calendar cell that are probably the same event
//! listed twice. Display aid only: counts are never adjusted.

use crate::aggregate::CalendarMatrix;
use crate::models::GigSummary;
use crate::window::WeekLabel;
use chrono::Duration;
use serde::Serialize;

const NAME_SIMILARITY: f64 = 0.8;
const MAX_START_GAP_HOURS: i64 = 3;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub venue_id: String,
    pub label: WeekLabel,
    pub gig_ids: Vec<String>,
}

pub fn find_duplicates(matrix: &CalendarMatrix) -> Vec<DuplicateGroup> {
    let mut groups = Vec::new();
    for venue in &matrix.venues {
        for cell in venue.cells.iter().filter(|cell| cell.gigs.len() > 1) {
            for members in group_similar(&cell.gigs) {
                groups.push(DuplicateGroup {
                    venue_id: venue.id.clone(),
                    label: cell.label,
                    gig_ids: members.iter().map(|&i| cell.gigs[i].id.clone()).collect(),
                });
            }
        }
    }
    groups
}

fn looks_alike(a: &GigSummary, b: &GigSummary) -> bool {
    let gap = (a.date - b.date).abs();
    if gap > Duration::hours(MAX_START_GAP_HOURS) {
        return false;
    }
    let a = a.name.trim().to_lowercase();
    let b = b.name.trim().to_lowercase();
    strsim::normalized_levenshtein(&a, &b) >= NAME_SIMILARITY
}

/// Connected components of the `looks_alike` relation, size two or more.
fn group_similar(gigs: &[GigSummary]) -> Vec<Vec<usize>> {
    let mut parent: Vec<usize> = (0..gigs.len()).collect();

    fn root(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for i in 0..gigs.len() {
        for j in i + 1..gigs.len() {
            if looks_alike(&gigs[i], &gigs[j]) {
                let (a, b) = (root(&mut parent, i), root(&mut parent, j));
                if a != b {
                    parent[b] = a;
                }
            }
        }
    }

    let mut components: Vec<(usize, Vec<usize>)> = Vec::new();
    for i in 0..gigs.len() {
        let r = root(&mut parent, i);
        match components.iter_mut().find(|(key, _)| *key == r) {
            Some((_, members)) => members.push(i),
            None => components.push((r, vec![i])),
        }
    }

    components
        .into_iter()
        .map(|(_, members)| members)
        .filter(|members| members.len() > 1)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::models::{Gig, Venue};
    use crate::window::{PeriodAnchor, WeekWindow};
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn gig(id: &str, name: &str, date: NaiveDateTime) -> Gig {
        Gig {
            id: id.into(),
            name: name.into(),
            date,
            venue: Venue {
                id: "v1".into(),
                name: "Hall".into(),
            },
            genre_tags: vec!["rock".into()],
        }
    }

    fn matrix(gigs: &[Gig]) -> CalendarMatrix {
        let window = WeekWindow::new(at(21, 12), 1, 1, PeriodAnchor::default());
        aggregate(gigs, &window)
    }

    #[test]
    fn near_identical_names_close_in_time_are_grouped() {
        let gigs = [
            gig("1", "The Smiths Tribute", at(22, 20)),
            gig("2", "the smiths tribute!", at(22, 21)),
            gig("3", "Open Mic", at(22, 20)),
        ];
        let groups = find_duplicates(&matrix(&gigs));
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].gig_ids, ["1", "2"]);
        assert_eq!(groups[0].label, WeekLabel::Current);
    }

    #[test]
    fn same_name_on_different_nights_is_not_a_duplicate() {
        let gigs = [
            gig("1", "Residency", at(20, 20)),
            gig("2", "Residency", at(23, 20)),
        ];
        assert!(find_duplicates(&matrix(&gigs)).is_empty());
    }

    #[test]
    fn annotation_leaves_counts_alone() {
        let gigs = [gig("1", "Band", at(22, 20)), gig("2", "Band", at(22, 20))];
        let matrix = matrix(&gigs);
        let groups = find_duplicates(&matrix);
        assert_eq!(groups.len(), 1);
        assert_eq!(matrix.venue("v1").unwrap().total(), 2);
    }
}
