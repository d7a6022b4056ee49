use reqwest::Client;
use std::collections::HashMap;
use std::mem::take;
use tracing::{error, info, warn};

pub const UNKNOWN_OWNER: &str = "Unknown";

const ID_HEADERS: [&str; 4] = ["id", "venue id", "venue_id", "venueid"];
const OWNER_HEADERS: [&str; 2] = ["owner", "venue owner"];

/// Venue id to owner display name. Ids are compared trimmed and lower-cased.
#[derive(Debug, Clone, Default)]
pub struct VenueOwnerMap {
    owners: HashMap<String, String>,
}

impl VenueOwnerMap {
    pub fn insert(&mut self, venue_id: &str, owner: impl Into<String>) {
        self.owners.insert(normalize_id(venue_id), owner.into());
    }

    pub fn owner_of(&self, venue_id: &str) -> &str {
        self.owners
            .get(&normalize_id(venue_id))
            .map(String::as_str)
            .unwrap_or(UNKNOWN_OWNER)
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

pub fn normalize_id(venue_id: &str) -> String {
    venue_id.trim().to_lowercase()
}

/// Downloads and parses the owner table. Any failure degrades to an empty map.
pub async fn fetch_owner_map(client: &Client, url: &str) -> VenueOwnerMap {
    let body = match client.get(url).send().await {
        Ok(response) if response.status().is_success() => response.text().await,
        Ok(response) => {
            error!(url, status = %response.status(), "owner table request rejected");
            return VenueOwnerMap::default();
        }
        Err(err) => Err(err),
    };

    match body {
        Ok(text) => {
            let owners = parse_owner_table(&text);
            info!(url, entries = owners.len(), "loaded venue owners");
            owners
        }
        Err(err) => {
            error!(url, "failed to fetch owner table: {err}");
            VenueOwnerMap::default()
        }
    }
}

/// Builds the owner map from CSV text whose header is on the first or second row.
pub fn parse_owner_table(text: &str) -> VenueOwnerMap {
    let rows = parse_rows(text);
    let mut owners = VenueOwnerMap::default();

    let header = rows
        .iter()
        .take(2)
        .enumerate()
        .find_map(|(index, row)| locate_columns(row).map(|columns| (index, columns)));

    let Some((header_index, (id_col, owner_col))) = header else {
        warn!("owner table has no id/owner header; all owners will be unknown");
        return owners;
    };

    for row in rows.iter().skip(header_index + 1) {
        let id = row.get(id_col).map(|cell| cell.trim()).unwrap_or_default();
        let owner = row.get(owner_col).map(|cell| cell.trim()).unwrap_or_default();
        if id.is_empty() || owner.is_empty() {
            continue;
        }
        owners.insert(id, owner);
    }
    owners
}

fn locate_columns(row: &[String]) -> Option<(usize, usize)> {
    let find = |names: &[&str]| {
        row.iter().position(|cell| {
            let cell = cell.trim().to_lowercase();
            names.iter().any(|name| *name == cell)
        })
    };
    Some((find(&ID_HEADERS[..])?, find(&OWNER_HEADERS[..])?))
}

/// Comma-separated rows. Quoted fields may hold commas, `""` and newlines.
pub fn parse_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => row.push(take(&mut field)),
            '\r' | '\n' if !in_quotes => {
                if ch == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                row.push(take(&mut field));
                push_row(&mut rows, take(&mut row));
            }
            _ => field.push(ch),
        }
    }

    row.push(field);
    push_row(&mut rows, row);
    rows
}

fn push_row(rows: &mut Vec<Vec<String>>, row: Vec<String>) {
    let blank = row.iter().all(|cell| cell.trim().is_empty());
    if !blank {
        rows.push(row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case_and_whitespace() {
        let owners = parse_owner_table("id,owner\n V1 ,Acme Live\n");
        assert_eq!(owners.owner_of("v1"), "Acme Live");
        assert_eq!(owners.owner_of(" V1 "), owners.owner_of("v1"));
        assert_eq!(owners.owner_of("v2"), UNKNOWN_OWNER);
    }

    #[test]
    fn header_may_be_on_second_row_in_any_order() {
        let text = "Venue owners export,,\nNotes,Owner,Venue ID\n\"multi\nline\",\"Smith, J\",abc\n";
        let owners = parse_owner_table(text);
        assert_eq!(owners.len(), 1);
        assert_eq!(owners.owner_of("ABC"), "Smith, J");
    }

    #[test]
    fn missing_columns_give_empty_map() {
        let owners = parse_owner_table("name,city\nHall,Melbourne\n");
        assert!(owners.is_empty());
        assert_eq!(owners.owner_of("anything"), UNKNOWN_OWNER);
        assert!(parse_owner_table("").is_empty());
    }

    #[test]
    fn rows_with_blank_cells_are_skipped() {
        let owners = parse_owner_table("id,owner\r\nv1,\r\n,Nobody\r\nv2,Someone\r\n");
        assert_eq!(owners.len(), 1);
        assert_eq!(owners.owner_of("v2"), "Someone");
    }

    #[test]
    fn parse_rows_handles_escaped_quotes_and_crlf() {
        let rows = parse_rows("a,\"b \"\"quoted\"\"\",c\r\n\r\nd,e,f");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][1], "b \"quoted\"");
        assert_eq!(rows[1], ["d", "e", "f"]);
    }
}
