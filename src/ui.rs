use crate::aggregate::AggregationCell;
use crate::config::AppConfig;
use crate::models::SnapshotStatus;
use crate::refresh::CalendarSnapshot;
use std::fmt::Write;

pub fn render_index(config: &AppConfig, snapshot: Option<&CalendarSnapshot>, refreshing: bool) -> String {
    let selected = snapshot
        .map(|snapshot| snapshot.location.as_str())
        .unwrap_or(config.default_location());

    let (message, table) = match snapshot {
        None if refreshing => ("Loading data, please wait...".to_string(), String::new()),
        None => ("Press refresh to load gigs.".to_string(), String::new()),
        Some(snapshot) if snapshot.status == SnapshotStatus::NoData => (
            "No gigs found for the selected location.".to_string(),
            String::new(),
        ),
        Some(snapshot) => (String::new(), render_table(snapshot)),
    };

    let generated = snapshot
        .map(|snapshot| {
            let mut note = format!(
                "Updated {} for {}.",
                snapshot.generated_at.format("%Y-%m-%d %H:%M"),
                escape_html(&snapshot.location)
            );
            if snapshot.matrix.dropped > 0 {
                let _ = write!(note, " {} gig(s) fell outside the window.", snapshot.matrix.dropped);
            }
            note
        })
        .unwrap_or_default();

    INDEX_HTML
        .replace("{{LOCATION_OPTIONS}}", &location_options(config, selected))
        .replace("{{MESSAGE}}", &escape_html(&message))
        .replace("{{GENERATED}}", &generated)
        .replace("{{ANCHOR}}", &config.anchor.to_string())
        .replace("{{REFRESHING}}", if refreshing { "true" } else { "false" })
        .replace("{{TABLE}}", &table)
}

fn location_options(config: &AppConfig, selected: &str) -> String {
    config
        .locations
        .iter()
        .map(|location| {
            let marker = if location == selected { " selected" } else { "" };
            let name = escape_html(location);
            format!(
                r#"<option value="{name}"{marker}>{}</option>"#,
                escape_html(&title_case(location))
            )
        })
        .collect()
}

/// Venue rows sorted by owner, then venue name.
fn render_table(snapshot: &CalendarSnapshot) -> String {
    let mut venues: Vec<_> = snapshot.matrix.venues.iter().collect();
    venues.sort_by_cached_key(|venue| {
        (
            snapshot.owner_of(&venue.id).to_lowercase(),
            venue.name.to_lowercase(),
        )
    });

    let mut html = String::from(r#"<table><thead><tr><th class="venue-column">Venue</th>"#);
    for label in &snapshot.matrix.labels {
        let class = if label.is_current() { r#" class="current-week""# } else { "" };
        let _ = write!(html, "<th{class}>{label}</th>");
    }
    html.push_str("</tr></thead><tbody>");

    for venue in venues {
        let _ = write!(
            html,
            r#"<tr data-venue="{}"><td class="venue-column"><span class="venue-name">{}</span><span class="owner">{}</span></td>"#,
            escape_html(&venue.name.to_lowercase()),
            escape_html(&venue.name),
            escape_html(snapshot.owner_of(&venue.id)),
        );
        for cell in &venue.cells {
            html.push_str(&render_cell(snapshot, cell));
        }
        html.push_str("</tr>");
    }

    html.push_str("</tbody></table>");
    html
}

fn render_cell(snapshot: &CalendarSnapshot, cell: &AggregationCell) -> String {
    let mut classes = Vec::new();
    if cell.count > 0 {
        classes.push("busy");
    }
    if cell.label.is_current() {
        classes.push("current-week");
        if cell.has_missing_genres() {
            classes.push("missing-genres");
        }
    }

    if cell.count == 0 {
        return format!(r#"<td class="{}"></td>"#, classes.join(" "));
    }

    let mut tooltip = String::new();
    for gig in &cell.gigs {
        let mut gig_classes = vec!["gig"];
        if gig.missing_genres() {
            gig_classes.push("no-genre");
        }
        if snapshot.is_duplicate(&gig.id) {
            gig_classes.push("duplicate");
        }
        let _ = write!(
            tooltip,
            r#"<span class="{}">{} <small>{}</small></span>"#,
            gig_classes.join(" "),
            escape_html(&gig.name),
            gig.date.format("%a %d %b %H:%M"),
        );
    }

    format!(
        r#"<td class="{}">{}<div class="tooltip">{tooltip}</div></td>"#,
        classes.join(" "),
        cell.count,
    )
}

fn title_case(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    }
}

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Gig Calendar</title>
  <style>
    @import url('https://fonts.googleapis.com/css2?family=Space+Grotesk:wght@400;500;600&family=Fraunces:wght@600&display=swap');

    :root {
      --bg-1: #f8f3e6;
      --bg-2: #f5d3a7;
      --ink: #2b2a28;
      --accent: #ff6b4a;
      --accent-2: #2f4858;
      --busy: #c8faed;
      --card: rgba(255, 255, 255, 0.9);
      --shadow: 0 24px 60px rgba(47, 72, 88, 0.18);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: radial-gradient(circle at top, var(--bg-2), transparent 60%),
        linear-gradient(135deg, var(--bg-1), #ffe9d4 60%, #f9f2e9 100%);
      color: var(--ink);
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
      padding: 32px 18px 48px;
    }

    .app {
      max-width: 1400px;
      margin: 0 auto;
      background: var(--card);
      border-radius: 28px;
      box-shadow: var(--shadow);
      padding: 32px;
      display: grid;
      gap: 20px;
    }

    h1 {
      font-family: "Fraunces", "Georgia", serif;
      font-weight: 600;
      font-size: clamp(1.8rem, 4vw, 2.6rem);
      margin: 0;
      text-align: center;
    }

    .toolbar {
      display: flex;
      flex-wrap: wrap;
      gap: 12px;
      align-items: center;
      justify-content: space-between;
    }

    .toolbar .group {
      display: flex;
      gap: 8px;
      align-items: center;
    }

    select, input {
      font: inherit;
      padding: 8px 12px;
      border-radius: 12px;
      border: 1px solid rgba(47, 72, 88, 0.2);
    }

    button {
      appearance: none;
      border: none;
      border-radius: 999px;
      padding: 10px 18px;
      font: inherit;
      font-weight: 600;
      cursor: pointer;
      color: white;
      background: var(--accent-2);
    }

    button.primary {
      background: var(--accent);
    }

    button:disabled {
      opacity: 0.5;
      cursor: wait;
    }

    .progress {
      display: none;
      gap: 10px;
      align-items: center;
    }

    .progress.active {
      display: flex;
    }

    .progress .bar {
      flex: 1;
      height: 10px;
      border-radius: 999px;
      background: rgba(47, 72, 88, 0.1);
      overflow: hidden;
    }

    .progress .fill {
      height: 100%;
      width: 0;
      background: var(--accent);
      transition: width 200ms ease;
    }

    .message {
      color: #c63b2b;
      min-height: 1.2em;
      margin: 0;
    }

    .hint {
      margin: 0;
      color: #6f6a65;
      font-size: 0.9rem;
    }

    .table-wrap {
      overflow-x: auto;
    }

    table {
      border-collapse: collapse;
      width: 100%;
      font-size: 0.9rem;
    }

    th, td {
      border: 1px solid rgba(47, 72, 88, 0.12);
      padding: 4px 8px;
      text-align: center;
      position: relative;
      background: white;
    }

    th.venue-column, td.venue-column {
      text-align: left;
      white-space: nowrap;
    }

    td.venue-column .owner {
      display: block;
      font-size: 0.75rem;
      color: #8b857d;
    }

    td.busy {
      background: var(--busy);
    }

    th.current-week, td.current-week {
      outline: 2px solid var(--accent-2);
      font-weight: 600;
    }

    td.missing-genres {
      color: red;
    }

    .tooltip {
      display: none;
      position: absolute;
      top: 100%;
      left: 0;
      z-index: 10;
      min-width: 220px;
      padding: 8px 10px;
      border-radius: 10px;
      background: white;
      box-shadow: var(--shadow);
      text-align: left;
      font-weight: 400;
      color: black;
    }

    td:hover .tooltip {
      display: grid;
      gap: 4px;
    }

    .gig.no-genre {
      color: red;
    }

    .gig.duplicate {
      background: #fff3b0;
    }

    .gig small {
      color: #8b857d;
    }
  </style>
</head>
<body>
  <main class="app">
    <h1>Gig Calendar</h1>

    <section class="toolbar">
      <div class="group">
        <label for="location-select">Location</label>
        <select id="location-select">{{LOCATION_OPTIONS}}</select>
        <button class="primary" id="refresh-button" type="button">Refresh</button>
      </div>
      <div class="group">
        <input id="filter-input" type="search" placeholder="Filter venues" />
        <button id="clear-filter-button" type="button">Clear</button>
      </div>
    </section>

    <div class="progress" id="progress">
      <div class="bar"><div class="fill" id="progress-fill"></div></div>
      <span id="progress-count">0%</span>
    </div>

    <p class="message" id="message">{{MESSAGE}}</p>
    <p class="hint">{{GENERATED}} Weeks start {{ANCHOR}}. Red names have no genre tags; highlighted names look like duplicates.</p>

    <div class="table-wrap" id="gig-table">{{TABLE}}</div>
  </main>

  <script>
    const locationSelect = document.getElementById('location-select');
    const refreshButton = document.getElementById('refresh-button');
    const filterInput = document.getElementById('filter-input');
    const clearButton = document.getElementById('clear-filter-button');
    const progressEl = document.getElementById('progress');
    const progressFill = document.getElementById('progress-fill');
    const progressCount = document.getElementById('progress-count');
    const messageEl = document.getElementById('message');

    const setProgress = (percent) => {
      progressFill.style.width = `${percent}%`;
      progressCount.textContent = `${percent}%`;
    };

    const pollProgress = async () => {
      progressEl.classList.add('active');
      while (true) {
        const res = await fetch('/api/progress');
        if (!res.ok) {
          return;
        }
        const data = await res.json();
        setProgress(data.percent);
        if (!data.refreshing) {
          return;
        }
        await new Promise((resolve) => setTimeout(resolve, 400));
      }
    };

    const applyFilter = () => {
      const text = filterInput.value.trim().toLowerCase();
      document.querySelectorAll('tbody tr').forEach((row) => {
        row.style.display = row.dataset.venue.includes(text) ? '' : 'none';
      });
    };

    const refresh = async () => {
      refreshButton.disabled = true;
      messageEl.textContent = 'Loading data, please wait...';
      setProgress(0);
      const polling = pollProgress();
      const res = await fetch('/api/refresh', {
        method: 'POST',
        headers: { 'content-type': 'application/json' },
        body: JSON.stringify({ location: locationSelect.value })
      });
      await polling;

      if (res.status === 409) {
        messageEl.textContent = 'A refresh is already running.';
        refreshButton.disabled = false;
        return;
      }
      if (!res.ok) {
        messageEl.textContent = (await res.text()) || 'Refresh failed';
        refreshButton.disabled = false;
        return;
      }
      window.location.reload();
    };

    filterInput.addEventListener('input', applyFilter);
    clearButton.addEventListener('click', () => {
      filterInput.value = '';
      applyFilter();
    });
    refreshButton.addEventListener('click', () => {
      refresh().catch((err) => {
        messageEl.textContent = err.message;
        refreshButton.disabled = false;
      });
    });

    if ({{REFRESHING}}) {
      refreshButton.disabled = true;
      pollProgress().then(() => window.location.reload());
    }
  </script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::duplicates::find_duplicates;
    use crate::models::{Gig, Venue};
    use crate::owners::parse_owner_table;
    use crate::window::{PeriodAnchor, WeekWindow};
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn gig(id: &str, venue: (&str, &str), date: NaiveDateTime, genres: &[&str]) -> Gig {
        Gig {
            id: id.into(),
            name: format!("Show <{id}>"),
            date,
            venue: Venue {
                id: venue.0.into(),
                name: venue.1.into(),
            },
            genre_tags: genres.iter().map(|g| g.to_string()).collect(),
        }
    }

    fn snapshot(gigs: &[Gig], status: SnapshotStatus) -> CalendarSnapshot {
        let window = WeekWindow::new(at(21, 12), 1, 1, PeriodAnchor::default());
        let matrix = aggregate(gigs, &window);
        CalendarSnapshot {
            location: "melbourne".into(),
            generated_at: at(21, 12),
            status,
            duplicates: find_duplicates(&matrix),
            matrix,
            owners: parse_owner_table("id,owner\nz,Alpha Group\na,Zed Corp\n"),
        }
    }

    #[test]
    fn empty_state_prompts_for_refresh() {
        let html = render_index(&AppConfig::default(), None, false);
        assert!(html.contains("Press refresh to load gigs."));
        assert!(html.contains(r#"<option value="melbourne" selected>Melbourne</option>"#));
        assert!(!html.contains("<table>"));
    }

    #[test]
    fn no_data_snapshot_shows_message() {
        let snapshot = snapshot(&[], SnapshotStatus::NoData);
        let html = render_index(&AppConfig::default(), Some(&snapshot), false);
        assert!(html.contains("No gigs found for the selected location."));
    }

    #[test]
    fn table_is_sorted_by_owner_and_escaped() {
        let gigs = [
            gig("1", ("a", "Alpha Hall"), at(20, 20), &["rock"]),
            gig("2", ("z", "Zulu Bar"), at(20, 20), &[]),
        ];
        let snapshot = snapshot(&gigs, SnapshotStatus::Ready);
        let html = render_index(&AppConfig::default(), Some(&snapshot), false);

        let zulu = html.find("Zulu Bar").unwrap();
        let alpha = html.find("Alpha Hall").unwrap();
        assert!(zulu < alpha, "Alpha Group owns Zulu Bar and sorts first");
        assert!(html.contains("Show &lt;1&gt;"));
        assert!(!html.contains("Show <1>"));
        assert!(html.contains("busy current-week missing-genres"));
        assert!(html.contains(r#"<th class="current-week">This week</th>"#));
        assert!(html.contains("<th>-1w</th>"));
    }

    #[test]
    fn hint_names_the_configured_anchor() {
        assert!(render_index(&AppConfig::default(), None, false).contains("Weeks start Monday 04:00."));

        let config = AppConfig {
            anchor: PeriodAnchor::new(chrono::Weekday::Fri, 18).unwrap(),
            ..AppConfig::default()
        };
        let html = render_index(&config, None, false);
        assert!(html.contains("Weeks start Friday 18:00."));
        assert!(!html.contains("Monday 04:00"));
    }

    #[test]
    fn escape_html_covers_attribute_characters() {
        assert_eq!(escape_html(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    }
}
