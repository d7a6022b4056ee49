use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Weekday};
use serde::{Serialize, Serializer};
use std::fmt;

const WEEK_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Upper bound on either side of the window, ten years of weeks.
pub const MAX_WEEKS: u32 = 520;

/// Rule that maps an instant to the start of the week containing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodAnchor {
    weekday: Weekday,
    time: NaiveTime,
}

impl PeriodAnchor {
    pub fn new(weekday: Weekday, hour: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, 0, 0).map(|time| Self { weekday, time })
    }

    pub fn weekday(&self) -> Weekday {
        self.weekday
    }

    pub fn hour(&self) -> u32 {
        chrono::Timelike::hour(&self.time)
    }

    /// Latest anchor instant at or before `instant`.
    pub fn start_of(&self, instant: NaiveDateTime) -> NaiveDateTime {
        let date = instant.date();
        let days_back = (7 + date.weekday().num_days_from_monday()
            - self.weekday.num_days_from_monday())
            % 7;
        let start = (date - Duration::days(days_back as i64)).and_time(self.time);
        if start > instant {
            start - Duration::weeks(1)
        } else {
            start
        }
    }
}

impl fmt::Display for PeriodAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let day = match self.weekday {
            Weekday::Mon => "Monday",
            Weekday::Tue => "Tuesday",
            Weekday::Wed => "Wednesday",
            Weekday::Thu => "Thursday",
            Weekday::Fri => "Friday",
            Weekday::Sat => "Saturday",
            Weekday::Sun => "Sunday",
        };
        write!(f, "{day} {}", self.time.format("%H:%M"))
    }
}

impl Default for PeriodAnchor {
    /// Monday 04:00.
    fn default() -> Self {
        Self {
            weekday: Weekday::Mon,
            time: NaiveTime::from_hms_opt(4, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// Column key of the calendar, relative to the current week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeekLabel {
    Current,
    Past(u32),
    Future(u32),
}

impl WeekLabel {
    pub fn from_offset(offset: i64) -> Self {
        match offset {
            0 => WeekLabel::Current,
            n if n < 0 => WeekLabel::Past(n.unsigned_abs() as u32),
            n => WeekLabel::Future(n as u32),
        }
    }

    pub fn offset(&self) -> i64 {
        match *self {
            WeekLabel::Current => 0,
            WeekLabel::Past(n) => -(n as i64),
            WeekLabel::Future(n) => n as i64,
        }
    }

    pub fn is_current(&self) -> bool {
        matches!(self, WeekLabel::Current)
    }
}

impl fmt::Display for WeekLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeekLabel::Current => f.write_str("This week"),
            WeekLabel::Past(n) => write!(f, "-{n}w"),
            WeekLabel::Future(n) => write!(f, "+{n}w"),
        }
    }
}

impl Serialize for WeekLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Period {
    pub offset: i64,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub label: WeekLabel,
}

/// The run of weeks around `now` that gets fetched and rendered.
#[derive(Debug, Clone)]
pub struct WeekWindow {
    weeks_past: u32,
    weeks_future: u32,
    anchor: PeriodAnchor,
    current_start: NaiveDateTime,
}

impl WeekWindow {
    /// Both spans are capped at [`MAX_WEEKS`].
    pub fn new(now: NaiveDateTime, weeks_past: u32, weeks_future: u32, anchor: PeriodAnchor) -> Self {
        Self {
            weeks_past: weeks_past.min(MAX_WEEKS),
            weeks_future: weeks_future.min(MAX_WEEKS),
            anchor,
            current_start: anchor.start_of(now),
        }
    }

    pub fn current_start(&self) -> NaiveDateTime {
        self.current_start
    }

    pub fn len(&self) -> usize {
        self.weeks_past as usize + self.weeks_future as usize + 1
    }

    pub fn first_offset(&self) -> i64 {
        -(self.weeks_past as i64)
    }

    pub fn last_offset(&self) -> i64 {
        self.weeks_future as i64
    }

    pub fn periods(&self) -> Vec<Period> {
        (self.first_offset()..=self.last_offset())
            .map(|offset| {
                let start = self.current_start + Duration::weeks(offset);
                Period {
                    offset,
                    start,
                    end: start + Duration::weeks(1),
                    label: WeekLabel::from_offset(offset),
                }
            })
            .collect()
    }

    pub fn generate_labels(&self) -> Vec<WeekLabel> {
        (self.first_offset()..=self.last_offset())
            .map(WeekLabel::from_offset)
            .collect()
    }

    /// Whole weeks between the instant's period and the current one.
    ///
    /// Rounded rather than truncated so a boundary that drifts by a few
    /// milliseconds still lands on the right week.
    pub fn offset_of(&self, instant: NaiveDateTime) -> i64 {
        let delta = self.anchor.start_of(instant) - self.current_start;
        (delta.num_milliseconds() as f64 / WEEK_MS as f64).round() as i64
    }

    pub fn label_for(&self, instant: NaiveDateTime) -> Option<WeekLabel> {
        let offset = self.offset_of(instant);
        (self.first_offset()..=self.last_offset())
            .contains(&offset)
            .then(|| WeekLabel::from_offset(offset))
    }
}
