use chrono::{Duration, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_DAY_START: TimeOfDay = TimeOfDay(8 * 60);
pub const DEFAULT_DAY_END: TimeOfDay = TimeOfDay(18 * 60);
pub const DEFAULT_SLOT_MINUTES: u32 = 30;
/// Length given to a task scheduled from the cursor or from a single "HH:MM".
pub const DEFAULT_TASK_MINUTES: i64 = 60;

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Wall-clock time with minute resolution, always within a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Priority {
    #[default]
    None,
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TaskRecord", into = "TaskRecord")]
pub struct Task {
    pub title: String,
    pub description: String,
    pub complete: bool,
    pub priority: Priority,
    pub schedule: Option<TimeRange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TimelineConfigRecord", into = "TimelineConfigRecord")]
pub struct TimelineConfig {
    pub day_start: TimeOfDay,
    pub day_end: TimeOfDay,
    pub slot_minutes: u32,
    pub move_minutes: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timeline: TimelineConfig,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeParseError {
    #[error("invalid time {0:?} (use HH:MM or HH:MM-HH:MM)")]
    InvalidFormat(String),
    #[error("end {end} must be after start {start}")]
    EndNotAfterStart { start: TimeOfDay, end: TimeOfDay },
    #[error("{start} plus {minutes} minutes runs past midnight")]
    PastMidnight { start: TimeOfDay, minutes: i64 },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("no task {index} on {date} ({len} tasks)")]
    IndexOutOfRange {
        date: NaiveDate,
        index: usize,
        len: usize,
    },
    #[error("task {0} has no scheduled time")]
    NotScheduled(usize),
    #[error("task must last at least {0} minutes")]
    MinimumDuration(u32),
    #[error("time would fall outside {lower}-{upper}")]
    OutOfBounds { lower: TimeOfDay, upper: TimeOfDay },
    #[error("task title cannot be empty")]
    EmptyTitle,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {field}: {source}")]
    InvalidTime {
        field: &'static str,
        source: TimeParseError,
    },
    #[error("day_start {start} is not before day_end {end}")]
    EmptyDay { start: TimeOfDay, end: TimeOfDay },
    #[error("slot_minutes must be greater than zero")]
    ZeroSlot,
    #[error("move_minutes must be greater than zero")]
    ZeroMove,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid priority {0} (expected none, low, medium or high)")]
pub struct InvalidPriority(pub String);

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);
    pub const LAST_MINUTE: TimeOfDay = TimeOfDay((MINUTES_PER_DAY - 1) as u16);

    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(TimeOfDay((hour * 60 + minute) as u16))
        } else {
            None
        }
    }

    pub fn from_minutes(minutes: i64) -> Option<Self> {
        if (0..MINUTES_PER_DAY).contains(&minutes) {
            Some(TimeOfDay(minutes as u16))
        } else {
            None
        }
    }

    pub fn minutes(self) -> i64 {
        i64::from(self.0)
    }

    pub fn hour(self) -> u32 {
        u32::from(self.0) / 60
    }

    pub fn minute(self) -> u32 {
        u32::from(self.0) % 60
    }

    /// `None` when the result would leave `[00:00, 23:59]`.
    pub fn checked_add_minutes(self, delta: i64) -> Option<Self> {
        Self::from_minutes(self.minutes().checked_add(delta)?)
    }

    /// Signed minutes from `self` to `later`.
    pub fn minutes_until(self, later: TimeOfDay) -> i64 {
        later.minutes() - self.minutes()
    }

    /// Parses exactly "HH:MM".
    pub fn parse(input: &str) -> Result<Self, TimeParseError> {
        let invalid = || TimeParseError::InvalidFormat(input.to_string());
        let bytes = input.as_bytes();
        let shaped = bytes.len() == 5
            && bytes[2] == b':'
            && [0, 1, 3, 4].iter().all(|&i| bytes[i].is_ascii_digit());
        if !shaped {
            return Err(invalid());
        }
        let time = NaiveTime::parse_from_str(input, "%H:%M").map_err(|_| invalid())?;
        Self::from_hm(time.hour(), time.minute()).ok_or_else(invalid)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for TimeOfDay {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        TimeOfDay::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl TimeRange {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        TimeRange { start, end }
    }

    /// Parses "HH:MM" (one hour long) or "HH:MM-HH:MM".
    pub fn parse(input: &str) -> Result<Self, TimeParseError> {
        let trimmed = input.trim();
        match trimmed.split_once('-') {
            Some((start, end)) => {
                let start = TimeOfDay::parse(start.trim())?;
                let end = TimeOfDay::parse(end.trim())?;
                if end <= start {
                    return Err(TimeParseError::EndNotAfterStart { start, end });
                }
                Ok(TimeRange { start, end })
            }
            None => {
                let start = TimeOfDay::parse(trimmed)?;
                Self::starting_at(start, DEFAULT_TASK_MINUTES)
            }
        }
    }

    pub fn starting_at(start: TimeOfDay, minutes: i64) -> Result<Self, TimeParseError> {
        let end = start
            .checked_add_minutes(minutes)
            .ok_or(TimeParseError::PastMidnight { start, minutes })?;
        Ok(TimeRange { start, end })
    }

    pub fn minutes(&self) -> i64 {
        self.start.minutes_until(self.end)
    }

    pub fn contains(&self, time: TimeOfDay) -> bool {
        self.start <= time && time < self.end
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl Priority {
    pub fn label(&self) -> &'static str {
        match self {
            Priority::None => "None",
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Priority::None => "",
            Priority::Low => "!",
            Priority::Medium => "!!",
            Priority::High => "!!!",
        }
    }

    pub fn cycle(self) -> Self {
        match self {
            Priority::None => Priority::Low,
            Priority::Low => Priority::Medium,
            Priority::Medium => Priority::High,
            Priority::High => Priority::None,
        }
    }
}

impl TryFrom<u8> for Priority {
    type Error = InvalidPriority;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Priority::None),
            1 => Ok(Priority::Low),
            2 => Ok(Priority::Medium),
            3 => Ok(Priority::High),
            other => Err(InvalidPriority(other.to_string())),
        }
    }
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> u8 {
        priority as u8
    }
}

impl FromStr for Priority {
    type Err = InvalidPriority;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "0" => Ok(Priority::None),
            "low" | "1" => Ok(Priority::Low),
            "medium" | "2" => Ok(Priority::Medium),
            "high" | "3" => Ok(Priority::High),
            _ => Err(InvalidPriority(s.to_string())),
        }
    }
}

impl Task {
    pub fn new(title: impl Into<String>) -> Self {
        Task {
            title: title.into(),
            description: String::new(),
            complete: false,
            priority: Priority::None,
            schedule: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn scheduled(mut self, range: TimeRange) -> Self {
        self.schedule = Some(range);
        self
    }

    pub fn is_scheduled(&self) -> bool {
        self.schedule.is_some()
    }

    pub fn start_time(&self) -> Option<TimeOfDay> {
        self.schedule.map(|r| r.start)
    }

    pub fn end_time(&self) -> Option<TimeOfDay> {
        self.schedule.map(|r| r.end)
    }

    /// Zero for unscheduled tasks.
    pub fn duration(&self) -> Duration {
        self.schedule
            .map(|r| Duration::minutes(r.minutes()))
            .unwrap_or_else(Duration::zero)
    }

    pub fn is_overdue(&self, date: NaiveDate, today: NaiveDate) -> bool {
        !self.complete && date < today
    }
}

#[derive(Serialize, Deserialize)]
struct TaskRecord {
    title: String,
    #[serde(default)]
    desc: String,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end_time: Option<String>,
}

impl From<TaskRecord> for Task {
    fn from(record: TaskRecord) -> Self {
        let schedule = match (&record.start_time, &record.end_time) {
            (None, None) => None,
            (Some(start), Some(end)) => match (TimeOfDay::parse(start), TimeOfDay::parse(end)) {
                (Ok(start), Ok(end)) => Some(TimeRange { start, end }),
                _ => {
                    warn!(title = %record.title, %start, %end, "unparsable task times, treating as unscheduled");
                    None
                }
            },
            _ => {
                warn!(title = %record.title, "task has only one of start/end time, treating as unscheduled");
                None
            }
        };
        Task {
            title: record.title,
            description: record.desc,
            complete: record.completed,
            priority: record.priority,
            schedule,
        }
    }
}

impl From<Task> for TaskRecord {
    fn from(task: Task) -> Self {
        TaskRecord {
            title: task.title,
            desc: task.description,
            completed: task.complete,
            priority: task.priority,
            start_time: task.schedule.map(|r| r.start.to_string()),
            end_time: task.schedule.map(|r| r.end.to_string()),
        }
    }
}

impl Default for TimelineConfig {
    fn default() -> Self {
        TimelineConfig {
            day_start: DEFAULT_DAY_START,
            day_end: DEFAULT_DAY_END,
            slot_minutes: DEFAULT_SLOT_MINUTES,
            move_minutes: DEFAULT_SLOT_MINUTES,
        }
    }
}

impl TimelineConfig {
    /// First problem that leaves the timeline unusable, if any.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.day_start >= self.day_end {
            return Err(ConfigError::EmptyDay {
                start: self.day_start,
                end: self.day_end,
            });
        }
        if self.slot_minutes == 0 {
            return Err(ConfigError::ZeroSlot);
        }
        if self.move_minutes == 0 {
            return Err(ConfigError::ZeroMove);
        }
        Ok(())
    }

    pub fn day_minutes(&self) -> i64 {
        self.day_start.minutes_until(self.day_end)
    }
}

#[derive(Serialize, Deserialize)]
struct TimelineConfigRecord {
    #[serde(default)]
    day_start: String,
    #[serde(default)]
    day_end: String,
    #[serde(default)]
    slot_minutes: u32,
    #[serde(default)]
    move_minutes: u32,
}

impl TryFrom<TimelineConfigRecord> for TimelineConfig {
    type Error = ConfigError;

    fn try_from(record: TimelineConfigRecord) -> Result<Self, Self::Error> {
        let time_or = |field: &'static str, raw: &str, fallback: TimeOfDay| {
            if raw.trim().is_empty() {
                Ok(fallback)
            } else {
                TimeOfDay::parse(raw.trim())
                    .map_err(|source| ConfigError::InvalidTime { field, source })
            }
        };
        let day_start = time_or("day_start", &record.day_start, DEFAULT_DAY_START)?;
        let day_end = time_or("day_end", &record.day_end, DEFAULT_DAY_END)?;
        let slot_minutes = match record.slot_minutes {
            0 => DEFAULT_SLOT_MINUTES,
            n => n,
        };
        let move_minutes = match record.move_minutes {
            0 => slot_minutes,
            n => n,
        };
        Ok(TimelineConfig {
            day_start,
            day_end,
            slot_minutes,
            move_minutes,
        })
    }
}

impl From<TimelineConfig> for TimelineConfigRecord {
    fn from(config: TimelineConfig) -> Self {
        TimelineConfigRecord {
            day_start: config.day_start.to_string(),
            day_end: config.day_end.to_string(),
            slot_minutes: config.slot_minutes,
            move_minutes: config.move_minutes,
        }
    }
}
