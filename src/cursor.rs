//! Navigation state of the Day View.
//!
//! The timeline cursor tracks two positions that move independently: a slot on the
//! time grid and a selection in the unscheduled list. Either list can shrink under the
//! cursor, so every read path clamps.

use crate::grid;
use crate::model::{TimeOfDay, TimelineConfig};
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimelineFocus {
    #[default]
    Unscheduled,
    Timeline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DayViewMode {
    #[default]
    List,
    Timeline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimelineCursor {
    focus: TimelineFocus,
    slot_index: usize,
    unscheduled_selection: usize,
}

/// State of one visit to the Day View. Dropping it is leaving the Day View.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySession {
    pub date: NaiveDate,
    pub mode: DayViewMode,
    pub cursor: TimelineCursor,
    list_selection: usize,
}

impl TimelineFocus {
    pub fn toggled(self) -> Self {
        match self {
            TimelineFocus::Unscheduled => TimelineFocus::Timeline,
            TimelineFocus::Timeline => TimelineFocus::Unscheduled,
        }
    }
}

impl DayViewMode {
    pub fn toggled(self) -> Self {
        match self {
            DayViewMode::List => DayViewMode::Timeline,
            DayViewMode::Timeline => DayViewMode::List,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DayViewMode::List => "list",
            DayViewMode::Timeline => "timeline",
        }
    }
}

impl TimelineCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focus(&self) -> TimelineFocus {
        self.focus
    }

    pub fn slot_index(&self) -> usize {
        self.slot_index
    }

    pub fn unscheduled_selection(&self) -> usize {
        self.unscheduled_selection
    }

    pub fn move_slot(&mut self, delta: isize, config: &TimelineConfig) {
        self.slot_index = clamp_step(self.slot_index, delta, grid::total_slots(config));
    }

    pub fn set_slot(&mut self, index: usize, config: &TimelineConfig) {
        let last = grid::total_slots(config).saturating_sub(1);
        self.slot_index = index.min(last);
    }

    /// Places the cursor on the slot containing `time`.
    pub fn jump_to(&mut self, time: TimeOfDay, config: &TimelineConfig) {
        self.set_slot(grid::time_to_slot(config, time), config);
    }

    /// No-op when `count` is zero so a momentarily empty list keeps the last position.
    pub fn move_unscheduled_selection(&mut self, delta: isize, count: usize) {
        if count == 0 {
            return;
        }
        self.unscheduled_selection = clamp_step(self.unscheduled_selection, delta, count);
    }

    /// Pulls both indices back inside their lists after either one shrank.
    pub fn clamp(&mut self, unscheduled_count: usize, config: &TimelineConfig) {
        self.unscheduled_selection = self
            .unscheduled_selection
            .min(unscheduled_count.saturating_sub(1));
        self.set_slot(self.slot_index, config);
    }

    pub fn toggle_focus(&mut self) {
        self.focus = self.focus.toggled();
    }

    pub fn set_focus(&mut self, focus: TimelineFocus) {
        self.focus = focus;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn current_slot_time(&self, config: &TimelineConfig) -> TimeOfDay {
        grid::slot_to_time(config, self.slot_index)
    }
}

impl DaySession {
    /// Every visit starts in list mode with a fresh cursor.
    pub fn enter(date: NaiveDate) -> Self {
        DaySession {
            date,
            mode: DayViewMode::List,
            cursor: TimelineCursor::new(),
            list_selection: 0,
        }
    }

    pub fn toggle_mode(&mut self) {
        self.mode = self.mode.toggled();
    }

    pub fn change_date(&mut self, date: NaiveDate) {
        if self.date != date {
            self.date = date;
            self.cursor.reset();
            self.list_selection = 0;
        }
    }

    pub fn list_selection(&self) -> usize {
        self.list_selection
    }

    pub fn move_list_selection(&mut self, delta: isize, count: usize) {
        if count == 0 {
            return;
        }
        self.list_selection = clamp_step(self.list_selection, delta, count);
    }

    pub fn clamp_list_selection(&mut self, count: usize) {
        self.list_selection = self.list_selection.min(count.saturating_sub(1));
    }
}

fn clamp_step(current: usize, delta: isize, count: usize) -> usize {
    if count == 0 {
        return 0;
    }
    current.saturating_add_signed(delta).min(count - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_slot_clamps_to_grid() {
        let config = TimelineConfig::default();
        let mut cursor = TimelineCursor::new();
        cursor.move_slot(-3, &config);
        assert_eq!(cursor.slot_index(), 0);
        cursor.move_slot(100, &config);
        assert_eq!(cursor.slot_index(), 19);
        assert_eq!(cursor.current_slot_time(&config).to_string(), "17:30");
    }

    #[test]
    fn move_slot_on_empty_grid_stays_at_zero() {
        let config = TimelineConfig {
            day_start: "18:00".parse().unwrap(),
            day_end: "08:00".parse().unwrap(),
            ..TimelineConfig::default()
        };
        let mut cursor = TimelineCursor::new();
        cursor.move_slot(5, &config);
        assert_eq!(cursor.slot_index(), 0);
    }

    #[test]
    fn unscheduled_selection_tolerates_empty_list() {
        let mut cursor = TimelineCursor::new();
        cursor.move_unscheduled_selection(2, 5);
        assert_eq!(cursor.unscheduled_selection(), 2);
        cursor.move_unscheduled_selection(1, 0);
        assert_eq!(cursor.unscheduled_selection(), 2);
        cursor.move_unscheduled_selection(10, 3);
        assert_eq!(cursor.unscheduled_selection(), 2);
        cursor.move_unscheduled_selection(-10, 3);
        assert_eq!(cursor.unscheduled_selection(), 0);
    }

    #[test]
    fn clamp_follows_shrinking_lists() {
        let config = TimelineConfig::default();
        let mut cursor = TimelineCursor::new();
        cursor.move_unscheduled_selection(4, 5);
        cursor.clamp(2, &config);
        assert_eq!(cursor.unscheduled_selection(), 1);
        cursor.clamp(0, &config);
        assert_eq!(cursor.unscheduled_selection(), 0);
    }

    #[test]
    fn reset_returns_to_unscheduled_focus() {
        let config = TimelineConfig::default();
        let mut cursor = TimelineCursor::new();
        cursor.toggle_focus();
        cursor.move_slot(4, &config);
        cursor.move_unscheduled_selection(1, 3);
        assert_eq!(cursor.focus(), TimelineFocus::Timeline);
        cursor.reset();
        assert_eq!(cursor, TimelineCursor::new());
        assert_eq!(cursor.focus(), TimelineFocus::Unscheduled);
    }

    #[test]
    fn jump_to_lands_on_containing_slot() {
        let config = TimelineConfig::default();
        let mut cursor = TimelineCursor::new();
        cursor.jump_to("10:45".parse().unwrap(), &config);
        assert_eq!(cursor.slot_index(), 5);
        cursor.jump_to("23:00".parse().unwrap(), &config);
        assert_eq!(cursor.slot_index(), 19);
    }

    #[test]
    fn day_session_starts_in_list_mode_and_resets_on_date_change() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 18).unwrap();
        let mut session = DaySession::enter(date);
        assert_eq!(session.mode, DayViewMode::List);
        session.toggle_mode();
        session.cursor.toggle_focus();
        session.move_list_selection(1, 3);
        session.change_date(date.succ_opt().unwrap());
        assert_eq!(session.mode, DayViewMode::Timeline);
        assert_eq!(session.cursor, TimelineCursor::new());
        assert_eq!(session.list_selection(), 0);
    }
}
