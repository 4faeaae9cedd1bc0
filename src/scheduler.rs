//! User-facing scheduling intents for the Day View timeline.
//!
//! A [`SchedulingController`] borrows the store, the timeline config and the cursor for
//! the duration of one intent. Every failure comes back as a [`SchedulingError`] with the
//! store left untouched, and callers turn it into a status message.

use crate::cursor::TimelineCursor;
use crate::model::{
    ScheduleError, TimeOfDay, TimeParseError, TimeRange, TimelineConfig, DEFAULT_TASK_MINUTES,
};
use crate::store::ScheduleStore;
use chrono::NaiveDate;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Earlier,
    Later,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulingError {
    #[error(transparent)]
    Parse(#[from] TimeParseError),
    #[error("nothing scheduled at {0}")]
    NothingUnderCursor(TimeOfDay),
    #[error("no unscheduled task selected")]
    NothingSelected,
    #[error("cannot extend further")]
    CannotExtend,
    #[error("minimum duration reached")]
    CannotShrink,
    #[error("cannot move earlier")]
    CannotMoveEarlier,
    #[error("cannot move later")]
    CannotMoveLater,
    #[error(transparent)]
    Store(#[from] ScheduleError),
}

/// Result of a successful schedule: which task, and where it now sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub index: usize,
    pub range: TimeRange,
}

pub struct SchedulingController<'a> {
    store: &'a mut ScheduleStore,
    config: &'a TimelineConfig,
    cursor: &'a mut TimelineCursor,
    date: NaiveDate,
}

impl Direction {
    fn sign(self) -> i64 {
        match self {
            Direction::Earlier => -1,
            Direction::Later => 1,
        }
    }
}

impl<'a> SchedulingController<'a> {
    pub fn new(
        store: &'a mut ScheduleStore,
        config: &'a TimelineConfig,
        cursor: &'a mut TimelineCursor,
        date: NaiveDate,
    ) -> Self {
        SchedulingController {
            store,
            config,
            cursor,
            date,
        }
    }

    /// Store index of the unscheduled task under the list selection.
    pub fn selected_unscheduled(&self) -> Option<usize> {
        self.store
            .partition(self.date)
            .unscheduled
            .get(self.cursor.unscheduled_selection())
            .map(|(index, _)| *index)
    }

    /// Store index of the first scheduled task starting exactly at the cursor slot.
    pub fn task_under_cursor(&self) -> Option<usize> {
        let time = self.cursor.current_slot_time(self.config);
        self.store
            .partition(self.date)
            .starting_at(time)
            .map(|(index, _)| index)
    }

    /// Schedules the selected unscheduled task at the cursor slot for the default task length.
    /// The cursor stays where it is.
    pub fn assign_at_cursor(&mut self) -> Result<Placement, SchedulingError> {
        let index = self
            .selected_unscheduled()
            .ok_or(SchedulingError::NothingSelected)?;
        let start = self.cursor.current_slot_time(self.config);
        let range = TimeRange::starting_at(start, DEFAULT_TASK_MINUTES)?;
        self.store.schedule(self.date, index, range)?;
        self.clamp_cursor();
        Ok(Placement { index, range })
    }

    /// Parses "HH:MM" or "HH:MM-HH:MM" and schedules task `index` there.
    pub fn quick_schedule(&mut self, index: usize, input: &str) -> Result<Placement, SchedulingError> {
        let range = TimeRange::parse(input).map_err(|err| {
            debug!(input, %err, "quick schedule input rejected");
            err
        })?;
        self.store.schedule(self.date, index, range)?;
        self.clamp_cursor();
        Ok(Placement { index, range })
    }

    pub fn unschedule(&mut self) -> Result<Placement, SchedulingError> {
        let index = self.require_under_cursor()?;
        let previous = self.store.unschedule(self.date, index)?;
        self.clamp_cursor();
        let range = previous.ok_or(ScheduleError::NotScheduled(index))?;
        Ok(Placement { index, range })
    }

    /// Grows or shrinks the task under the cursor by whole slots; returns the new end.
    pub fn adjust_duration(&mut self, delta_slots: i64) -> Result<TimeOfDay, SchedulingError> {
        let index = self.require_under_cursor()?;
        let slot = i64::from(self.config.slot_minutes);
        self.store
            .resize(self.date, index, delta_slots * slot, self.config.slot_minutes)
            .map_err(|err| match err {
                ScheduleError::MinimumDuration(_) => SchedulingError::CannotShrink,
                ScheduleError::OutOfBounds { .. } => SchedulingError::CannotExtend,
                other => SchedulingError::Store(other),
            })
    }

    /// Shifts the task under the cursor by `move_minutes` inside the configured day, and moves
    /// the cursor to the slot holding the new start.
    pub fn reposition(&mut self, direction: Direction) -> Result<TimeRange, SchedulingError> {
        let index = self.require_under_cursor()?;
        let delta = direction.sign() * i64::from(self.config.move_minutes);
        let moved = self
            .store
            .shift(
                self.date,
                index,
                delta,
                self.config.day_start,
                self.config.day_end,
            )
            .map_err(|err| match (err, direction) {
                (ScheduleError::OutOfBounds { .. }, Direction::Earlier) => {
                    SchedulingError::CannotMoveEarlier
                }
                (ScheduleError::OutOfBounds { .. }, Direction::Later) => {
                    SchedulingError::CannotMoveLater
                }
                (other, _) => SchedulingError::Store(other),
            })?;
        self.cursor.jump_to(moved.start, self.config);
        Ok(moved)
    }

    fn require_under_cursor(&self) -> Result<usize, SchedulingError> {
        self.task_under_cursor().ok_or_else(|| {
            SchedulingError::NothingUnderCursor(self.cursor.current_slot_time(self.config))
        })
    }

    fn clamp_cursor(&mut self) {
        let count = self.store.partition(self.date).unscheduled.len();
        self.cursor.clamp(count, self.config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::TimelineFocus;
    use crate::model::Task;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 18).unwrap()
    }

    fn t(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    fn fixture(tasks: Vec<Task>) -> (ScheduleStore, TimelineConfig, TimelineCursor) {
        let mut store = ScheduleStore::new();
        for task in tasks {
            store.add(date(), task).unwrap();
        }
        (store, TimelineConfig::default(), TimelineCursor::new())
    }

    #[test]
    fn assign_uses_cursor_slot_and_one_hour() {
        let (mut store, config, mut cursor) = fixture(vec![Task::new("a"), Task::new("b")]);
        cursor.set_focus(TimelineFocus::Timeline);
        cursor.move_slot(2, &config);
        cursor.move_unscheduled_selection(1, 2);
        let placed = SchedulingController::new(&mut store, &config, &mut cursor, date())
            .assign_at_cursor()
            .unwrap();
        assert_eq!(placed.index, 1);
        assert_eq!(placed.range, TimeRange::new(t("09:00"), t("10:00")));
        assert_eq!(cursor.slot_index(), 2);
        assert_eq!(cursor.unscheduled_selection(), 0);
    }

    #[test]
    fn assign_with_no_unscheduled_tasks_fails() {
        let (mut store, config, mut cursor) = fixture(vec![]);
        let err = SchedulingController::new(&mut store, &config, &mut cursor, date())
            .assign_at_cursor()
            .unwrap_err();
        assert_eq!(err, SchedulingError::NothingSelected);
    }

    #[test]
    fn quick_schedule_parses_range() {
        let (mut store, config, mut cursor) = fixture(vec![Task::new("a")]);
        SchedulingController::new(&mut store, &config, &mut cursor, date())
            .quick_schedule(0, "09:00-10:30")
            .unwrap();
        let task = &store.tasks(date())[0];
        assert_eq!(task.start_time(), Some(t("09:00")));
        assert_eq!(task.end_time(), Some(t("10:30")));
        assert_eq!(store.partition(date()).scheduled.len(), 1);
    }

    #[test]
    fn quick_schedule_rejects_free_text() {
        let (mut store, config, mut cursor) = fixture(vec![Task::new("a")]);
        for input in ["9am", "09: 5", " 9:00", "09:00-09: 5", "9:00-10:00"] {
            let err = SchedulingController::new(&mut store, &config, &mut cursor, date())
                .quick_schedule(0, input)
                .unwrap_err();
            assert!(matches!(err, SchedulingError::Parse(_)), "{input:?}");
            assert!(!store.tasks(date())[0].is_scheduled(), "{input:?}");
        }
    }

    #[test]
    fn unschedule_needs_task_starting_at_cursor() {
        let (mut store, config, mut cursor) = fixture(vec![
            Task::new("a").scheduled(TimeRange::new(t("08:00"), t("09:00")))
        ]);
        cursor.move_slot(1, &config);
        let err = SchedulingController::new(&mut store, &config, &mut cursor, date())
            .unschedule()
            .unwrap_err();
        assert_eq!(err, SchedulingError::NothingUnderCursor(t("08:30")));

        cursor.move_slot(-1, &config);
        let removed = SchedulingController::new(&mut store, &config, &mut cursor, date())
            .unschedule()
            .unwrap();
        assert_eq!(removed.range, TimeRange::new(t("08:00"), t("09:00")));
        assert!(!store.tasks(date())[0].is_scheduled());
    }

    #[test]
    fn adjust_duration_reports_floor() {
        let (mut store, config, mut cursor) = fixture(vec![
            Task::new("a").scheduled(TimeRange::new(t("08:00"), t("08:30")))
        ]);
        let mut controller = SchedulingController::new(&mut store, &config, &mut cursor, date());
        assert_eq!(controller.adjust_duration(-1), Err(SchedulingError::CannotShrink));
        assert_eq!(controller.adjust_duration(2).unwrap(), t("09:30"));
    }

    #[test]
    fn adjust_duration_reports_end_of_day_overflow() {
        let config = TimelineConfig {
            day_start: t("23:00"),
            day_end: t("23:59"),
            ..TimelineConfig::default()
        };
        let mut store = ScheduleStore::new();
        store
            .add(date(), Task::new("late").scheduled(TimeRange::new(t("23:00"), t("23:30"))))
            .unwrap();
        let mut cursor = TimelineCursor::new();
        let err = SchedulingController::new(&mut store, &config, &mut cursor, date())
            .adjust_duration(1)
            .unwrap_err();
        assert_eq!(err, SchedulingError::CannotExtend);
    }

    #[test]
    fn reposition_follows_task_with_cursor() {
        let (mut store, config, mut cursor) = fixture(vec![
            Task::new("a").scheduled(TimeRange::new(t("09:00"), t("10:00")))
        ]);
        cursor.move_slot(2, &config);
        let moved = SchedulingController::new(&mut store, &config, &mut cursor, date())
            .reposition(Direction::Later)
            .unwrap();
        assert_eq!(moved, TimeRange::new(t("09:30"), t("10:30")));
        assert_eq!(cursor.slot_index(), 3);
    }

    #[test]
    fn reposition_rejects_leaving_the_day() {
        let (mut store, config, mut cursor) = fixture(vec![
            Task::new("a").scheduled(TimeRange::new(t("17:00"), t("18:00"))),
            Task::new("b").scheduled(TimeRange::new(t("08:00"), t("09:00"))),
        ]);
        cursor.move_slot(18, &config);
        let err = SchedulingController::new(&mut store, &config, &mut cursor, date())
            .reposition(Direction::Later)
            .unwrap_err();
        assert_eq!(err, SchedulingError::CannotMoveLater);
        assert_eq!(cursor.slot_index(), 18);

        cursor.move_slot(-18, &config);
        let err = SchedulingController::new(&mut store, &config, &mut cursor, date())
            .reposition(Direction::Earlier)
            .unwrap_err();
        assert_eq!(err, SchedulingError::CannotMoveEarlier);
    }
}
