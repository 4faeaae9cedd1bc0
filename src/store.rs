//! Per-date task lists and the scheduling mutations on them.
//!
//! Every operation takes the date explicitly. Only [`ScheduleStore::delete`] and
//! [`ScheduleStore::reorder`] change the position of tasks, so an index stays valid across
//! schedule, unschedule, resize and shift.

use crate::model::{Priority, ScheduleError, Task, TimeOfDay, TimeRange};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

pub type IndexedTask<'a> = (usize, &'a Task);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleStore {
    days: BTreeMap<NaiveDate, Vec<Task>>,
}

/// Tasks of one date split by whether they carry times, in list order.
#[derive(Debug, Default)]
pub struct Partition<'a> {
    pub scheduled: Vec<IndexedTask<'a>>,
    pub unscheduled: Vec<IndexedTask<'a>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub overdue: usize,
}

#[derive(Debug)]
pub struct SearchHit<'a> {
    pub date: NaiveDate,
    pub index: usize,
    pub task: &'a Task,
}

impl ScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self, date: NaiveDate) -> &[Task] {
        self.days.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn task(&self, date: NaiveDate, index: usize) -> Result<&Task, ScheduleError> {
        let tasks = self.tasks(date);
        tasks.get(index).ok_or(ScheduleError::IndexOutOfRange {
            date,
            index,
            len: tasks.len(),
        })
    }

    pub fn dates(&self) -> impl Iterator<Item = (NaiveDate, &[Task])> {
        self.days
            .iter()
            .filter(|(_, tasks)| !tasks.is_empty())
            .map(|(date, tasks)| (*date, tasks.as_slice()))
    }

    pub fn add(&mut self, date: NaiveDate, task: Task) -> Result<usize, ScheduleError> {
        if task.title.trim().is_empty() {
            return Err(ScheduleError::EmptyTitle);
        }
        let tasks = self.days.entry(date).or_default();
        tasks.push(task);
        info!(%date, index = tasks.len() - 1, "added task");
        Ok(tasks.len() - 1)
    }

    pub fn save(&mut self, date: NaiveDate, index: usize, task: Task) -> Result<(), ScheduleError> {
        *self.task_mut(date, index)? = task;
        Ok(())
    }

    pub fn delete(&mut self, date: NaiveDate, index: usize) -> Result<Task, ScheduleError> {
        self.task_mut(date, index)?;
        let tasks = self.days.entry(date).or_default();
        let removed = tasks.remove(index);
        if tasks.is_empty() {
            self.days.remove(&date);
        }
        info!(%date, index, "deleted task");
        Ok(removed)
    }

    /// Moves the task at `from` to position `to`, shifting the tasks in between.
    pub fn reorder(&mut self, date: NaiveDate, from: usize, to: usize) -> Result<(), ScheduleError> {
        self.task(date, from)?;
        self.task(date, to)?;
        if from == to {
            return Ok(());
        }
        if let Some(tasks) = self.days.get_mut(&date) {
            let task = tasks.remove(from);
            tasks.insert(to, task);
        }
        info!(%date, from, to, "reordered task");
        Ok(())
    }

    /// Returns the new completion state.
    pub fn toggle_complete(&mut self, date: NaiveDate, index: usize) -> Result<bool, ScheduleError> {
        let task = self.task_mut(date, index)?;
        task.complete = !task.complete;
        Ok(task.complete)
    }

    pub fn set_priority(
        &mut self,
        date: NaiveDate,
        index: usize,
        priority: Priority,
    ) -> Result<(), ScheduleError> {
        self.task_mut(date, index)?.priority = priority;
        Ok(())
    }

    /// Sets both times. Overlapping other tasks is allowed.
    pub fn schedule(
        &mut self,
        date: NaiveDate,
        index: usize,
        range: TimeRange,
    ) -> Result<(), ScheduleError> {
        self.task_mut(date, index)?.schedule = Some(range);
        info!(%date, index, %range, "scheduled task");
        Ok(())
    }

    /// Clears both times, returning the previous range if there was one.
    pub fn unschedule(
        &mut self,
        date: NaiveDate,
        index: usize,
    ) -> Result<Option<TimeRange>, ScheduleError> {
        let previous = self.task_mut(date, index)?.schedule.take();
        if let Some(range) = previous {
            info!(%date, index, %range, "unscheduled task");
        }
        Ok(previous)
    }

    /// Moves only the end time by `delta_minutes`, keeping at least `min_slot_minutes` of duration.
    /// No check against the configured end of day happens here.
    pub fn resize(
        &mut self,
        date: NaiveDate,
        index: usize,
        delta_minutes: i64,
        min_slot_minutes: u32,
    ) -> Result<TimeOfDay, ScheduleError> {
        let task = self.task_mut(date, index)?;
        let range = task.schedule.ok_or(ScheduleError::NotScheduled(index))?;
        let new_end = range
            .end
            .checked_add_minutes(delta_minutes)
            .ok_or(ScheduleError::OutOfBounds {
                lower: range.start,
                upper: TimeOfDay::LAST_MINUTE,
            })?;
        if range.start.minutes_until(new_end) < i64::from(min_slot_minutes) {
            debug!(%date, index, %new_end, "resize rejected below minimum duration");
            return Err(ScheduleError::MinimumDuration(min_slot_minutes));
        }
        task.schedule = Some(TimeRange::new(range.start, new_end));
        info!(%date, index, %new_end, "resized task");
        Ok(new_end)
    }

    /// Moves start and end together. Either both move by exactly `delta_minutes` and stay within
    /// `[lower, upper]`, or nothing changes.
    pub fn shift(
        &mut self,
        date: NaiveDate,
        index: usize,
        delta_minutes: i64,
        lower: TimeOfDay,
        upper: TimeOfDay,
    ) -> Result<TimeRange, ScheduleError> {
        let task = self.task_mut(date, index)?;
        let range = task.schedule.ok_or(ScheduleError::NotScheduled(index))?;
        let out_of_bounds = ScheduleError::OutOfBounds { lower, upper };
        let new_start = range
            .start
            .checked_add_minutes(delta_minutes)
            .ok_or_else(|| out_of_bounds.clone())?;
        let new_end = range
            .end
            .checked_add_minutes(delta_minutes)
            .ok_or_else(|| out_of_bounds.clone())?;
        if new_start < lower || new_end > upper {
            debug!(%date, index, %new_start, %new_end, "shift rejected outside bounds");
            return Err(out_of_bounds);
        }
        let moved = TimeRange::new(new_start, new_end);
        task.schedule = Some(moved);
        info!(%date, index, range = %moved, "shifted task");
        Ok(moved)
    }

    pub fn partition(&self, date: NaiveDate) -> Partition<'_> {
        let (scheduled, unscheduled): (Vec<_>, Vec<_>) = self
            .tasks(date)
            .iter()
            .enumerate()
            .partition(|(_, task)| task.is_scheduled());
        Partition {
            scheduled,
            unscheduled,
        }
    }

    /// Case-insensitive match on title or description, ordered by date then index.
    pub fn search(&self, query: &str) -> Vec<SearchHit<'_>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.dates()
            .flat_map(|(date, tasks)| {
                tasks
                    .iter()
                    .enumerate()
                    .map(move |(index, task)| SearchHit { date, index, task })
            })
            .filter(|hit| {
                hit.task.title.to_lowercase().contains(&needle)
                    || hit.task.description.to_lowercase().contains(&needle)
            })
            .collect()
    }

    pub fn stats_for(&self, date: NaiveDate, today: NaiveDate) -> TaskStats {
        self.stats_between(date, date.succ_opt().unwrap_or(date), today)
    }

    /// Counts over `[from, until)`.
    pub fn stats_between(&self, from: NaiveDate, until: NaiveDate, today: NaiveDate) -> TaskStats {
        let mut stats = TaskStats::default();
        if from >= until {
            return stats;
        }
        for (date, tasks) in self.days.range(from..until) {
            for task in tasks {
                stats.total += 1;
                if task.complete {
                    stats.completed += 1;
                } else if task.is_overdue(*date, today) {
                    stats.overdue += 1;
                }
            }
        }
        stats
    }

    fn task_mut(&mut self, date: NaiveDate, index: usize) -> Result<&mut Task, ScheduleError> {
        let len = self.tasks(date).len();
        self.days
            .get_mut(&date)
            .and_then(|tasks| tasks.get_mut(index))
            .ok_or(ScheduleError::IndexOutOfRange { date, index, len })
    }
}

impl<'a> Partition<'a> {
    /// Scheduled tasks ordered by start time, ties kept in list order.
    pub fn scheduled_by_start(&self) -> Vec<IndexedTask<'a>> {
        let mut sorted = self.scheduled.clone();
        sorted.sort_by_key(|(_, task)| task.start_time());
        sorted
    }

    /// First scheduled task, in list order, starting exactly at `time`.
    pub fn starting_at(&self, time: TimeOfDay) -> Option<IndexedTask<'a>> {
        self.scheduled
            .iter()
            .copied()
            .find(|(_, task)| task.start_time() == Some(time))
    }
}
