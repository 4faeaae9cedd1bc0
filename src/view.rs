//! Read-only snapshot of one day, rebuilt after every mutation and handed to rendering.

use crate::grid;
use crate::model::{TimeOfDay, TimelineConfig};
use crate::store::{IndexedTask, ScheduleStore};
use chrono::NaiveDate;

#[derive(Debug)]
pub struct SlotRow<'a> {
    pub index: usize,
    pub time: TimeOfDay,
    /// Tasks whose start falls inside this slot, in start order.
    pub starts: Vec<IndexedTask<'a>>,
    /// A task that started in an earlier slot and is still running at `time`.
    pub continues: Option<IndexedTask<'a>>,
}

#[derive(Debug)]
pub struct DaySnapshot<'a> {
    pub date: NaiveDate,
    pub rows: Vec<SlotRow<'a>>,
    pub unscheduled: Vec<IndexedTask<'a>>,
    /// Scheduled tasks starting before `day_start` or after the last slot.
    pub off_grid: Vec<IndexedTask<'a>>,
    scheduled: Vec<IndexedTask<'a>>,
}

impl<'a> DaySnapshot<'a> {
    pub fn build(store: &'a ScheduleStore, date: NaiveDate, config: &TimelineConfig) -> Self {
        let partition = store.partition(date);
        let scheduled = partition.scheduled_by_start();
        let slots = grid::total_slots(config);
        let grid_end = grid::slot_to_time(config, slots);

        let mut rows: Vec<SlotRow<'a>> = (0..slots)
            .map(|index| SlotRow {
                index,
                time: grid::slot_to_time(config, index),
                starts: Vec::new(),
                continues: None,
            })
            .collect();
        let mut off_grid = Vec::new();

        for &(index, task) in &scheduled {
            let Some(range) = task.schedule else {
                continue;
            };
            if slots == 0 || range.start < config.day_start || range.start >= grid_end {
                off_grid.push((index, task));
                continue;
            }
            let first = grid::time_to_slot(config, range.start);
            rows[first].starts.push((index, task));
            for row in rows.iter_mut().skip(first + 1) {
                if !range.contains(row.time) {
                    break;
                }
                if row.continues.is_none() {
                    row.continues = Some((index, task));
                }
            }
        }

        DaySnapshot {
            date,
            rows,
            unscheduled: partition.unscheduled,
            off_grid,
            scheduled,
        }
    }

    /// Flat list-mode order: scheduled by start time, then unscheduled in list order.
    pub fn list_entries(&self) -> Vec<IndexedTask<'a>> {
        self.scheduled
            .iter()
            .chain(self.unscheduled.iter())
            .copied()
            .collect()
    }

    /// Store indices of scheduled tasks whose range intersects another task's range.
    pub fn overlapping(&self) -> Vec<usize> {
        self.scheduled
            .iter()
            .filter(|(index, task)| {
                self.scheduled.iter().any(|(other, other_task)| {
                    other != index
                        && matches!(
                            (task.schedule, other_task.schedule),
                            (Some(a), Some(b)) if a.overlaps(&b)
                        )
                })
            })
            .map(|(index, _)| *index)
            .collect()
    }
}
