//! Property tests for the store, the slot grid and the timeline cursor.

use chrono::NaiveDate;
use chronoflow::cursor::TimelineCursor;
use chronoflow::grid;
use chronoflow::model::{Task, TimeOfDay, TimeRange, TimelineConfig};
use chronoflow::store::ScheduleStore;
use proptest::prelude::*;

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 9).unwrap()
}

fn minute(m: i64) -> TimeOfDay {
    TimeOfDay::from_minutes(m).unwrap()
}

#[derive(Debug, Clone)]
enum Op {
    Schedule { index: usize, start: i64, len: i64 },
    Unschedule { index: usize },
    Resize { index: usize, delta: i64 },
    Shift { index: usize, delta: i64 },
}

/// A range that fits inside one day.
fn arb_range() -> impl Strategy<Value = TimeRange> {
    (0i64..1380).prop_flat_map(|start| {
        (Just(start), 1i64..=(1439 - start).min(240))
            .prop_map(|(start, len)| TimeRange::new(minute(start), minute(start + len)))
    })
}

fn arb_task() -> impl Strategy<Value = Task> {
    ("[a-z]{1,8}", proptest::option::of(arb_range())).prop_map(|(title, schedule)| {
        let task = Task::new(title);
        match schedule {
            Some(range) => task.scheduled(range),
            None => task,
        }
    })
}

fn arb_op() -> impl Strategy<Value = Op> {
    let index = 0usize..8;
    prop_oneof![
        (index.clone(), 0i64..1380, 1i64..60)
            .prop_map(|(index, start, len)| Op::Schedule { index, start, len }),
        index.clone().prop_map(|index| Op::Unschedule { index }),
        (index.clone(), -180i64..180).prop_map(|(index, delta)| Op::Resize { index, delta }),
        (index, -180i64..180).prop_map(|(index, delta)| Op::Shift { index, delta }),
    ]
}

fn arb_config() -> impl Strategy<Value = TimelineConfig> {
    (0i64..1380, 1i64..600, 1u32..=120).prop_map(|(start, span, slot)| TimelineConfig {
        day_start: minute(start),
        day_end: minute((start + span).min(1439)),
        slot_minutes: slot,
        move_minutes: slot,
    })
}

fn store_with(tasks: &[Task]) -> ScheduleStore {
    let mut store = ScheduleStore::new();
    for task in tasks {
        store.add(day(), task.clone()).unwrap();
    }
    store
}

fn apply(store: &mut ScheduleStore, op: &Op) {
    let _ = match *op {
        Op::Schedule { index, start, len } => store
            .schedule(day(), index, TimeRange::new(minute(start), minute(start + len)))
            .map(|_| ()),
        Op::Unschedule { index } => store.unschedule(day(), index).map(|_| ()),
        Op::Resize { index, delta } => store.resize(day(), index, delta, 30).map(|_| ()),
        Op::Shift { index, delta } => store
            .shift(day(), index, delta, minute(480), minute(1080))
            .map(|_| ()),
    };
}

proptest! {
    #[test]
    fn times_are_both_or_neither(
        tasks in prop::collection::vec(arb_task(), 0..8),
        ops in prop::collection::vec(arb_op(), 0..40),
    ) {
        let mut store = store_with(&tasks);
        for op in &ops {
            apply(&mut store, op);
            for task in store.tasks(day()) {
                prop_assert_eq!(task.start_time().is_some(), task.end_time().is_some());
                if let Some(range) = task.schedule {
                    prop_assert!(range.start < range.end);
                }
            }
        }
    }

    #[test]
    fn scheduling_keeps_list_order(
        tasks in prop::collection::vec(arb_task(), 0..8),
        ops in prop::collection::vec(arb_op(), 0..40),
    ) {
        let mut store = store_with(&tasks);
        let titles: Vec<String> = tasks.iter().map(|t| t.title.clone()).collect();
        for op in &ops {
            apply(&mut store, op);
        }
        let after: Vec<String> = store.tasks(day()).iter().map(|t| t.title.clone()).collect();
        prop_assert_eq!(after, titles);
    }

    #[test]
    fn partition_covers_every_task_once(tasks in prop::collection::vec(arb_task(), 0..12)) {
        let store = store_with(&tasks);
        let partition = store.partition(day());
        prop_assert_eq!(partition.scheduled.len() + partition.unscheduled.len(), tasks.len());
        let mut seen: Vec<usize> = partition
            .scheduled
            .iter()
            .chain(partition.unscheduled.iter())
            .map(|(index, _)| *index)
            .collect();
        seen.sort_unstable();
        prop_assert_eq!(seen, (0..tasks.len()).collect::<Vec<_>>());
        prop_assert!(partition.scheduled.iter().all(|(_, t)| t.is_scheduled()));
        prop_assert!(partition.unscheduled.iter().all(|(_, t)| !t.is_scheduled()));
    }

    #[test]
    fn resize_never_goes_below_floor(
        range in arb_range(),
        min in 1u32..=90,
        deltas in prop::collection::vec(-120i64..120, 1..20),
    ) {
        prop_assume!(range.minutes() >= i64::from(min));
        let mut store = store_with(&[Task::new("t").scheduled(range)]);
        for delta in deltas {
            let before = store.tasks(day())[0].schedule;
            match store.resize(day(), 0, delta, min) {
                Ok(end) => prop_assert_eq!(store.tasks(day())[0].end_time(), Some(end)),
                Err(_) => prop_assert_eq!(store.tasks(day())[0].schedule, before),
            }
            let now = store.tasks(day())[0].schedule.unwrap();
            prop_assert_eq!(now.start, range.start);
            prop_assert!(now.minutes() >= i64::from(min));
        }
    }

    #[test]
    fn repeated_shrinking_reaches_a_fixed_point(range in arb_range(), min in 1u32..=60) {
        prop_assume!(range.minutes() >= i64::from(min));
        let mut store = store_with(&[Task::new("t").scheduled(range)]);
        while store.resize(day(), 0, -i64::from(min), min).is_ok() {}
        let settled = store.tasks(day())[0].schedule;
        prop_assert!(store.resize(day(), 0, -i64::from(min), min).is_err());
        prop_assert_eq!(store.tasks(day())[0].schedule, settled);
    }

    #[test]
    fn shift_moves_both_ends_or_neither(
        range in arb_range(),
        delta in -600i64..600,
        lower in 0i64..720,
        upper in 720i64..1440,
    ) {
        let mut store = store_with(&[Task::new("t").scheduled(range)]);
        let result = store.shift(day(), 0, delta, minute(lower), minute(upper));
        let now = store.tasks(day())[0].schedule.unwrap();
        match result {
            Ok(moved) => {
                prop_assert_eq!(moved, now);
                prop_assert_eq!(now.start.minutes(), range.start.minutes() + delta);
                prop_assert_eq!(now.end.minutes(), range.end.minutes() + delta);
                prop_assert!(now.start >= minute(lower) && now.end <= minute(upper));
            }
            Err(_) => prop_assert_eq!(now, range),
        }
    }

    #[test]
    fn slot_index_round_trips(config in arb_config()) {
        for k in 0..grid::total_slots(&config) {
            let time = grid::slot_to_time(&config, k);
            prop_assert_eq!(grid::time_to_slot(&config, time), k);
        }
    }

    #[test]
    fn cursor_stays_in_range(
        config in arb_config(),
        count in 0usize..10,
        moves in prop::collection::vec(any::<i32>(), 0..20),
    ) {
        let mut cursor = TimelineCursor::new();
        let slots = grid::total_slots(&config);
        for delta in moves {
            cursor.move_slot(delta as isize, &config);
            cursor.move_unscheduled_selection(delta as isize, count);
            prop_assert!(cursor.slot_index() < slots.max(1));
            prop_assert!(cursor.unscheduled_selection() < count.max(1));
        }
    }
}
