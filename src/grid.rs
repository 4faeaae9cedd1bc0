//! Slot arithmetic over a [`TimelineConfig`].
//!
//! Slot `0` starts at `day_start`; each slot is `slot_minutes` long. A trailing
//! partial slot before `day_end` is not navigable. None of these functions clamp:
//! keeping indices inside `[0, total_slots)` is the cursor's job.

use crate::model::{TimeOfDay, TimelineConfig};

pub fn total_slots(config: &TimelineConfig) -> usize {
    if config.slot_minutes == 0 || config.day_end <= config.day_start {
        return 0;
    }
    (config.day_minutes() / i64::from(config.slot_minutes)) as usize
}

/// `day_start + index * slot_minutes`, saturating at 23:59 for indices past the end of the day.
pub fn slot_to_time(config: &TimelineConfig, index: usize) -> TimeOfDay {
    let offset = (index as i64).saturating_mul(i64::from(config.slot_minutes));
    config
        .day_start
        .checked_add_minutes(offset)
        .unwrap_or(TimeOfDay::LAST_MINUTE)
}

/// Floor of `(time - day_start) / slot_minutes`. Times before `day_start` map to slot 0.
pub fn time_to_slot(config: &TimelineConfig, time: TimeOfDay) -> usize {
    if config.slot_minutes == 0 {
        return 0;
    }
    let offset = config.day_start.minutes_until(time);
    if offset <= 0 {
        return 0;
    }
    (offset / i64::from(config.slot_minutes)) as usize
}

/// Whether `time` falls on a slot boundary inside the navigable grid.
pub fn is_slot_aligned(config: &TimelineConfig, time: TimeOfDay) -> bool {
    let slots = total_slots(config);
    slots > 0
        && time >= config.day_start
        && time_to_slot(config, time) < slots
        && slot_to_time(config, time_to_slot(config, time)) == time
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(start: &str, end: &str, slot: u32) -> TimelineConfig {
        TimelineConfig {
            day_start: start.parse().unwrap(),
            day_end: end.parse().unwrap(),
            slot_minutes: slot,
            move_minutes: slot,
        }
    }

    #[test]
    fn default_day_has_twenty_half_hour_slots() {
        let cfg = TimelineConfig::default();
        assert_eq!(total_slots(&cfg), 20);
        assert_eq!(slot_to_time(&cfg, 0).to_string(), "08:00");
        assert_eq!(slot_to_time(&cfg, 19).to_string(), "17:30");
    }

    #[test]
    fn partial_trailing_slot_is_truncated() {
        let cfg = config("08:00", "09:50", 30);
        assert_eq!(total_slots(&cfg), 3);
    }

    #[test]
    fn inverted_range_has_no_slots() {
        assert_eq!(total_slots(&config("18:00", "08:00", 30)), 0);
        assert_eq!(total_slots(&config("08:00", "08:00", 30)), 0);
    }

    #[test]
    fn time_to_slot_floors_within_slot() {
        let cfg = TimelineConfig::default();
        assert_eq!(time_to_slot(&cfg, "09:00".parse().unwrap()), 2);
        assert_eq!(time_to_slot(&cfg, "09:29".parse().unwrap()), 2);
        assert_eq!(time_to_slot(&cfg, "07:00".parse().unwrap()), 0);
    }

    #[test]
    fn slot_to_time_saturates_past_midnight() {
        let cfg = config("23:00", "23:59", 30);
        assert_eq!(slot_to_time(&cfg, 10), TimeOfDay::LAST_MINUTE);
    }

    #[test]
    fn alignment_checks_grid_boundaries() {
        let cfg = TimelineConfig::default();
        assert!(is_slot_aligned(&cfg, "08:30".parse().unwrap()));
        assert!(!is_slot_aligned(&cfg, "08:45".parse().unwrap()));
        assert!(!is_slot_aligned(&cfg, "18:00".parse().unwrap()));
        assert!(!is_slot_aligned(&cfg, "07:30".parse().unwrap()));
    }
}
