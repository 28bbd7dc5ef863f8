//! Operator working-time estimation from call activity.
//!
//! There is no clock-in data in the telephony feed, so worked time is
//! estimated by slicing the day into fixed slots (five minutes by default)
//! and crediting each slot with the longest stretch of talk time observed
//! inside it. Taking the per-slot maximum keeps overlapping and repeated
//! calls from double counting.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;

pub const DEFAULT_SLOT_SECONDS: i64 = 300;

#[derive(Debug)]
pub struct Timesheet {
    slot_seconds: i64,
    // operator -> slot index -> max seconds worked within the slot
    slots: BTreeMap<String, BTreeMap<i64, i64>>,
}

impl Default for Timesheet {
    fn default() -> Self {
        Self::new(DEFAULT_SLOT_SECONDS)
    }
}

impl Timesheet {
    pub fn new(slot_seconds: i64) -> Self {
        Self {
            slot_seconds: slot_seconds.max(1),
            slots: BTreeMap::new(),
        }
    }

    /// Credit every slot the call overlaps with its overlap length.
    /// `started_at` is `YYYY-MM-DD HH:MM:SS`; negative durations count as
    /// zero.
    pub fn record(
        &mut self,
        operator_name: &str,
        started_at: &str,
        duration_seconds: i64,
    ) -> Result<(), String> {
        let started = NaiveDateTime::parse_from_str(started_at, "%Y-%m-%d %H:%M:%S")
            .map_err(|_| format!("bad call timestamp '{started_at}'"))?;
        let start = started.and_utc().timestamp();
        let end = start + duration_seconds.max(0);

        let buckets = self.slots.entry(operator_name.to_string()).or_default();
        for slot in (start / self.slot_seconds)..=(end / self.slot_seconds) {
            let slot_start = slot * self.slot_seconds;
            let slot_end = slot_start + self.slot_seconds;
            let overlap = end.min(slot_end) - start.max(slot_start);
            let credited = buckets.entry(slot).or_insert(0);
            *credited = (*credited).max(overlap);
        }
        Ok(())
    }

    /// Estimated worked seconds for one operator.
    pub fn worked_seconds(&self, operator_name: &str) -> i64 {
        self.slots
            .get(operator_name)
            .map_or(0, |buckets| buckets.values().sum())
    }

    pub fn operator_count(&self) -> usize {
        self.slots.len()
    }

    pub fn operators(&self) -> impl Iterator<Item = (&String, i64)> {
        self.slots
            .iter()
            .map(|(name, buckets)| (name, buckets.values().sum()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_call_credits_its_duration() {
        let mut sheet = Timesheet::default();
        sheet.record("alice", "2026-05-01 10:01:00", 120).unwrap();
        assert_eq!(sheet.worked_seconds("alice"), 120);
    }

    #[test]
    fn call_spanning_slot_boundary_splits_across_slots() {
        let mut sheet = Timesheet::default();
        sheet.record("alice", "2026-05-01 10:04:00", 120).unwrap();
        // 60 seconds land in 10:00-10:05, 60 in 10:05-10:10.
        assert_eq!(sheet.worked_seconds("alice"), 120);
    }

    #[test]
    fn overlapping_calls_keep_the_slot_maximum() {
        let mut sheet = Timesheet::default();
        sheet.record("alice", "2026-05-01 10:01:00", 60).unwrap();
        sheet.record("alice", "2026-05-01 10:01:30", 90).unwrap();
        // Both calls sit in the same slot; the longer one wins.
        assert_eq!(sheet.worked_seconds("alice"), 90);
    }

    #[test]
    fn calls_in_distinct_slots_accumulate() {
        let mut sheet = Timesheet::default();
        sheet.record("alice", "2026-05-01 10:01:00", 60).unwrap();
        sheet.record("alice", "2026-05-01 10:07:00", 30).unwrap();
        assert_eq!(sheet.worked_seconds("alice"), 90);
    }

    #[test]
    fn operators_tracked_independently() {
        let mut sheet = Timesheet::default();
        sheet.record("alice", "2026-05-01 10:01:00", 30).unwrap();
        sheet.record("bob", "2026-05-01 12:00:00", 45).unwrap();
        assert_eq!(sheet.worked_seconds("alice"), 30);
        assert_eq!(sheet.worked_seconds("bob"), 45);
        assert_eq!(sheet.worked_seconds("carol"), 0);
        assert_eq!(sheet.operator_count(), 2);
    }

    #[test]
    fn bad_timestamp_is_an_error() {
        let mut sheet = Timesheet::default();
        assert!(sheet.record("alice", "not a date", 30).is_err());
    }
}
