use chrono::NaiveDate;
use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

use crate::models::candidate::{Candidate, TimeSlot};

/// Confirmed candidates allowed to share one (date, time slot).
pub const SLOT_CAPACITY: usize = 2;

/// One (date, time slot) that a confirmation would push over capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotViolation {
    pub date: NaiveDate,
    pub time_slot: TimeSlot,
    pub candidate_ids: Vec<Uuid>,
    /// Confirmed candidates already in the slot, not counting the ones being checked.
    pub existing: usize,
    /// Members of the checked set that target the slot.
    pub in_batch: usize,
    pub reason: String,
}

/// The slot-sharing rule. Single and batch confirmations both go through here.
pub struct CapacityPolicy;

impl CapacityPolicy {
    pub fn can_confirm(
        candidate: &Candidate,
        existing_confirmed: &[Candidate],
    ) -> Result<(), SlotViolation> {
        let existing = existing_confirmed
            .iter()
            .filter(|c| c.id != candidate.id && c.slot_key() == candidate.slot_key() && c.is_confirmed())
            .count();

        if existing >= SLOT_CAPACITY {
            return Err(SlotViolation {
                date: candidate.date,
                time_slot: candidate.time_slot,
                candidate_ids: vec![candidate.id],
                existing,
                in_batch: 1,
                reason: format!(
                    "{} {} already has {} confirmed sessions",
                    candidate.date,
                    candidate.time_slot.label(),
                    existing
                ),
            });
        }
        Ok(())
    }

    /// Validates the whole set before anything is applied. Every violating
    /// slot is reported once so the caller can retry only the failing slots.
    ///
    /// Members are checked one by one against the existing confirmed state,
    /// then grouped by slot and checked together. Both checks always run;
    /// a slot caught by the per-member check keeps that report.
    pub fn can_confirm_batch(
        candidates: &[Candidate],
        existing_confirmed: &[Candidate],
    ) -> Result<(), Vec<SlotViolation>> {
        let mut by_slot: BTreeMap<(NaiveDate, TimeSlot), SlotViolation> = BTreeMap::new();
        for violation in candidates
            .iter()
            .filter_map(|c| Self::can_confirm(c, existing_confirmed).err())
        {
            match by_slot.entry((violation.date, violation.time_slot)) {
                Entry::Vacant(slot) => {
                    slot.insert(violation);
                }
                Entry::Occupied(mut slot) => {
                    let merged = slot.get_mut();
                    for id in violation.candidate_ids {
                        if !merged.candidate_ids.contains(&id) {
                            merged.candidate_ids.push(id);
                            merged.in_batch += 1;
                        }
                    }
                }
            }
        }

        let batch_ids: HashSet<Uuid> = candidates.iter().map(|c| c.id).collect();
        let mut groups: BTreeMap<(NaiveDate, TimeSlot), Vec<Uuid>> = BTreeMap::new();
        for candidate in candidates {
            let members = groups.entry(candidate.slot_key()).or_default();
            if !members.contains(&candidate.id) {
                members.push(candidate.id);
            }
        }

        for ((date, time_slot), members) in groups {
            if by_slot.contains_key(&(date, time_slot)) {
                continue;
            }
            let existing = existing_confirmed
                .iter()
                .filter(|c| {
                    c.is_confirmed() && c.slot_key() == (date, time_slot) && !batch_ids.contains(&c.id)
                })
                .count();
            let in_batch = members.len();
            if existing + in_batch > SLOT_CAPACITY {
                by_slot.insert(
                    (date, time_slot),
                    SlotViolation {
                        date,
                        time_slot,
                        candidate_ids: members,
                        existing,
                        in_batch,
                        reason: format!(
                            "{} {}: {} confirmed plus {} selected exceeds the limit of {}",
                            date,
                            time_slot.label(),
                            existing,
                            in_batch,
                            SLOT_CAPACITY
                        ),
                    },
                );
            }
        }

        let violations: Vec<SlotViolation> = by_slot.into_values().collect();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}
