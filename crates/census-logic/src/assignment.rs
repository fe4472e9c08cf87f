//! Patient ⇄ nurse assignment ledger.
//!
//! A patient's `assigned_nurse` name and the nurses' slot arrays describe the
//! same relation from both ends. [`AssignmentLedger`] is the only writer of
//! either side: every transition edits the nurse slots and then rebuilds the
//! patient side from them, so callers never observe one side without the
//! other.
//!
//! Stale ids (a patient or nurse that no longer exists) turn a transition
//! into a no-op rather than an error.

use std::collections::{HashMap, HashSet};

use crate::balance;
use crate::constants::MAX_ASSIGNMENTS;
use crate::model::{Nurse, Patient, PatientId, StaffId};

/// What a transition did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transition {
    /// Either side of the relation changed.
    pub changed: bool,
    /// Patients pushed out of a full nurse card (7th and later by bed order).
    pub dropped: Vec<PatientId>,
}

type Snapshot = (Vec<[Option<PatientId>; MAX_ASSIGNMENTS]>, Vec<Option<String>>);

/// Mutable view over the census and roster that only allows consistent
/// assignment changes.
pub struct AssignmentLedger<'a> {
    patients: &'a mut [Patient],
    nurses: &'a mut [Nurse],
}

impl<'a> AssignmentLedger<'a> {
    pub fn new(patients: &'a mut [Patient], nurses: &'a mut [Nurse]) -> Self {
        Self { patients, nurses }
    }

    /// Move `patient` onto `nurse`'s card.
    ///
    /// The patient leaves every other card first. The target card is then
    /// re-sorted by bed number, so `slot_index` only identifies the drop
    /// target and must be within the card. A card that would exceed
    /// [`MAX_ASSIGNMENTS`] drops the overflow, which may be the dragged
    /// patient itself.
    pub fn reassign(&mut self, patient: PatientId, nurse: StaffId, slot_index: usize) -> Transition {
        if slot_index >= MAX_ASSIGNMENTS
            || !self.patients.iter().any(|p| p.id == patient)
            || !self.nurses.iter().any(|n| n.id == nurse)
        {
            return Transition::default();
        }

        let before = self.snapshot();
        for n in self.nurses.iter_mut() {
            remove_from_slots(n, patient);
        }

        let beds = self.bed_numbers();
        let mut dropped = Vec::new();
        if let Some(target) = self.nurses.iter_mut().find(|n| n.id == nurse) {
            let mut ids: Vec<PatientId> = target.assigned().collect();
            ids.push(patient);
            dropped = write_slots(target, ids, &beds);
        }

        let mut transition = self.finish(before);
        transition.dropped.extend(dropped);
        transition
    }

    /// Empty one nurse's card.
    pub fn clear_nurse(&mut self, nurse: StaffId) -> Transition {
        let before = self.snapshot();
        match self.nurses.iter_mut().find(|n| n.id == nurse) {
            Some(n) => n.assigned_patient_ids = [None; MAX_ASSIGNMENTS],
            None => return Transition::default(),
        }
        self.finish(before)
    }

    /// Take one patient off whichever card holds it.
    pub fn unassign_patient(&mut self, patient: PatientId) -> Transition {
        let before = self.snapshot();
        for n in self.nurses.iter_mut() {
            remove_from_slots(n, patient);
        }
        self.finish(before)
    }

    /// Rebalance caseloads across assignable nurses. See [`balance`].
    pub fn balance(&mut self) -> Transition {
        let before = self.snapshot();
        let balanced = balance::balance(self.nurses, self.patients);
        self.nurses.clone_from_slice(&balanced);
        self.finish(before)
    }

    /// Bring both sides back in line with the nurse slots.
    ///
    /// Removes ids of unknown patients, keeps a patient only on the first card
    /// (roster order) that lists it, sorts and pads every card, and rewrites
    /// each patient's `assigned_nurse`. Used after loading saved state.
    pub fn reconcile(&mut self) -> Transition {
        let before = self.snapshot();
        self.finish(before)
    }

    fn finish(&mut self, before: Snapshot) -> Transition {
        let dropped = self.normalize_slots();
        self.sync_patient_side();
        Transition {
            changed: self.snapshot() != before,
            dropped,
        }
    }

    fn normalize_slots(&mut self) -> Vec<PatientId> {
        let beds = self.bed_numbers();
        let mut seen: HashSet<PatientId> = HashSet::new();
        let mut dropped = Vec::new();
        for n in self.nurses.iter_mut() {
            let ids: Vec<PatientId> = n
                .assigned()
                .filter(|id| beds.contains_key(id) && !seen.contains(id))
                .collect();
            dropped.extend(write_slots(n, ids, &beds));
            seen.extend(n.assigned());
        }
        dropped
    }

    fn sync_patient_side(&mut self) {
        let owners: HashMap<PatientId, &str> = self
            .nurses
            .iter()
            .flat_map(|n| n.assigned().map(move |id| (id, n.name.as_str())))
            .collect();
        for p in self.patients.iter_mut() {
            p.assigned_nurse = owners.get(&p.id).map(|name| name.to_string());
        }
    }

    fn bed_numbers(&self) -> HashMap<PatientId, u32> {
        self.patients.iter().map(|p| (p.id, p.bed_number)).collect()
    }

    fn snapshot(&self) -> Snapshot {
        (
            self.nurses.iter().map(|n| n.assigned_patient_ids).collect(),
            self.patients.iter().map(|p| p.assigned_nurse.clone()).collect(),
        )
    }
}

fn remove_from_slots(nurse: &mut Nurse, patient: PatientId) {
    for slot in nurse.assigned_patient_ids.iter_mut() {
        if *slot == Some(patient) {
            *slot = None;
        }
    }
}

/// Write `ids` to the card sorted by bed number, padded with empty slots.
/// Returns whatever did not fit.
fn write_slots(nurse: &mut Nurse, mut ids: Vec<PatientId>, beds: &HashMap<PatientId, u32>) -> Vec<PatientId> {
    ids.sort_by_key(|id| (beds.get(id).copied().unwrap_or(u32::MAX), *id));
    ids.dedup();
    let overflow = if ids.len() > MAX_ASSIGNMENTS {
        ids.split_off(MAX_ASSIGNMENTS)
    } else {
        Vec::new()
    };
    nurse.assigned_patient_ids = [None; MAX_ASSIGNMENTS];
    for (slot, id) in nurse.assigned_patient_ids.iter_mut().zip(ids) {
        *slot = Some(id);
    }
    overflow
}

/// Check that the two sides agree and every card is within capacity and
/// sorted. Returns a description of each violation.
pub fn check_consistency(patients: &[Patient], nurses: &[Nurse]) -> Vec<String> {
    let mut problems = Vec::new();
    let beds: HashMap<PatientId, u32> = patients.iter().map(|p| (p.id, p.bed_number)).collect();

    for n in nurses {
        let ids: Vec<PatientId> = n.assigned().collect();
        let filled = n.assigned_patient_ids.iter().take_while(|s| s.is_some()).count();
        if filled != ids.len() {
            problems.push(format!("nurse {} has empty slots before filled ones", n.name));
        }
        let order: Vec<u32> = ids.iter().filter_map(|id| beds.get(id).copied()).collect();
        if order.windows(2).any(|w| w[0] > w[1]) {
            problems.push(format!("nurse {} slots are not sorted by bed", n.name));
        }
    }

    for p in patients {
        let holders: Vec<&Nurse> = nurses.iter().filter(|n| n.holds(p.id)).collect();
        match (&p.assigned_nurse, holders.as_slice()) {
            (None, []) => {}
            (Some(name), [n]) if *name == n.name => {}
            (assigned, holders) => problems.push(format!(
                "bed {} names {:?} but is held by {:?}",
                p.bed_number,
                assigned,
                holders.iter().map(|n| n.name.as_str()).collect::<Vec<_>>()
            )),
        }
    }
    problems
}
