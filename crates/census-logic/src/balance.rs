//! Automatic nurse caseload balancing.
//!
//! Active beds (occupied, not blocked) are walked in room order and shared
//! across Staff Nurse and Float Pool Nurse cards so that any two loads differ
//! by at most one. Existing assignments are kept where the new quota allows.
//!
//! Ordering rules:
//! - Quotas are `floor(active / nurses)`; the remainder goes one each to the
//!   nurses with the most keepable patients, roster order breaking ties.
//!   Quotas never exceed [`MAX_ASSIGNMENTS`].
//! - Keep pass: nurses in roster order keep their current active patients in
//!   room order, up to quota.
//! - Fill pass: nurses in roster order take patients from one cursor shared
//!   by all nurses, skipping anyone already assigned.
//!
//! Beds held by other roles (orientees, travel and resource nurses) stay
//! where they are and are not part of the pool.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use crate::constants::MAX_ASSIGNMENTS;
use crate::model::{Nurse, Patient, PatientId};

/// Per-nurse target loads for `active` patients over `nurses` cards.
pub fn quotas(active: usize, nurses: usize) -> Vec<usize> {
    if nurses == 0 {
        return Vec::new();
    }
    let base = active / nurses;
    let extra = active % nurses;
    (0..nurses)
        .map(|i| (base + usize::from(i < extra)).min(MAX_ASSIGNMENTS))
        .collect()
}

/// Target load used for display: `ceil(active / nurses)`.
pub fn target_load(active: usize, nurses: usize) -> usize {
    if nurses == 0 {
        0
    } else {
        active.div_ceil(nurses)
    }
}

/// Redistribute active patients across assignable nurses.
///
/// Returns the full roster; nurses outside the assignable roles come back
/// unchanged. Slots are written sorted by bed number. The patient side is not
/// touched, so callers go through
/// [`AssignmentLedger::balance`](crate::assignment::AssignmentLedger::balance)
/// to keep both sides consistent.
pub fn balance(nurses: &[Nurse], patients: &[Patient]) -> Vec<Nurse> {
    let assignable: Vec<usize> = nurses
        .iter()
        .enumerate()
        .filter(|(_, n)| n.role.is_assignable())
        .map(|(i, _)| i)
        .collect();
    if assignable.is_empty() {
        return nurses.to_vec();
    }

    let held_elsewhere: HashSet<PatientId> = nurses
        .iter()
        .filter(|n| !n.role.is_assignable())
        .flat_map(|n| n.assigned())
        .collect();

    let mut active: Vec<&Patient> = patients
        .iter()
        .filter(|p| p.is_active() && !held_elsewhere.contains(&p.id))
        .collect();
    active.sort_by_key(|p| p.room_order_key());

    let rank: HashMap<PatientId, usize> = active
        .iter()
        .enumerate()
        .map(|(i, p)| (p.id, i))
        .collect();

    let keepable: Vec<Vec<PatientId>> = assignable
        .iter()
        .map(|&i| {
            let mut ids: Vec<PatientId> = nurses[i]
                .assigned()
                .filter(|id| rank.contains_key(id))
                .collect();
            ids.sort_by_key(|id| rank[id]);
            ids.dedup();
            ids
        })
        .collect();

    // Remainder quotas go to the nurses who can keep the most.
    let mut by_keepable: Vec<usize> = (0..assignable.len()).collect();
    by_keepable.sort_by_key(|&k| Reverse(keepable[k].len()));
    let ranked_quotas = quotas(active.len(), assignable.len());
    let mut quota = vec![0; assignable.len()];
    for (position, &k) in by_keepable.iter().enumerate() {
        quota[k] = ranked_quotas[position];
    }

    let mut assigned: HashSet<PatientId> = HashSet::new();
    let mut lists: Vec<Vec<PatientId>> = vec![Vec::new(); assignable.len()];

    for (k, kept) in keepable.iter().enumerate() {
        for &id in kept {
            if lists[k].len() >= quota[k] {
                break;
            }
            if assigned.insert(id) {
                lists[k].push(id);
            }
        }
    }

    let mut cursor = 0;
    for (k, list) in lists.iter_mut().enumerate() {
        while list.len() < quota[k] && cursor < active.len() {
            let id = active[cursor].id;
            cursor += 1;
            if assigned.insert(id) {
                list.push(id);
            }
        }
    }

    let beds: HashMap<PatientId, u32> = patients.iter().map(|p| (p.id, p.bed_number)).collect();
    let mut result = nurses.to_vec();
    for (k, mut list) in lists.into_iter().enumerate() {
        list.sort_by_key(|id| (beds[id], *id));
        let slots = &mut result[assignable[k]].assigned_patient_ids;
        *slots = [None; MAX_ASSIGNMENTS];
        for (slot, id) in slots.iter_mut().zip(list) {
            *slot = Some(id);
        }
    }
    result
}
