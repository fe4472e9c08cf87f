//! Derived tech assignment groups.
//!
//! Techs split the active beds into contiguous runs in room order. The label
//! is a pure function of the census; it is recomputed after each patient
//! change and written back only when it differs.

use crate::constants::UNASSIGNED_GROUP;
use crate::model::{Patient, PatientCareTech};

/// Group label for each tech, in roster order.
pub fn derive_assignment_groups(patients: &[Patient], techs: &[PatientCareTech]) -> Vec<String> {
    if techs.is_empty() {
        return Vec::new();
    }

    let mut active: Vec<&Patient> = patients.iter().filter(|p| p.is_active()).collect();
    active.sort_by_key(|p| p.room_order_key());

    let chunk = active.len().div_ceil(techs.len()).max(1);
    let mut chunks = active.chunks(chunk);
    techs
        .iter()
        .map(|_| match chunks.next() {
            Some([only]) => format!("Room {}", only.room),
            Some([first, .., last]) => format!("Rooms {}-{}", first.room, last.room),
            _ => UNASSIGNED_GROUP.to_string(),
        })
        .collect()
}

/// Write derived labels onto the techs. Returns whether any label changed.
pub fn apply_assignment_groups(patients: &[Patient], techs: &mut [PatientCareTech]) -> bool {
    let groups = derive_assignment_groups(patients, techs);
    let mut changed = false;
    for (tech, group) in techs.iter_mut().zip(groups) {
        if tech.assignment_group != group {
            tech.assignment_group = group;
            changed = true;
        }
    }
    changed
}
