//! Seed staffing: nurse roster and spectra pool

use census_logic::grid::{GridPos, GridSize, NURSE_CARD};
use census_logic::model::{Nurse, Patient, StaffId, StaffRole};
use census_logic::placement::{find_slot, Occupancy};
use census_logic::spectra::{Spectra, SpectraPool};

/// Seed nurses: name, role, preset column on row 2, device
static SEED_NURSES: &[(&str, StaffRole, u16, &str)] = &[
    ("Grace Okafor", StaffRole::StaffNurse, 3, "SPEC-1120"),
    ("Henry Lindqvist", StaffRole::StaffNurse, 4, "SPEC-1121"),
    ("Imani Reyes", StaffRole::StaffNurse, 5, "SPEC-1122"),
    ("Jonah Whitaker", StaffRole::StaffNurse, 6, "SPEC-1123"),
    ("Keiko Marsh", StaffRole::FloatPoolNurse, 7, "SPEC-1124"),
    ("Luis Beaumont", StaffRole::TravelNurse, 8, "SPEC-1125"),
];

/// Seed device ids and service status
static SEED_SPECTRA: &[(&str, bool)] = &[
    ("SPEC-1120", true),
    ("SPEC-1121", true),
    ("SPEC-1122", true),
    ("SPEC-1123", true),
    ("SPEC-1124", true),
    ("SPEC-1125", true),
    ("SPEC-1126", true),
    ("SPEC-1127", false),
];

/// The six seed nurses
///
/// Each takes its preset cell when that card footprint is free on this
/// board; otherwise it goes through the normal slot search.
pub fn seed_nurses(grid: GridSize, patients: &[Patient]) -> Vec<Nurse> {
    let mut nurses: Vec<Nurse> = Vec::with_capacity(SEED_NURSES.len());
    for (i, &(name, role, column, spectra)) in SEED_NURSES.iter().enumerate() {
        let preset = GridPos::new(2, column);
        let occupancy = Occupancy::build(grid, patients, &nurses, &[], None);
        let cell = if occupancy.is_free(preset, NURSE_CARD) {
            Some(preset)
        } else {
            find_slot(grid, patients, &nurses, &[], NURSE_CARD)
        };
        // A board with no room left simply seeds fewer nurses.
        if let Some(cell) = cell {
            nurses.push(Nurse::new(StaffId(i as u32 + 1), name, role, cell).with_spectra(spectra));
        }
    }
    nurses
}

/// The seed device pool: eight devices, one out of service
pub fn seed_spectra() -> SpectraPool {
    SpectraPool::new(
        SEED_SPECTRA
            .iter()
            .map(|&(id, in_service)| Spectra::new(id, in_service))
            .collect(),
    )
}
