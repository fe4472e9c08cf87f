//! Integration tests for the unit session.
//!
//! Drives a full session through layouts, census edits, staffing, and
//! persistence, checking the board stays sound after every step.

use census_core::prelude::*;
use census_core::generation::BedPlacement;
use census_logic::constants::MAX_ASSIGNMENTS;
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ── Helpers ────────────────────────────────────────────────────────────

fn config(seed: u64) -> UnitConfig {
    UnitConfig {
        seed: Some(seed),
        ..Default::default()
    }
}

fn open(seed: u64) -> UnitSession<MemoryStorage> {
    UnitSession::open(config(seed), MemoryStorage::new()).unwrap()
}

fn form(name: &str) -> PatientForm {
    PatientForm {
        name: Some(name.to_string()),
        diagnosis: Some("Pneumonia".into()),
        ..Default::default()
    }
}

fn vacant_beds(s: &UnitSession<MemoryStorage>) -> Vec<u32> {
    s.patients()
        .iter()
        .filter(|p| p.is_vacant() && !p.is_blocked)
        .map(|p| p.bed_number)
        .collect()
}

fn active_ids(s: &UnitSession<MemoryStorage>) -> Vec<PatientId> {
    s.patients()
        .iter()
        .filter(|p| p.is_active())
        .map(|p| p.id)
        .collect()
}

fn assert_sound(s: &UnitSession<MemoryStorage>) {
    let problems = s.audit();
    assert!(problems.is_empty(), "{problems:?}");
    for n in s.nurses() {
        assert!(n.load() <= MAX_ASSIGNMENTS);
        // Filled slots first, sorted by bed, then empties.
        let filled = n.assigned_patient_ids.iter().take_while(|slot| slot.is_some()).count();
        assert_eq!(filled, n.load(), "nurse {} has a gap in slots", n.name);
        let beds: Vec<u32> = n
            .assigned()
            .map(|id| s.patients().iter().find(|p| p.id == id).unwrap().bed_number)
            .collect();
        assert!(beds.windows(2).all(|w| w[0] < w[1]), "nurse {} slots {beds:?}", n.name);
    }
}

// ── Census and staffing sweep ──────────────────────────────────────────

#[test]
fn random_operations_keep_board_sound() {
    let mut s = open(21);
    s.create_layout("Overflow", BedPlacement::Banks).unwrap();
    let mut rng = StdRng::seed_from_u64(99);
    let mut added = 0;

    for step in 0..800 {
        let nurse_ids: Vec<StaffId> = s.nurses().iter().map(|n| n.id).collect();
        let bed = rng.gen_range(0..56);
        match rng.gen_range(0..16) {
            0 => {
                if let Some(&bed) = vacant_beds(&s).first() {
                    let _ = s.admit_patient(bed, form(&format!("Patient {step}")));
                }
            }
            1 => {
                let _ = s.discharge(bed);
            }
            2 => {
                let pos = GridPos::new(rng.gen_range(0..14), rng.gen_range(0..16));
                if let Some(&id) = nurse_ids.get(rng.gen_range(0..8)) {
                    let _ = s.move_staff(StaffRef::Nurse(id), pos);
                }
            }
            3 => {
                let _ = s.balance_assignments();
            }
            4 => {
                added += 1;
                let _ = s.add_tech(NewTech {
                    name: format!("Tech {added}"),
                    spectra: None,
                });
            }
            5 => {
                if let Some(&id) = nurse_ids.get(rng.gen_range(0..8)) {
                    let _ = s.clear_assignments(id);
                }
            }
            6 => {
                let _ = s.set_blocked(bed, rng.gen_bool(0.5));
            }
            7 => {
                let _ = s.transfer(bed, rng.gen_range(0..56));
            }
            8 => {
                let id = PatientId(rng.gen_range(0..56));
                let pos = GridPos::new(rng.gen_range(0..14), rng.gen_range(0..16));
                let _ = s.move_patient(id, pos);
            }
            9 => {
                let _ = s.create_room(&format!("5{step:03}"));
            }
            10 => {
                let _ = s.delete_room(bed);
            }
            11 => {
                added += 1;
                let _ = s.add_nurse(NewNurse {
                    name: format!("Nurse {added}"),
                    role: StaffRole::all()[rng.gen_range(0..5)],
                    spectra: None,
                });
            }
            12 => {
                if let Some(&id) = nurse_ids.get(rng.gen_range(0..10)) {
                    let _ = s.remove_nurse(id);
                }
            }
            13 => {
                let other = if s.layout_name() == "default" { "Overflow" } else { "default" };
                s.switch_layout(other).unwrap();
            }
            14 => {
                let backend = s.store().backend().clone();
                s = UnitSession::open(config(step), backend).unwrap();
            }
            _ => {
                let patients = active_ids(&s);
                if !patients.is_empty() && !nurse_ids.is_empty() {
                    let p = patients[rng.gen_range(0..patients.len())];
                    let n = nurse_ids[rng.gen_range(0..nurse_ids.len())];
                    let _ = s.reassign(p, n, rng.gen_range(0..=MAX_ASSIGNMENTS));
                }
            }
        }
        assert_sound(&s);
    }
}

#[test]
fn balance_is_fair_after_census_churn() {
    let mut s = open(4);
    for bed in vacant_beds(&s).into_iter().take(10) {
        s.admit_patient(bed, form(&format!("Admit {bed}"))).unwrap();
    }
    s.balance_assignments().unwrap();

    let assignable: Vec<usize> = s
        .nurses()
        .iter()
        .filter(|n| n.role.is_assignable())
        .map(|n| n.load())
        .collect();
    let max = assignable.iter().max().unwrap();
    let min = assignable.iter().min().unwrap();
    assert!(max - min <= 1, "{assignable:?}");

    let capacity = assignable.len() * MAX_ASSIGNMENTS;
    let active = active_ids(&s).len();
    assert_eq!(assignable.iter().sum::<usize>(), active.min(capacity));
    assert_sound(&s);
}

#[test]
fn overflowing_a_card_reports_dropped() {
    let mut s = open(8);
    let nurse = s.nurses()[0].id;
    let patients = active_ids(&s);
    assert!(patients.len() > MAX_ASSIGNMENTS);

    let mut dropped = Vec::new();
    for &p in patients.iter().take(MAX_ASSIGNMENTS + 1) {
        dropped.extend(s.reassign(p, nurse, 0).unwrap().dropped);
    }
    assert_eq!(s.nurses()[0].load(), MAX_ASSIGNMENTS);
    assert_eq!(dropped.len(), 1);
    let p = s.patients().iter().find(|p| p.id == dropped[0]).unwrap();
    assert_eq!(p.assigned_nurse, None);
    assert_sound(&s);
}

#[test]
fn reassign_ignores_vacant_and_bad_slots() {
    let mut s = open(8);
    let nurse = s.nurses()[0].id;
    let vacant = s.patients().iter().find(|p| p.is_vacant()).unwrap().id;
    let active = active_ids(&s)[0];

    assert!(!s.reassign(vacant, nurse, 0).unwrap().changed);
    assert!(!s.reassign(active, nurse, MAX_ASSIGNMENTS).unwrap().changed);
    assert!(!s.reassign(active, StaffId(999), 0).unwrap().changed);
    assert_eq!(s.nurses()[0].load(), 0);
}

#[test]
fn slot_search_clusters_new_staff() {
    let mut s = open(3);
    let id = s
        .add_tech(NewTech {
            name: "Ray".into(),
            spectra: None,
        })
        .unwrap();
    let tech = s.techs().iter().find(|t| t.id == id).unwrap();
    // Seed nurses stand at (2,3)..(2,8); the first free neighbor is left of the first card.
    assert_eq!(tech.grid, GridPos::new(2, 2));
}

#[test]
fn spectra_guard_leaves_pool_unchanged() {
    let mut s = open(5);
    let before = s.spectra().clone();
    assert_eq!(
        s.toggle_spectra("SPEC-1122", false),
        Err(CensusError::SpectraInUse("SPEC-1122".into()))
    );
    assert_eq!(s.spectra(), &before);

    s.toggle_spectra("SPEC-1127", true).unwrap();
    s.add_spectra("SPEC-2000").unwrap();
    assert!(matches!(
        s.add_spectra("spec-2000"),
        Err(CensusError::DuplicateName { .. })
    ));
    assert_eq!(s.spectra().devices().len(), 9);
}

#[test]
fn assign_spectra_moves_device() {
    let mut s = open(5);
    let first = s.nurses()[0].id;
    let second = s.nurses()[1].id;
    assert_eq!(
        s.assign_spectra(StaffRef::Nurse(second), Some("SPEC-1120")),
        Err(CensusError::SpectraInUse("SPEC-1120".into()))
    );
    s.assign_spectra(StaffRef::Nurse(first), None).unwrap();
    s.assign_spectra(StaffRef::Nurse(second), Some("spec-1120")).unwrap();
    assert_eq!(s.nurses()[1].spectra.as_deref(), Some("SPEC-1120"));
    assert_eq!(s.nurses()[0].spectra, None);
}

// ── Layouts and persistence ────────────────────────────────────────────

#[test]
fn layout_names_are_unique_case_insensitively() {
    let mut s = open(1);
    s.create_layout("ICU Pod A", BedPlacement::Perimeter).unwrap();
    assert!(matches!(
        s.create_layout("icu pod a", BedPlacement::Banks),
        Err(CoreError::Census(CensusError::DuplicateName { .. }))
    ));
    let names: Vec<String> = s.list_layouts().into_iter().map(|l| l.name).collect();
    assert_eq!(names, vec!["default", "ICU Pod A"]);
}

#[test]
fn switching_layouts_saves_and_restores_positions_and_staffing() {
    let mut s = open(12);
    let nurse = s.nurses()[0].id;
    s.move_staff(StaffRef::Nurse(nurse), GridPos::new(7, 7)).unwrap();
    s.set_charge_nurse(Some("Marta")).unwrap();
    let moved_bed = s.patients()[0].id;
    s.move_patient(moved_bed, GridPos::new(9, 9)).unwrap();

    s.create_layout("Overflow", BedPlacement::Perimeter).unwrap();
    s.switch_layout("overflow").unwrap();
    assert_eq!(s.layout_name(), "Overflow");
    assert_eq!(s.charge_nurse(), None);
    assert_eq!(s.nurses()[0].grid, GridPos::new(2, 3));
    assert_eq!(s.patients()[0].grid, GridPos::new(1, 1));
    assert_sound(&s);

    s.switch_layout("DEFAULT").unwrap();
    assert_eq!(s.nurses()[0].grid, GridPos::new(7, 7));
    assert_eq!(s.charge_nurse(), Some("Marta"));
    assert_eq!(s.patients()[0].grid, GridPos::new(9, 9));
    assert_eq!(s.patients().len(), 48);
    assert_sound(&s);

    assert!(matches!(
        s.switch_layout("Nowhere"),
        Err(CensusError::LayoutNotFound(_))
    ));
    assert!(matches!(
        s.delete_layout("default"),
        Err(CoreError::Census(CensusError::ProtectedLayout(_)))
    ));
    s.delete_layout("Overflow").unwrap();
}

#[test]
fn deleted_and_created_rooms_survive_layout_switch() {
    let mut s = open(12);
    let freed = s
        .patients()
        .iter()
        .find(|p| p.is_vacant() && p.bed_number != 1)
        .map(|p| (p.bed_number, p.grid))
        .unwrap();
    s.delete_room(freed.0).unwrap();
    s.move_patient(PatientId(1), freed.1).unwrap();
    let created = s.create_room("450").unwrap();
    let created_cell = s.patients().iter().find(|p| p.id == created).unwrap().grid;

    s.create_layout("Other", BedPlacement::Perimeter).unwrap();
    s.switch_layout("Other").unwrap();
    s.switch_layout("default").unwrap();

    assert_eq!(s.patients().len(), 48);
    assert!(s.patient_by_bed(freed.0).is_none());
    assert_eq!(s.patients()[0].grid, freed.1);
    let restored = s.patients().iter().find(|p| p.id == created).unwrap();
    assert_eq!((restored.room.as_str(), restored.grid), ("450", created_cell));
    assert_sound(&s);
}

#[test]
fn non_ascii_layout_names_resolve() {
    let mut s = open(1);
    s.create_layout("Ärzte", BedPlacement::Perimeter).unwrap();
    assert!(matches!(
        s.create_layout("ärzte", BedPlacement::Perimeter),
        Err(CoreError::Census(CensusError::DuplicateName { .. }))
    ));
    s.switch_layout("ärzte").unwrap();
    assert_eq!(s.layout_name(), "Ärzte");
    assert!(matches!(
        s.delete_layout("ÄRZTE"),
        Err(CoreError::Census(CensusError::ProtectedLayout(_)))
    ));
}

#[test]
fn reopening_file_storage_restores_layout() {
    let dir = tempfile::tempdir().unwrap();
    let nurse_cell;
    {
        let backend = FileStorage::new(dir.path()).unwrap();
        let mut s = UnitSession::open(config(30), backend).unwrap();
        s.add_nurse(NewNurse {
            name: "Marta Ruiz".into(),
            role: StaffRole::FloatPoolNurse,
            spectra: Some("SPEC-1126".into()),
        })
        .unwrap();
        s.balance_assignments().unwrap();
        nurse_cell = s.nurses().last().unwrap().grid;
    }

    let backend = FileStorage::new(dir.path()).unwrap();
    let s = UnitSession::open(config(31), backend).unwrap();
    let marta = s.nurses().iter().find(|n| n.name == "Marta Ruiz").unwrap();
    assert_eq!(marta.grid, nurse_cell);
    assert_eq!(marta.spectra.as_deref(), Some("SPEC-1126"));
    // Census is regenerated with another seed; every surviving assignment is active.
    for n in s.nurses() {
        for id in n.assigned() {
            assert!(s.patients().iter().any(|p| p.id == id && p.is_active()));
        }
    }
    assert!(s.audit().is_empty());
}

#[test]
fn locked_layout_defers_autosave_until_unlock() {
    let mut s = open(2);
    s.lock();
    assert!(s.is_locked());
    let bed = vacant_beds(&s)[0];
    s.admit_patient(bed, form("Ada Quinn")).unwrap();
    assert!(s.is_dirty());
    assert_eq!(
        s.add_spectra("SPEC-3000"),
        Err(CensusError::LayoutLocked)
    );

    s.unlock();
    assert!(!s.is_dirty());
    assert!(s.last_persist_error().is_none());
}

#[test]
fn autosave_failure_is_reported_not_rolled_back() {
    let mut s = open(2);
    s.store_mut().backend_mut().set_available(false);
    let nurse = s.nurses()[0].id;
    s.move_staff(StaffRef::Nurse(nurse), GridPos::new(8, 8)).unwrap();

    assert_eq!(s.nurses()[0].grid, GridPos::new(8, 8));
    assert!(matches!(s.last_persist_error(), Some(StorageError::Unavailable)));
    assert!(s.flush().is_err());

    s.store_mut().backend_mut().set_available(true);
    s.flush().unwrap();
    assert!(!s.is_dirty());
}

#[test]
fn export_then_import_restores_session() {
    let mut s = open(40);
    s.balance_assignments().unwrap();
    s.set_unit_clerk(Some("Pat")).unwrap();
    let mut buffer = Vec::new();
    s.export(&mut buffer).unwrap();

    let mut other = open(41);
    other.import(buffer.as_slice()).unwrap();
    assert_eq!(other.patients(), s.patients());
    assert_eq!(other.nurses(), s.nurses());
    assert_eq!(other.unit_clerk(), Some("Pat"));
    assert_sound(&other);
}

#[test]
fn publish_shift_snapshot_to_sink() {
    let mut s = open(6);
    s.set_charge_nurse(Some("Marta")).unwrap();
    s.balance_assignments().unwrap();

    let mut sink = MemorySink::new();
    let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    let snapshot = s.publish_shift_snapshot(&mut sink, date, Shift::Day).unwrap();
    assert_eq!(snapshot.key(), "default-2024-05-01-day");
    assert_eq!(sink.get(&snapshot.key()), Some(&snapshot));
    assert_eq!(snapshot.charge_nurse.as_deref(), Some("Marta"));

    let listed: usize = snapshot.assignments.iter().map(|a| a.patients.len()).sum();
    let assigned = s.patients().iter().filter(|p| p.assigned_nurse.is_some()).count();
    assert_eq!(listed, assigned);

    let sheet = render_assignment_sheet(&snapshot);
    assert!(sheet.contains("Charge nurse: Marta"));
}
