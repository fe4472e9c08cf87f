//! Seed census generation

use chrono::{Duration, Local};
use rand::Rng;
use serde::{Deserialize, Serialize};

use census_logic::grid::{perimeter_cells, GridPos, GridSize, PATIENT_CARD};
use census_logic::model::{Patient, PatientId, RiskFlags};
use census_logic::placement::{find_bed_slot, Occupancy, Occupant};

use super::names::{generate_name, pick};

/// How a layout arranges beds when it has no saved positions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BedPlacement {
    /// Beds ring the board clockwise from the top-left corner
    #[default]
    Perimeter,
    /// Beds fill rows from the outside in: top, bottom, second, second-to-last...
    Banks,
}

impl BedPlacement {
    /// Preferred bed cells in placement order
    pub fn cells(self, grid: GridSize) -> Vec<GridPos> {
        match self {
            BedPlacement::Perimeter => perimeter_cells(grid),
            BedPlacement::Banks => {
                let mut rows = Vec::with_capacity(grid.rows as usize);
                let (mut top, mut bottom) = (1, grid.rows);
                while top <= bottom {
                    rows.push(top);
                    if top != bottom {
                        rows.push(bottom);
                    }
                    top += 1;
                    bottom -= 1;
                }
                rows.into_iter()
                    .flat_map(|r| (1..=grid.columns).map(move |c| GridPos::new(r, c)))
                    .collect()
            }
        }
    }
}

// Probability of each risk flag on an occupied bed
const FALL_RISK_CHANCE: f64 = 0.30;
const ISOLATION_CHANCE: f64 = 0.15;
const TELEMETRY_CHANCE: f64 = 0.25;
const SITTER_CHANCE: f64 = 0.05;
const OCCUPANCY_CHANCE: f64 = 0.5;

static DIAGNOSES: &[&str] = &[
    "CHF exacerbation",
    "Pneumonia",
    "COPD exacerbation",
    "Sepsis",
    "Cellulitis",
    "DKA",
    "GI bleed",
    "Post-op hip replacement",
    "Acute kidney injury",
    "Syncope",
    "Chest pain, rule out MI",
    "Pancreatitis",
];

static PHYSICIANS: &[&str] = &[
    "Dr. Alvarez",
    "Dr. Becker",
    "Dr. Chowdhury",
    "Dr. Duarte",
    "Dr. Eriksen",
    "Dr. Fujita",
];

static DIETS: &[&str] = &["Regular", "Cardiac", "Diabetic", "NPO", "Clear liquids", "Renal"];

static MOBILITY: &[&str] = &["Independent", "Standby assist", "Assist x1", "Assist x2", "Bedrest"];

static CODE_STATUSES: &[&str] = &["Full Code", "Full Code", "Full Code", "DNR", "DNR/DNI", "DNI"];

static LDAS: &[&str] = &["PIV", "PICC", "Foley", "NG tube", "JP drain", "Central line"];

/// Room designation printed on the door for a bed number
pub fn room_designation(bed_number: u32) -> String {
    format!("4{bed_number:02}")
}

/// Generate the seed census: `count` beds, about half occupied
///
/// Bed cells come from `placement`; beds beyond its sequence take the first
/// free row-major cell, and beds that cannot be placed at all share (1, 1).
pub fn generate_patients(
    count: usize,
    grid: GridSize,
    placement: BedPlacement,
    rng: &mut impl Rng,
) -> Vec<Patient> {
    let preferred = placement.cells(grid);
    let mut occupancy = Occupancy::new(grid);
    let today = Local::now().date_naive();

    let mut patients = Vec::with_capacity(count);
    for i in 0..count {
        let bed_number = i as u32 + 1;
        let id = PatientId(bed_number);
        let cell = find_bed_slot(&occupancy, grid, &preferred).unwrap_or(GridPos::new(1, 1));
        occupancy.mark(cell, PATIENT_CARD, Occupant::Patient(id));

        let mut patient = Patient::vacant(id, bed_number, room_designation(bed_number), cell);
        if rng.gen_bool(OCCUPANCY_CHANCE) {
            fill_demographics(&mut patient, rng);
            let days_ago = rng.gen_range(0..10);
            patient.admit_date = Some((today - Duration::days(days_ago)).to_string());
        }
        patients.push(patient);
    }
    patients
}

fn fill_demographics(patient: &mut Patient, rng: &mut impl Rng) {
    patient.name = generate_name(rng);
    patient.age = Some(rng.gen_range(19..=97));
    patient.gender = Some(pick(rng, &["F", "M"]).to_string());
    patient.diagnosis = pick(rng, DIAGNOSES).to_string();
    patient.physician = pick(rng, PHYSICIANS).to_string();
    patient.diet = pick(rng, DIETS).to_string();
    patient.mobility = pick(rng, MOBILITY).to_string();
    patient.set_code_status(pick(rng, CODE_STATUSES));
    patient.ldas = LDAS
        .iter()
        .filter(|_| rng.gen_bool(0.25))
        .map(|s| s.to_string())
        .collect();
    patient.risks = RiskFlags {
        fall_risk: rng.gen_bool(FALL_RISK_CHANCE),
        isolation: rng.gen_bool(ISOLATION_CHANCE),
        telemetry: rng.gen_bool(TELEMETRY_CHANCE),
        sitter: rng.gen_bool(SITTER_CHANCE),
    };
}
