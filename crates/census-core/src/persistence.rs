//! Session export and import
//!
//! Uses bincode for a compact binary dump of the whole session. Unlike the
//! layout store, which keeps positions only, an export carries every record.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::{Read, Write};

use census_logic::grid::{GridSize, NURSE_CARD, PATIENT_CARD, TECH_CARD};
use census_logic::model::{Nurse, Patient, PatientCareTech};
use census_logic::naming::names_match;
use census_logic::placement::Occupancy;
use census_logic::spectra::SpectraPool;

use crate::error::StorageError;

/// Version number for the export format (increment when the format changes)
const EXPORT_VERSION: u32 = 1;

/// Serializable snapshot of a unit session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    /// Export format version
    pub version: u32,
    pub layout_name: String,
    pub grid: GridSize,
    pub patients: Vec<Patient>,
    pub nurses: Vec<Nurse>,
    pub techs: Vec<PatientCareTech>,
    pub spectra: SpectraPool,
    pub charge_nurse: Option<String>,
    pub unit_clerk: Option<String>,
    pub locked: bool,
}

impl SessionData {
    /// A snapshot stamped with the current format version
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        layout_name: String,
        grid: GridSize,
        patients: Vec<Patient>,
        nurses: Vec<Nurse>,
        techs: Vec<PatientCareTech>,
        spectra: SpectraPool,
        charge_nurse: Option<String>,
        unit_clerk: Option<String>,
        locked: bool,
    ) -> Self {
        Self {
            version: EXPORT_VERSION,
            layout_name,
            grid,
            patients,
            nurses,
            techs,
            spectra,
            charge_nurse,
            unit_clerk,
            locked,
        }
    }

    /// Everything that keeps this snapshot from being a sound board: an
    /// empty grid, repeated ids, bed numbers, staff or device names, cards
    /// off the board, and cards sharing a cell. Stale assignments are not
    /// listed; they are repaired on load.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.grid.cell_count() == 0 {
            problems.push(format!("grid {}x{} has no cells", self.grid.rows, self.grid.columns));
            return problems;
        }

        let mut ids = HashSet::new();
        let mut beds = HashSet::new();
        for p in &self.patients {
            if !ids.insert(p.id) {
                problems.push(format!("patient id {} repeated", p.id));
            }
            if !beds.insert(p.bed_number) {
                problems.push(format!("bed {} repeated", p.bed_number));
            }
            if !self.grid.fits(p.grid, PATIENT_CARD) {
                problems.push(format!("bed {} is off the board at {}", p.bed_number, p.grid));
            }
        }

        let mut staff_ids = HashSet::new();
        for n in &self.nurses {
            if !staff_ids.insert(n.id) {
                problems.push(format!("staff id {} repeated", n.id));
            }
            if !self.grid.fits(n.grid, NURSE_CARD) {
                problems.push(format!("nurse {} is off the board at {}", n.name, n.grid));
            }
        }
        for t in &self.techs {
            if !staff_ids.insert(t.id) {
                problems.push(format!("staff id {} repeated", t.id));
            }
            if !self.grid.fits(t.grid, TECH_CARD) {
                problems.push(format!("tech {} is off the board at {}", t.name, t.grid));
            }
        }
        problems.extend(repeated_names("nurse", self.nurses.iter().map(|n| n.name.as_str())));
        problems.extend(repeated_names(
            "spectra",
            self.spectra.devices().iter().map(|d| d.id.as_str()),
        ));

        let occupancy = Occupancy::build(self.grid, &self.patients, &self.nurses, &self.techs, None);
        problems.extend(
            occupancy
                .overlaps()
                .iter()
                .map(|o| format!("cell {} shared by {:?} and {:?}", o.cell, o.first, o.second)),
        );
        problems
    }
}

fn repeated_names<'a>(kind: &str, names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: Vec<&str> = Vec::new();
    let mut problems = Vec::new();
    for name in names {
        if seen.iter().any(|s| names_match(s, name)) {
            problems.push(format!("{kind} `{name}` repeated"));
        } else {
            seen.push(name);
        }
    }
    problems
}

/// Write a session to any writer
pub fn export_session<W: Write>(writer: W, data: &SessionData) -> Result<(), StorageError> {
    bincode::serialize_into(writer, data)?;
    Ok(())
}

/// Read a session back, rejecting other format versions
pub fn import_session<R: Read>(reader: R) -> Result<SessionData, StorageError> {
    let data: SessionData = bincode::deserialize_from(reader)?;
    if data.version != EXPORT_VERSION {
        return Err(StorageError::VersionMismatch {
            expected: EXPORT_VERSION,
            found: data.version,
        });
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use census_logic::grid::GridPos;
    use census_logic::model::{PatientId, StaffId, StaffRole};
    use census_logic::spectra::Spectra;

    fn sample() -> SessionData {
        let mut patient = Patient::vacant(PatientId(1), 1, "401", GridPos::new(1, 1));
        patient.name = "Ada Quinn".into();
        patient.age = Some(70);
        patient.assigned_nurse = Some("Grace".into());
        let mut nurse = Nurse::new(StaffId(1), "Grace", StaffRole::StaffNurse, GridPos::new(2, 3))
            .with_spectra("SPEC-1120");
        nurse.assigned_patient_ids[0] = Some(PatientId(1));

        SessionData::new(
            "default".into(),
            GridSize::default(),
            vec![patient],
            vec![nurse],
            vec![PatientCareTech::new(StaffId(2), "Ray", GridPos::new(2, 4))],
            SpectraPool::new(vec![Spectra::new("SPEC-1120", true)]),
            Some("Marta".into()),
            None,
            true,
        )
    }

    #[test]
    fn test_export_import() {
        let data = sample();
        let mut buffer = Vec::new();
        export_session(&mut buffer, &data).unwrap();
        let loaded = import_session(buffer.as_slice()).unwrap();
        assert_eq!(loaded, data);
    }

    #[test]
    fn test_version_mismatch() {
        let mut data = sample();
        data.version = EXPORT_VERSION + 1;
        let mut buffer = Vec::new();
        export_session(&mut buffer, &data).unwrap();
        assert!(matches!(
            import_session(buffer.as_slice()),
            Err(StorageError::VersionMismatch { found, .. }) if found == EXPORT_VERSION + 1
        ));
    }

    #[test]
    fn test_sample_is_sound() {
        assert!(sample().problems().is_empty(), "{:?}", sample().problems());
    }

    #[test]
    fn test_problems_found() {
        let mut data = sample();
        let mut twin = data.patients[0].clone();
        twin.grid = GridPos::new(2, 3);
        data.patients.push(twin);
        data.spectra = SpectraPool::new(vec![
            Spectra::new("SPEC-1120", true),
            Spectra::new("spec-1120", false),
        ]);
        data.techs[0].grid = GridPos::new(0, 4);

        let problems = data.problems();
        assert!(problems.iter().any(|p| p.contains("patient id #1 repeated")));
        assert!(problems.iter().any(|p| p.contains("bed 1 repeated")));
        assert!(problems.iter().any(|p| p.contains("spectra `spec-1120` repeated")));
        assert!(problems.iter().any(|p| p.contains("tech Ray is off the board")));
        assert!(problems.iter().any(|p| p.contains("cell (2, 3) shared")));

        data.grid = GridSize::new(0, 14);
        assert_eq!(data.problems().len(), 1);
    }

    #[test]
    fn test_truncated_input() {
        let mut buffer = Vec::new();
        export_session(&mut buffer, &sample()).unwrap();
        buffer.truncate(buffer.len() / 2);
        assert!(matches!(import_session(buffer.as_slice()), Err(StorageError::Bincode(_))));
    }
}
