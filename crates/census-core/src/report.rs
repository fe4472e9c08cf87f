//! Shift reports: the published assignment snapshot and plain-text sheets

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};

use census_logic::model::{Nurse, Patient, PatientCareTech, StaffRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shift {
    Day,
    Night,
}

impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shift::Day => f.write_str("day"),
            Shift::Night => f.write_str("night"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedPatient {
    pub room: String,
    pub patient_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NurseAssignmentSummary {
    pub nurse: String,
    pub role: StaffRole,
    pub patients: Vec<AssignedPatient>,
}

/// The assignment document published to the remote store at shift change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftSnapshot {
    pub layout_name: String,
    pub date: NaiveDate,
    pub shift: Shift,
    pub charge_nurse: Option<String>,
    pub assignments: Vec<NurseAssignmentSummary>,
    pub timestamp: DateTime<Utc>,
}

impl ShiftSnapshot {
    /// Summarize every nurse card, slots in bed order
    pub fn build(
        layout_name: &str,
        date: NaiveDate,
        shift: Shift,
        charge_nurse: Option<&str>,
        patients: &[Patient],
        nurses: &[Nurse],
        timestamp: DateTime<Utc>,
    ) -> Self {
        let assignments = nurses
            .iter()
            .map(|n| NurseAssignmentSummary {
                nurse: n.name.clone(),
                role: n.role,
                patients: n
                    .assigned()
                    .filter_map(|id| patients.iter().find(|p| p.id == id))
                    .map(|p| AssignedPatient {
                        room: p.room.clone(),
                        patient_name: p.name.clone(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            layout_name: layout_name.to_string(),
            date,
            shift,
            charge_nurse: charge_nurse.map(str::to_string),
            assignments,
            timestamp,
        }
    }

    /// Document key: `{layout}-{date}-{shift}`
    pub fn key(&self) -> String {
        format!("{}-{}-{}", self.layout_name, self.date, self.shift)
    }
}

/// Per-nurse assignment sheet for printing
pub fn render_assignment_sheet(snapshot: &ShiftSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} - {} {} shift",
        snapshot.layout_name, snapshot.date, snapshot.shift
    );
    let _ = writeln!(
        out,
        "Charge nurse: {}",
        snapshot.charge_nurse.as_deref().unwrap_or("(none)")
    );

    for summary in &snapshot.assignments {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{} ({}) - {} patient(s)",
            summary.nurse,
            summary.role,
            summary.patients.len()
        );
        for p in &summary.patients {
            let _ = writeln!(out, "  {:>5}  {}", p.room, p.patient_name);
        }
    }
    out
}

/// Bed-by-bed census listing with assignments and flags
pub fn render_census(patients: &[Patient], techs: &[PatientCareTech]) -> String {
    let mut out = String::new();
    let mut rows: Vec<&Patient> = patients.iter().collect();
    rows.sort_by_key(|p| p.room_order_key());

    let occupied = patients.iter().filter(|p| !p.is_vacant()).count();
    let blocked = patients.iter().filter(|p| p.is_blocked).count();
    let _ = writeln!(
        out,
        "Census: {occupied} occupied, {} vacant, {blocked} blocked",
        patients.len() - occupied
    );

    for p in rows {
        let status = if p.is_blocked {
            "BLOCKED".to_string()
        } else if p.is_vacant() {
            "vacant".to_string()
        } else {
            p.name.clone()
        };
        let mut flags = Vec::new();
        if p.risks.fall_risk {
            flags.push("fall");
        }
        if p.risks.isolation {
            flags.push("iso");
        }
        if p.risks.telemetry {
            flags.push("tele");
        }
        if p.risks.sitter {
            flags.push("sitter");
        }
        if p.comfort_care {
            flags.push("comfort");
        }
        let _ = writeln!(
            out,
            "{:>5}  {:<24} {:<20} {}",
            p.room,
            status,
            p.assigned_nurse.as_deref().unwrap_or("-"),
            flags.join(",")
        );
    }

    if !techs.is_empty() {
        let _ = writeln!(out);
        for t in techs {
            let _ = writeln!(out, "PCT {}: {}", t.name, t.assignment_group);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use census_logic::grid::GridPos;
    use census_logic::model::{PatientId, StaffId};

    fn census() -> (Vec<Patient>, Vec<Nurse>) {
        let mut patients: Vec<Patient> = (1..=3)
            .map(|i| Patient::vacant(PatientId(i), i, format!("40{i}"), GridPos::new(1, i as u16)))
            .collect();
        patients[0].name = "Ada Quinn".into();
        patients[2].name = "Bo Lund".into();
        patients[2].risks.fall_risk = true;

        let mut nurse = Nurse::new(StaffId(1), "Grace", StaffRole::StaffNurse, GridPos::new(2, 2));
        nurse.assigned_patient_ids[0] = Some(PatientId(1));
        nurse.assigned_patient_ids[1] = Some(PatientId(3));
        patients[0].assigned_nurse = Some("Grace".into());
        patients[2].assigned_nurse = Some("Grace".into());
        (patients, vec![nurse])
    }

    fn snapshot() -> ShiftSnapshot {
        let (patients, nurses) = census();
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        ShiftSnapshot::build(
            "ICU Pod A",
            date,
            Shift::Night,
            Some("Marta"),
            &patients,
            &nurses,
            Utc::now(),
        )
    }

    #[test]
    fn test_snapshot_key_and_contents() {
        let snap = snapshot();
        assert_eq!(snap.key(), "ICU Pod A-2024-03-09-night");
        assert_eq!(snap.assignments.len(), 1);
        let rooms: Vec<&str> = snap.assignments[0]
            .patients
            .iter()
            .map(|p| p.room.as_str())
            .collect();
        assert_eq!(rooms, vec!["401", "403"]);
    }

    #[test]
    fn test_snapshot_json_shape() {
        let json = serde_json::to_value(snapshot()).unwrap();
        assert_eq!(json["shift"], "night");
        assert_eq!(json["date"], "2024-03-09");
        assert_eq!(json["assignments"][0]["role"], "Staff Nurse");
    }

    #[test]
    fn test_render_sheet() {
        let sheet = render_assignment_sheet(&snapshot());
        assert!(sheet.starts_with("ICU Pod A - 2024-03-09 night shift"));
        assert!(sheet.contains("Charge nurse: Marta"));
        assert!(sheet.contains("Grace (Staff Nurse) - 2 patient(s)"));
        assert!(sheet.contains("Bo Lund"));
    }

    #[test]
    fn test_render_census() {
        let (mut patients, _) = census();
        patients[1].is_blocked = true;
        let text = render_census(&patients, &[]);
        assert!(text.starts_with("Census: 2 occupied, 1 vacant, 1 blocked"));
        assert!(text.contains("BLOCKED"));
        assert!(text.contains("fall"));
    }
}
