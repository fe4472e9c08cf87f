//! Census records: patients (beds), nurses, and patient care techs.
//!
//! These are plain data. The only cross-record rule, that a patient's
//! `assigned_nurse` agrees with the nurse's slot array, is enforced by
//! [`crate::assignment::AssignmentLedger`]; nothing here mutates both sides.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{MAX_ASSIGNMENTS, VACANT};
use crate::grid::GridPos;

/// Stable identity of a bed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientId(pub u32);

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Stable identity of a nurse or tech card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaffId(pub u32);

impl fmt::Display for StaffId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Safety flags shown on a bed card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFlags {
    pub fall_risk: bool,
    pub isolation: bool,
    pub telemetry: bool,
    pub sitter: bool,
}

/// One bed on the unit. An empty bed is the sentinel record named [`VACANT`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: PatientId,
    pub bed_number: u32,
    /// Room designation as printed on the door, e.g. `"412"`.
    pub room: String,

    pub name: String,
    pub age: Option<u8>,
    pub gender: Option<String>,
    pub diagnosis: String,
    pub physician: String,
    /// ISO-8601 date the patient arrived on the unit.
    pub admit_date: Option<String>,

    pub diet: String,
    pub mobility: String,
    pub code_status: String,
    /// Derived from `code_status`; see [`Patient::set_code_status`].
    pub comfort_care: bool,
    pub ldas: Vec<String>,
    pub risks: RiskFlags,
    pub notes: String,

    /// Name of the nurse holding this bed, mirrored from the nurse side.
    pub assigned_nurse: Option<String>,
    pub grid: GridPos,
    /// Room taken out of service.
    pub is_blocked: bool,
}

impl Patient {
    /// An empty, unblocked bed.
    pub fn vacant(id: PatientId, bed_number: u32, room: impl Into<String>, grid: GridPos) -> Self {
        Self {
            id,
            bed_number,
            room: room.into(),
            name: VACANT.to_string(),
            age: None,
            gender: None,
            diagnosis: String::new(),
            physician: String::new(),
            admit_date: None,
            diet: String::new(),
            mobility: String::new(),
            code_status: String::new(),
            comfort_care: false,
            ldas: Vec::new(),
            risks: RiskFlags::default(),
            notes: String::new(),
            assigned_nurse: None,
            grid,
            is_blocked: false,
        }
    }

    pub fn is_vacant(&self) -> bool {
        self.name == VACANT
    }

    /// Occupied and in service: the beds that count toward nurse caseloads.
    pub fn is_active(&self) -> bool {
        !self.is_vacant() && !self.is_blocked
    }

    /// Numeric portion of the room designation (`"4B12"` → 412).
    pub fn room_number(&self) -> Option<u32> {
        let digits: String = self.room.chars().filter(char::is_ascii_digit).collect();
        digits.parse().ok()
    }

    /// Sort key for walking the census in room order; beds without a numeric
    /// room sort last, ties broken by bed number.
    pub fn room_order_key(&self) -> (u32, u32) {
        (self.room_number().unwrap_or(u32::MAX), self.bed_number)
    }

    pub fn set_code_status(&mut self, code_status: impl Into<String>) {
        self.code_status = code_status.into();
        self.comfort_care = self.code_status.contains("DNR");
    }

    /// Wipe everything except bed identity, position, and the blocked flag.
    pub fn reset_to_vacant(&mut self) {
        let blocked = self.is_blocked;
        *self = Self::vacant(self.id, self.bed_number, std::mem::take(&mut self.room), self.grid);
        self.is_blocked = blocked;
    }
}

/// Form payload for admitting or editing a bed. `None` leaves a field as-is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientForm {
    pub name: Option<String>,
    pub age: Option<u8>,
    pub gender: Option<String>,
    pub diagnosis: Option<String>,
    pub physician: Option<String>,
    pub admit_date: Option<String>,
    pub diet: Option<String>,
    pub mobility: Option<String>,
    pub code_status: Option<String>,
    pub ldas: Option<Vec<String>>,
    pub risks: Option<RiskFlags>,
    pub notes: Option<String>,
}

impl PatientForm {
    /// Merge the supplied fields into `patient`.
    pub fn apply(self, patient: &mut Patient) {
        if let Some(v) = self.name {
            patient.name = v;
        }
        if let Some(v) = self.age {
            patient.age = Some(v);
        }
        if let Some(v) = self.gender {
            patient.gender = Some(v);
        }
        if let Some(v) = self.diagnosis {
            patient.diagnosis = v;
        }
        if let Some(v) = self.physician {
            patient.physician = v;
        }
        if let Some(v) = self.admit_date {
            patient.admit_date = Some(v);
        }
        if let Some(v) = self.diet {
            patient.diet = v;
        }
        if let Some(v) = self.mobility {
            patient.mobility = v;
        }
        if let Some(v) = self.code_status {
            patient.set_code_status(v);
        }
        if let Some(v) = self.ldas {
            patient.ldas = v;
        }
        if let Some(v) = self.risks {
            patient.risks = v;
        }
        if let Some(v) = self.notes {
            patient.notes = v;
        }
    }
}

/// Fixed staff-role enumeration for nurse cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StaffRole {
    #[serde(rename = "Staff Nurse")]
    StaffNurse,
    #[serde(rename = "Float Pool Nurse")]
    FloatPoolNurse,
    #[serde(rename = "Travel Nurse")]
    TravelNurse,
    #[serde(rename = "Orientee")]
    Orientee,
    #[serde(rename = "Resource Nurse")]
    ResourceNurse,
}

impl StaffRole {
    pub fn all() -> &'static [StaffRole] {
        &[
            StaffRole::StaffNurse,
            StaffRole::FloatPoolNurse,
            StaffRole::TravelNurse,
            StaffRole::Orientee,
            StaffRole::ResourceNurse,
        ]
    }

    pub fn label(self) -> &'static str {
        match self {
            StaffRole::StaffNurse => "Staff Nurse",
            StaffRole::FloatPoolNurse => "Float Pool Nurse",
            StaffRole::TravelNurse => "Travel Nurse",
            StaffRole::Orientee => "Orientee",
            StaffRole::ResourceNurse => "Resource Nurse",
        }
    }

    /// Roles that take part in automatic caseload balancing.
    pub fn is_assignable(self) -> bool {
        matches!(self, StaffRole::StaffNurse | StaffRole::FloatPoolNurse)
    }
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A nurse card. Slots are positional and kept sorted by bed number with
/// empty slots trailing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nurse {
    pub id: StaffId,
    pub name: String,
    pub role: StaffRole,
    pub spectra: Option<String>,
    pub assigned_patient_ids: [Option<PatientId>; MAX_ASSIGNMENTS],
    pub grid: GridPos,
}

impl Nurse {
    pub fn new(id: StaffId, name: impl Into<String>, role: StaffRole, grid: GridPos) -> Self {
        Self {
            id,
            name: name.into(),
            role,
            spectra: None,
            assigned_patient_ids: [None; MAX_ASSIGNMENTS],
            grid,
        }
    }

    pub fn with_spectra(mut self, spectra: impl Into<String>) -> Self {
        self.spectra = Some(spectra.into());
        self
    }

    /// Non-empty slots in slot order.
    pub fn assigned(&self) -> impl Iterator<Item = PatientId> + '_ {
        self.assigned_patient_ids.iter().flatten().copied()
    }

    pub fn load(&self) -> usize {
        self.assigned().count()
    }

    pub fn holds(&self, patient: PatientId) -> bool {
        self.assigned_patient_ids.contains(&Some(patient))
    }
}

/// A patient care tech card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientCareTech {
    pub id: StaffId,
    pub name: String,
    pub spectra: Option<String>,
    /// Derived label, recomputed from the census; never edited directly.
    pub assignment_group: String,
    pub grid: GridPos,
}

impl PatientCareTech {
    pub fn new(id: StaffId, name: impl Into<String>, grid: GridPos) -> Self {
        Self {
            id,
            name: name.into(),
            spectra: None,
            assignment_group: String::new(),
            grid,
        }
    }
}

/// Handle to a staff card of either kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StaffRef {
    Nurse(StaffId),
    Tech(StaffId),
}
