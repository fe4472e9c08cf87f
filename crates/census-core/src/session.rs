//! Unit session controller
//!
//! [`UnitSession`] owns the authoritative collections for the active layout
//! and is the only place they change. Every mutation validates first, applies
//! in memory, then commits: tech groups are recomputed, the session is marked
//! dirty, and the layout is autosaved unless autosave is off or the layout is
//! locked. A failed save never rolls the in-memory change back; it is logged
//! and kept in [`UnitSession::last_persist_error`].

use chrono::{Local, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::{Read, Write};

use census_logic::assignment::{check_consistency, AssignmentLedger, Transition};
use census_logic::constants::{DEFAULT_LAYOUT, MAX_ASSIGNMENTS, VACANT};
use census_logic::grid::{Footprint, GridPos, GridSize, NURSE_CARD, PATIENT_CARD, TECH_CARD};
use census_logic::model::{
    Nurse, Patient, PatientCareTech, PatientForm, PatientId, StaffId, StaffRef, StaffRole,
};
use census_logic::naming::{names_match, validate_name};
use census_logic::placement::{find_bed_slot, find_slot, validate_move, Occupancy, Occupant};
use census_logic::spectra::{toggle_spectra_status, SpectraPool};
use census_logic::tech_groups::apply_assignment_groups;
use census_logic::{CensusError, Result};

use crate::config::UnitConfig;
use crate::error::{CoreError, StorageError};
use crate::generation::{seed_nurses, seed_spectra, BedPlacement};
use crate::persistence::{export_session, import_session, SessionData};
use crate::remote::SnapshotSink;
use crate::report::{Shift, ShiftSnapshot};
use crate::store::{LayoutRecord, LayoutStore, StaffingSnapshot, StorageBackend};

/// Layout lock state. While locked, grid positions and staffing are frozen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LayoutLock {
    #[default]
    Unlocked,
    Locked,
}

/// A nurse to add to the roster
#[derive(Debug, Clone)]
pub struct NewNurse {
    pub name: String,
    pub role: StaffRole,
    /// Requested device; `None` takes the first available one
    pub spectra: Option<String>,
}

/// A patient care tech to add to the roster
#[derive(Debug, Clone)]
pub struct NewTech {
    pub name: String,
    pub spectra: Option<String>,
}

/// In-memory state of one unit board plus its persistence
pub struct UnitSession<S: StorageBackend> {
    config: UnitConfig,
    store: LayoutStore<S>,
    layout_name: String,
    grid: GridSize,
    patients: Vec<Patient>,
    nurses: Vec<Nurse>,
    techs: Vec<PatientCareTech>,
    spectra: SpectraPool,
    charge_nurse: Option<String>,
    unit_clerk: Option<String>,
    lock: LayoutLock,
    rng: StdRng,
    dirty: bool,
    last_persist_error: Option<StorageError>,
    next_staff_id: u32,
}

impl<S: StorageBackend> UnitSession<S> {
    // ── Lifecycle ──────────────────────────────────────────────────────

    /// Open a session on the configured default layout
    pub fn open(config: UnitConfig, backend: S) -> std::result::Result<Self, CoreError> {
        let problems = config.validate();
        if !problems.is_empty() {
            return Err(CoreError::Config(problems));
        }

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let store = LayoutStore::new(backend, config.bed_count);
        let layout_name = match store.find_layout(&config.default_layout) {
            Some(record) => record.name,
            None => {
                log::warn!(
                    "Layout '{}' is not registered, opening '{DEFAULT_LAYOUT}'",
                    config.default_layout
                );
                DEFAULT_LAYOUT.to_string()
            }
        };

        let mut session = Self {
            grid: config.grid,
            config,
            store,
            layout_name,
            patients: Vec::new(),
            nurses: Vec::new(),
            techs: Vec::new(),
            spectra: SpectraPool::default(),
            charge_nurse: None,
            unit_clerk: None,
            lock: LayoutLock::Unlocked,
            rng,
            dirty: false,
            last_persist_error: None,
            next_staff_id: 1,
        };
        session.load_active_layout();
        log::info!(
            "Opened {} on layout '{}': {} beds, {} nurses",
            session.config.unit_name,
            session.layout_name,
            session.patients.len(),
            session.nurses.len()
        );
        Ok(session)
    }

    fn load_active_layout(&mut self) {
        let name = self.layout_name.clone();
        self.patients = self.store.load_layout(&name, self.grid, &mut self.rng);
        match self.store.load_staffing(&name) {
            Some(snapshot) => {
                self.nurses = snapshot.nurses;
                self.techs = snapshot.techs;
                self.spectra = snapshot.spectra;
                self.charge_nurse = snapshot.charge_nurse;
                self.unit_clerk = snapshot.unit_clerk;
            }
            None => {
                self.nurses = seed_nurses(self.grid, &self.patients);
                self.techs = Vec::new();
                self.spectra = seed_spectra();
                self.charge_nurse = None;
                self.unit_clerk = None;
            }
        }
        self.settle_loaded_state();
        self.dirty = false;
    }

    /// Repair assignments after state comes from storage or an import.
    /// The census may have been regenerated, so cards can reference beds
    /// that are now vacant or gone.
    fn settle_loaded_state(&mut self) {
        let inactive: Vec<PatientId> = self
            .patients
            .iter()
            .filter(|p| !p.is_active())
            .map(|p| p.id)
            .collect();
        let mut ledger = AssignmentLedger::new(&mut self.patients, &mut self.nurses);
        let mut transition = ledger.reconcile();
        for id in inactive {
            transition.changed |= ledger.unassign_patient(id).changed;
        }
        if transition.changed {
            log::debug!("Layout '{}': repaired stale assignments", self.layout_name);
        }
        self.settle_staff_positions();
        apply_assignment_groups(&self.patients, &mut self.techs);
        self.next_staff_id = self
            .nurses
            .iter()
            .map(|n| n.id.0)
            .chain(self.techs.iter().map(|t| t.id.0))
            .max()
            .unwrap_or(0)
            + 1;
    }

    /// Move staff cards that are off the board or overlap another card to a
    /// free slot, as if they had just been added.
    fn settle_staff_positions(&mut self) {
        let mut occupancy = Occupancy::build(self.grid, &self.patients, &[], &[], None);
        let cards = self
            .nurses
            .iter()
            .map(|n| (StaffRef::Nurse(n.id), n.grid))
            .chain(self.techs.iter().map(|t| (StaffRef::Tech(t.id), t.grid)))
            .collect::<Vec<_>>();
        let mut misplaced = Vec::new();
        for (staff, origin) in cards {
            let who = Occupant::Staff(staff);
            if occupancy.is_free(origin, who.footprint()) {
                occupancy.mark(origin, who.footprint(), who);
            } else {
                misplaced.push(staff);
            }
        }

        for staff in misplaced {
            // Parked off the board so the stale cells do not count as taken
            let Some(grid) = self.staff_grid_mut(staff) else {
                continue;
            };
            let stale = std::mem::replace(grid, GridPos::new(0, 0));
            let footprint = Occupant::Staff(staff).footprint();
            match find_slot(self.grid, &self.patients, &self.nurses, &self.techs, footprint) {
                Some(cell) => {
                    log::warn!("Staff {} at {stale} moved to {cell}", staff_id(staff));
                    if let Some(grid) = self.staff_grid_mut(staff) {
                        *grid = cell;
                    }
                }
                None => log::error!("No free slot for staff {} from {stale}", staff_id(staff)),
            }
        }
    }

    fn staff_grid_mut(&mut self, staff: StaffRef) -> Option<&mut GridPos> {
        match staff {
            StaffRef::Nurse(id) => self.nurses.iter_mut().find(|n| n.id == id).map(|n| &mut n.grid),
            StaffRef::Tech(id) => self.techs.iter_mut().find(|t| t.id == id).map(|t| &mut t.grid),
        }
    }

    /// Recompute derived state, mark dirty, and autosave when allowed
    fn commit(&mut self) {
        apply_assignment_groups(&self.patients, &mut self.techs);
        self.dirty = true;
        if self.config.autosave && !self.is_locked() {
            self.autosave();
        }
    }

    fn autosave(&mut self) {
        if let Err(e) = self.write_through() {
            log::error!("Autosave of layout '{}' failed: {e}", self.layout_name);
            self.last_persist_error = Some(e);
        }
    }

    fn write_through(&mut self) -> std::result::Result<(), StorageError> {
        let snapshot = self.staffing_snapshot();
        self.store.save_layout(&self.layout_name, &self.patients)?;
        self.store.save_staffing(&self.layout_name, &snapshot)?;
        self.dirty = false;
        self.last_persist_error = None;
        Ok(())
    }

    /// Save the active layout now, regardless of lock or autosave
    pub fn flush(&mut self) -> std::result::Result<(), StorageError> {
        self.write_through()
    }

    fn staffing_snapshot(&self) -> StaffingSnapshot {
        StaffingSnapshot {
            nurses: self.nurses.clone(),
            techs: self.techs.clone(),
            spectra: self.spectra.clone(),
            charge_nurse: self.charge_nurse.clone(),
            unit_clerk: self.unit_clerk.clone(),
        }
    }

    // ── Layouts ────────────────────────────────────────────────────────

    pub fn list_layouts(&self) -> Vec<LayoutRecord> {
        self.store.list_layouts()
    }

    /// Register a layout without switching to it
    pub fn create_layout(
        &mut self,
        name: &str,
        placement: BedPlacement,
    ) -> std::result::Result<LayoutRecord, CoreError> {
        self.store.create_layout(name, placement)
    }

    /// Delete a layout other than the active one
    pub fn delete_layout(&mut self, name: &str) -> std::result::Result<(), CoreError> {
        if names_match(name, &self.layout_name) {
            return Err(CensusError::ProtectedLayout(self.layout_name.clone()).into());
        }
        self.store.delete_layout(name)
    }

    /// Save the active layout, then load `name`
    ///
    /// A failed save is recorded and the switch still happens.
    pub fn switch_layout(&mut self, name: &str) -> Result<()> {
        let record = self
            .store
            .find_layout(name)
            .ok_or_else(|| CensusError::LayoutNotFound(name.trim().to_string()))?;
        if record.name == self.layout_name {
            return Ok(());
        }

        self.autosave();
        log::info!("Switching layout '{}' -> '{}'", self.layout_name, record.name);
        self.layout_name = record.name;
        self.load_active_layout();
        Ok(())
    }

    // ── Lock ───────────────────────────────────────────────────────────

    pub fn lock(&mut self) {
        self.lock = LayoutLock::Locked;
    }

    /// Unlock, saving anything changed while locked
    pub fn unlock(&mut self) {
        self.lock = LayoutLock::Unlocked;
        if self.dirty && self.config.autosave {
            self.autosave();
        }
    }

    pub fn is_locked(&self) -> bool {
        self.lock == LayoutLock::Locked
    }

    fn ensure_unlocked(&self, action: &str) -> Result<()> {
        if self.is_locked() {
            log::warn!("Rejected {action}: layout '{}' is locked", self.layout_name);
            return Err(CensusError::LayoutLocked);
        }
        Ok(())
    }

    // ── Census ─────────────────────────────────────────────────────────

    fn bed_index(&self, bed: u32) -> Result<usize> {
        self.patients
            .iter()
            .position(|p| p.bed_number == bed)
            .ok_or(CensusError::BedNotFound(bed))
    }

    /// Admit a patient into a vacant bed
    ///
    /// Notes left on the bed are cleared before the form is applied. Without
    /// an admit date the current date is used.
    pub fn admit_patient(&mut self, bed: u32, form: PatientForm) -> Result<PatientId> {
        let index = self.bed_index(bed)?;
        let patient = &self.patients[index];
        if patient.is_blocked {
            return Err(CensusError::RoomBlocked(bed));
        }
        if !patient.is_vacant() {
            return Err(CensusError::RoomNotVacant(bed));
        }
        let name = form
            .name
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        if name.is_empty() || patient_name_is_sentinel(&name) {
            return Err(CensusError::EmptyName { kind: "patient" });
        }

        let form = PatientForm {
            name: Some(name),
            ..form
        };
        let patient = &mut self.patients[index];
        patient.notes.clear();
        form.apply(patient);
        if patient.admit_date.is_none() {
            patient.admit_date = Some(Local::now().date_naive().to_string());
        }
        let id = patient.id;
        log::info!("Admitted bed {bed} ({})", patient.room);
        self.commit();
        Ok(id)
    }

    /// Merge form fields into an occupied bed. Notes are cleared first, as on
    /// admit, so only notes sent with the form remain.
    pub fn update_patient(&mut self, bed: u32, form: PatientForm) -> Result<()> {
        let index = self.bed_index(bed)?;
        if self.patients[index].is_vacant() {
            return Err(CensusError::PatientNotFound(self.patients[index].id));
        }
        let mut form = form;
        if let Some(name) = form.name.take() {
            let name = name.trim();
            if name.is_empty() || patient_name_is_sentinel(name) {
                return Err(CensusError::EmptyName { kind: "patient" });
            }
            form.name = Some(name.to_string());
        }

        let patient = &mut self.patients[index];
        patient.notes.clear();
        form.apply(patient);
        self.commit();
        Ok(())
    }

    /// Reset a bed to Vacant, keeping id, bed, room, and position.
    /// Discharging a vacant bed does nothing.
    pub fn discharge(&mut self, bed: u32) -> Result<()> {
        let index = self.bed_index(bed)?;
        if self.patients[index].is_vacant() {
            return Ok(());
        }
        let id = self.patients[index].id;
        AssignmentLedger::new(&mut self.patients, &mut self.nurses).unassign_patient(id);
        self.patients[index].reset_to_vacant();
        log::info!("Discharged bed {bed}");
        self.commit();
        Ok(())
    }

    /// Move a patient's record to a vacant bed. The caring nurse follows.
    pub fn transfer(&mut self, from: u32, to: u32) -> Result<()> {
        let source = self.bed_index(from)?;
        let target = self.bed_index(to)?;
        if source == target || self.patients[source].is_vacant() {
            return Ok(());
        }
        if self.patients[target].is_blocked {
            return Err(CensusError::RoomBlocked(to));
        }
        if !self.patients[target].is_vacant() {
            return Err(CensusError::RoomNotVacant(to));
        }

        let source_id = self.patients[source].id;
        let target_id = self.patients[target].id;
        let nurse = self
            .nurses
            .iter()
            .find(|n| n.holds(source_id))
            .map(|n| n.id);

        let record = self.patients[source].clone();
        let dest = &mut self.patients[target];
        *dest = Patient {
            id: dest.id,
            bed_number: dest.bed_number,
            room: std::mem::take(&mut dest.room),
            grid: dest.grid,
            is_blocked: false,
            assigned_nurse: None,
            ..record
        };

        let mut ledger = AssignmentLedger::new(&mut self.patients, &mut self.nurses);
        ledger.unassign_patient(source_id);
        if let Some(nurse) = nurse {
            let transition = ledger.reassign(target_id, nurse, 0);
            if !transition.dropped.is_empty() {
                log::warn!("Transfer overflowed nurse {nurse}: dropped {:?}", transition.dropped);
            }
        }
        self.patients[source].reset_to_vacant();
        log::info!("Transferred bed {from} -> bed {to}");
        self.commit();
        Ok(())
    }

    /// Block or unblock a room. Only vacant beds can be blocked.
    pub fn set_blocked(&mut self, bed: u32, blocked: bool) -> Result<()> {
        let index = self.bed_index(bed)?;
        if blocked && !self.patients[index].is_vacant() {
            return Err(CensusError::RoomNotVacant(bed));
        }
        if self.patients[index].is_blocked == blocked {
            return Ok(());
        }
        self.patients[index].is_blocked = blocked;
        let id = self.patients[index].id;
        AssignmentLedger::new(&mut self.patients, &mut self.nurses).unassign_patient(id);
        self.commit();
        Ok(())
    }

    /// Append a vacant bed with the given room designation
    pub fn create_room(&mut self, room: &str) -> Result<PatientId> {
        self.ensure_unlocked("create room")?;
        let room = validate_name("room", room, self.patients.iter().map(|p| p.room.as_str()))?;

        let occupancy = Occupancy::build(self.grid, &self.patients, &self.nurses, &self.techs, None);
        let preferred = self.store.placement_for(&self.layout_name).cells(self.grid);
        let cell = find_bed_slot(&occupancy, self.grid, &preferred).ok_or(CensusError::NoGridSlot {
            height: PATIENT_CARD.height,
            width: PATIENT_CARD.width,
        })?;

        let id = PatientId(self.patients.iter().map(|p| p.id.0).max().unwrap_or(0) + 1);
        let bed = self.patients.iter().map(|p| p.bed_number).max().unwrap_or(0) + 1;
        self.patients.push(Patient::vacant(id, bed, room, cell));
        log::info!("Created bed {bed} at {cell}");
        self.commit();
        Ok(id)
    }

    /// Remove a vacant bed
    pub fn delete_room(&mut self, bed: u32) -> Result<()> {
        self.ensure_unlocked("delete room")?;
        let index = self.bed_index(bed)?;
        if !self.patients[index].is_vacant() {
            return Err(CensusError::RoomNotVacant(bed));
        }
        let removed = self.patients.remove(index);
        AssignmentLedger::new(&mut self.patients, &mut self.nurses).reconcile();
        log::info!("Deleted bed {bed} ({})", removed.room);
        self.commit();
        Ok(())
    }

    pub fn move_patient(&mut self, patient: PatientId, destination: GridPos) -> Result<()> {
        self.ensure_unlocked("patient move")?;
        let index = self
            .patients
            .iter()
            .position(|p| p.id == patient)
            .ok_or(CensusError::PatientNotFound(patient))?;
        if let Err(e) = validate_move(
            self.grid,
            &self.patients,
            &self.nurses,
            &self.techs,
            Occupant::Patient(patient),
            destination,
        ) {
            log::warn!("Rejected move of patient {patient}: {e}");
            return Err(e);
        }
        self.patients[index].grid = destination;
        self.commit();
        Ok(())
    }

    // ── Staffing ───────────────────────────────────────────────────────

    fn allocate_spectra(&self, requested: Option<&str>) -> Result<String> {
        match requested {
            Some(id) => self
                .spectra
                .check_assignable(id, &self.nurses, &self.techs, None),
            None => self
                .spectra
                .first_available(&self.nurses, &self.techs)
                .map(|d| d.id.clone())
                .ok_or(CensusError::NoSpectraAvailable),
        }
    }

    fn allocate_slot(&self, footprint: Footprint) -> Result<GridPos> {
        find_slot(self.grid, &self.patients, &self.nurses, &self.techs, footprint).ok_or(
            CensusError::NoGridSlot {
                height: footprint.height,
                width: footprint.width,
            },
        )
    }

    fn take_staff_id(&mut self) -> StaffId {
        let id = StaffId(self.next_staff_id);
        self.next_staff_id += 1;
        id
    }

    /// Add a nurse with a device and a free card slot
    pub fn add_nurse(&mut self, new: NewNurse) -> Result<StaffId> {
        self.ensure_unlocked("add nurse")?;
        let name = validate_name("nurse", &new.name, self.nurses.iter().map(|n| n.name.as_str()))?;
        let spectra = self.allocate_spectra(new.spectra.as_deref())?;
        let cell = self.allocate_slot(NURSE_CARD)?;

        let id = self.take_staff_id();
        log::info!("Added nurse {name} ({}) at {cell} with {spectra}", new.role);
        self.nurses
            .push(Nurse::new(id, name, new.role, cell).with_spectra(spectra));
        self.commit();
        Ok(id)
    }

    pub fn add_tech(&mut self, new: NewTech) -> Result<StaffId> {
        self.ensure_unlocked("add tech")?;
        let name = validate_name("tech", &new.name, self.techs.iter().map(|t| t.name.as_str()))?;
        let spectra = self.allocate_spectra(new.spectra.as_deref())?;
        let cell = self.allocate_slot(TECH_CARD)?;

        let id = self.take_staff_id();
        log::info!("Added tech {name} at {cell} with {spectra}");
        let mut tech = PatientCareTech::new(id, name, cell);
        tech.spectra = Some(spectra);
        self.techs.push(tech);
        self.commit();
        Ok(id)
    }

    /// Remove a nurse, unassigning their patients and freeing the device
    pub fn remove_nurse(&mut self, id: StaffId) -> Result<()> {
        self.ensure_unlocked("remove nurse")?;
        let index = self
            .nurses
            .iter()
            .position(|n| n.id == id)
            .ok_or(CensusError::StaffNotFound(id))?;
        AssignmentLedger::new(&mut self.patients, &mut self.nurses).clear_nurse(id);
        let removed = self.nurses.remove(index);
        log::info!("Removed nurse {}", removed.name);
        self.commit();
        Ok(())
    }

    pub fn remove_tech(&mut self, id: StaffId) -> Result<()> {
        self.ensure_unlocked("remove tech")?;
        let index = self
            .techs
            .iter()
            .position(|t| t.id == id)
            .ok_or(CensusError::StaffNotFound(id))?;
        let removed = self.techs.remove(index);
        log::info!("Removed tech {}", removed.name);
        self.commit();
        Ok(())
    }

    /// Give `staff` a device, or take theirs away with `None`
    pub fn assign_spectra(&mut self, staff: StaffRef, device: Option<&str>) -> Result<()> {
        self.ensure_unlocked("spectra assignment")?;
        let device = match device {
            Some(id) => Some(
                self.spectra
                    .check_assignable(id, &self.nurses, &self.techs, Some(staff))?,
            ),
            None => None,
        };
        let slot = match staff {
            StaffRef::Nurse(id) => self
                .nurses
                .iter_mut()
                .find(|n| n.id == id)
                .map(|n| &mut n.spectra),
            StaffRef::Tech(id) => self
                .techs
                .iter_mut()
                .find(|t| t.id == id)
                .map(|t| &mut t.spectra),
        };
        let slot = slot.ok_or(CensusError::StaffNotFound(staff_id(staff)))?;
        if *slot == device {
            return Ok(());
        }
        *slot = device;
        self.commit();
        Ok(())
    }

    /// Drag a staff card to `destination`
    pub fn move_staff(&mut self, staff: StaffRef, destination: GridPos) -> Result<()> {
        self.ensure_unlocked("staff move")?;
        if let Err(e) = validate_move(
            self.grid,
            &self.patients,
            &self.nurses,
            &self.techs,
            Occupant::Staff(staff),
            destination,
        ) {
            log::warn!("Rejected move of staff {}: {e}", staff_id(staff));
            return Err(e);
        }
        *self
            .staff_grid_mut(staff)
            .ok_or(CensusError::StaffNotFound(staff_id(staff)))? = destination;
        self.commit();
        Ok(())
    }

    /// Drop `patient` on `nurse`'s card
    ///
    /// Unknown ids, vacant or blocked beds, and an out-of-range slot leave
    /// everything unchanged.
    pub fn reassign(&mut self, patient: PatientId, nurse: StaffId, slot_index: usize) -> Result<Transition> {
        self.ensure_unlocked("reassignment")?;
        let active = self.patients.iter().any(|p| p.id == patient && p.is_active());
        if !active || slot_index >= MAX_ASSIGNMENTS {
            log::debug!("Ignoring reassignment of patient {patient} to nurse {nurse}");
            return Ok(Transition::default());
        }

        let transition =
            AssignmentLedger::new(&mut self.patients, &mut self.nurses).reassign(patient, nurse, slot_index);
        if !transition.dropped.is_empty() {
            log::warn!(
                "Nurse {nurse} is at capacity; dropped patient(s) {:?}",
                transition.dropped
            );
        }
        if transition.changed {
            self.commit();
        }
        Ok(transition)
    }

    /// Unassign every patient on one nurse's card
    pub fn clear_assignments(&mut self, nurse: StaffId) -> Result<Transition> {
        self.ensure_unlocked("clear assignments")?;
        let transition = AssignmentLedger::new(&mut self.patients, &mut self.nurses).clear_nurse(nurse);
        if transition.changed {
            self.commit();
        }
        Ok(transition)
    }

    pub fn balance_assignments(&mut self) -> Result<Transition> {
        self.ensure_unlocked("balance")?;
        let transition = AssignmentLedger::new(&mut self.patients, &mut self.nurses).balance();
        if transition.changed {
            log::info!("Balanced caseloads across {} nurses", self.nurses.len());
            self.commit();
        }
        Ok(transition)
    }

    pub fn add_spectra(&mut self, id: &str) -> Result<()> {
        self.ensure_unlocked("add spectra")?;
        self.spectra.add_device(id)?;
        self.commit();
        Ok(())
    }

    pub fn toggle_spectra(&mut self, id: &str, in_service: bool) -> Result<()> {
        self.ensure_unlocked("spectra status change")?;
        toggle_spectra_status(&mut self.spectra, id, in_service, &self.nurses, &self.techs)?;
        self.commit();
        Ok(())
    }

    /// Set or clear (`None` or blank) the charge nurse
    pub fn set_charge_nurse(&mut self, name: Option<&str>) -> Result<()> {
        self.ensure_unlocked("charge nurse change")?;
        self.charge_nurse = normalize_role_name(name);
        self.commit();
        Ok(())
    }

    pub fn set_unit_clerk(&mut self, name: Option<&str>) -> Result<()> {
        self.ensure_unlocked("unit clerk change")?;
        self.unit_clerk = normalize_role_name(name);
        self.commit();
        Ok(())
    }

    // ── Reports, export ────────────────────────────────────────────────

    /// Publish the current assignments to the remote store
    pub fn publish_shift_snapshot(
        &self,
        sink: &mut impl SnapshotSink,
        date: NaiveDate,
        shift: Shift,
    ) -> std::result::Result<ShiftSnapshot, StorageError> {
        let snapshot = ShiftSnapshot::build(
            &self.layout_name,
            date,
            shift,
            self.charge_nurse.as_deref(),
            &self.patients,
            &self.nurses,
            Utc::now(),
        );
        let key = snapshot.key();
        if let Err(e) = sink.write_snapshot(&key, &snapshot) {
            log::error!("Publishing shift snapshot '{key}' failed: {e}");
            return Err(e);
        }
        Ok(snapshot)
    }

    pub fn export(&self, writer: impl Write) -> std::result::Result<(), StorageError> {
        let data = SessionData::new(
            self.layout_name.clone(),
            self.grid,
            self.patients.clone(),
            self.nurses.clone(),
            self.techs.clone(),
            self.spectra.clone(),
            self.charge_nurse.clone(),
            self.unit_clerk.clone(),
            self.is_locked(),
        );
        export_session(writer, &data)
    }

    /// Replace the whole session with an export, registering its layout if needed
    ///
    /// Rejected while locked, and when the export does not describe a sound
    /// board; the session is untouched in both cases.
    pub fn import(&mut self, reader: impl Read) -> std::result::Result<(), CoreError> {
        self.ensure_unlocked("import")?;
        let data = import_session(reader)?;
        let problems = data.problems();
        if !problems.is_empty() {
            log::warn!("Rejected import: {}", problems.join("; "));
            return Err(StorageError::InvalidData(problems.join("; ")).into());
        }
        let layout_name = match self.store.find_layout(&data.layout_name) {
            Some(record) => record.name,
            None => self.store.create_layout(&data.layout_name, BedPlacement::Perimeter)?.name,
        };

        self.layout_name = layout_name;
        self.grid = data.grid;
        self.patients = data.patients;
        self.nurses = data.nurses;
        self.techs = data.techs;
        self.spectra = data.spectra;
        self.charge_nurse = data.charge_nurse;
        self.unit_clerk = data.unit_clerk;
        self.lock = if data.locked {
            LayoutLock::Locked
        } else {
            LayoutLock::Unlocked
        };
        self.settle_loaded_state();
        log::info!("Imported session for layout '{}'", self.layout_name);
        self.commit();
        Ok(())
    }

    // ── Accessors ──────────────────────────────────────────────────────

    pub fn config(&self) -> &UnitConfig {
        &self.config
    }

    pub fn layout_name(&self) -> &str {
        &self.layout_name
    }

    pub fn grid(&self) -> GridSize {
        self.grid
    }

    pub fn patients(&self) -> &[Patient] {
        &self.patients
    }

    pub fn patient_by_bed(&self, bed: u32) -> Option<&Patient> {
        self.patients.iter().find(|p| p.bed_number == bed)
    }

    pub fn nurses(&self) -> &[Nurse] {
        &self.nurses
    }

    pub fn techs(&self) -> &[PatientCareTech] {
        &self.techs
    }

    pub fn spectra(&self) -> &SpectraPool {
        &self.spectra
    }

    pub fn charge_nurse(&self) -> Option<&str> {
        self.charge_nurse.as_deref()
    }

    pub fn unit_clerk(&self) -> Option<&str> {
        self.unit_clerk.as_deref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The most recent autosave failure, cleared by the next successful save
    pub fn last_persist_error(&self) -> Option<&StorageError> {
        self.last_persist_error.as_ref()
    }

    pub fn store(&self) -> &LayoutStore<S> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut LayoutStore<S> {
        &mut self.store
    }

    /// Describe every broken board invariant; empty when the board is sound
    pub fn audit(&self) -> Vec<String> {
        let mut problems = check_consistency(&self.patients, &self.nurses);
        let occupancy = Occupancy::build(self.grid, &self.patients, &self.nurses, &self.techs, None);
        problems.extend(
            occupancy
                .overlaps()
                .iter()
                .map(|o| format!("cell {} shared by {:?} and {:?}", o.cell, o.first, o.second)),
        );
        for n in &self.nurses {
            if !self.grid.fits(n.grid, NURSE_CARD) {
                problems.push(format!("nurse {} card is off the board at {}", n.name, n.grid));
            }
        }
        problems
    }
}

fn staff_id(staff: StaffRef) -> StaffId {
    match staff {
        StaffRef::Nurse(id) | StaffRef::Tech(id) => id,
    }
}

fn patient_name_is_sentinel(name: &str) -> bool {
    names_match(name, VACANT)
}

fn normalize_role_name(name: Option<&str>) -> Option<String> {
    name.map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}
