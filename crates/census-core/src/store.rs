//! Layout store: named layouts over a key/value storage backend
//!
//! Keys:
//! - `layouts`: the registry, a JSON list of [`LayoutRecord`]
//! - `layout:{name}:positions`: per-bed grid overrides, a JSON list of [`PositionRecord`]
//! - `layout:{name}:roster`: which beds exist, a JSON list of [`BedRecord`]
//! - `layout:{name}:staffing`: the last [`StaffingSnapshot`] saved for the layout
//!
//! Reads never fail outward. A missing or unreadable value degrades to
//! generated data and the failure is logged. Writes return [`StorageError`]
//! so the caller can surface them.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use census_logic::constants::DEFAULT_LAYOUT;
use census_logic::grid::{GridPos, GridSize, PATIENT_CARD};
use census_logic::model::{Nurse, Patient, PatientCareTech, PatientId};
use census_logic::naming::{names_match, validate_name};
use census_logic::placement::{find_bed_slot, Occupancy, Occupant};
use census_logic::spectra::SpectraPool;
use census_logic::CensusError;

use crate::error::{CoreError, StorageError};
use crate::generation::{generate_patients, BedPlacement};

const REGISTRY_KEY: &str = "layouts";

fn positions_key(layout: &str) -> String {
    format!("layout:{layout}:positions")
}

fn roster_key(layout: &str) -> String {
    format!("layout:{layout}:roster")
}

fn staffing_key(layout: &str) -> String {
    format!("layout:{layout}:staffing")
}

/// String key/value storage
pub trait StorageBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// In-process storage. Can be switched off to simulate an unavailable store.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
    available: bool,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            available: true,
        }
    }

    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.available {
            Ok(())
        } else {
            Err(StorageError::Unavailable)
        }
    }
}

impl StorageBackend for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check()?;
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check()?;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.check()?;
        self.entries.remove(key);
        Ok(())
    }
}

/// One JSON file per key in a directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open storage rooted at `dir`, creating the directory if needed
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_key(key)))
    }
}

/// Percent-encode everything outside `[A-Za-z0-9_-]` so keys are safe file names
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

impl StorageBackend for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Registry entry for a named layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutRecord {
    pub name: String,
    #[serde(default)]
    pub placement: BedPlacement,
}

impl LayoutRecord {
    fn default_layout() -> Self {
        Self {
            name: DEFAULT_LAYOUT.to_string(),
            placement: BedPlacement::Perimeter,
        }
    }
}

/// Saved grid position of one bed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub id: PatientId,
    pub grid_row: u16,
    pub grid_column: u16,
}

/// Identity of one bed. The roster is the bed set of a layout: beds
/// created or deleted on the board survive a reload through it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BedRecord {
    pub id: PatientId,
    pub bed_number: u32,
    pub room: String,
}

/// Staffing state saved alongside a layout's positions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaffingSnapshot {
    pub nurses: Vec<Nurse>,
    pub techs: Vec<PatientCareTech>,
    pub spectra: SpectraPool,
    pub charge_nurse: Option<String>,
    pub unit_clerk: Option<String>,
}

/// Named layouts persisted in a [`StorageBackend`]
pub struct LayoutStore<S: StorageBackend> {
    backend: S,
    bed_count: usize,
}

impl<S: StorageBackend> LayoutStore<S> {
    /// `bed_count` is the size of the generated base census for every layout
    pub fn new(backend: S, bed_count: usize) -> Self {
        Self { backend, bed_count }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut S {
        &mut self.backend
    }

    /// Registered layouts; always contains `default`, first
    pub fn list_layouts(&self) -> Vec<LayoutRecord> {
        let mut layouts: Vec<LayoutRecord> = self.read_json(REGISTRY_KEY).unwrap_or_default();
        if !layouts
            .iter()
            .any(|l| names_match(&l.name, DEFAULT_LAYOUT))
        {
            layouts.insert(0, LayoutRecord::default_layout());
        }
        layouts
    }

    /// Registry entry matching `name` case-insensitively
    pub fn find_layout(&self, name: &str) -> Option<LayoutRecord> {
        let name = name.trim();
        self.list_layouts()
            .into_iter()
            .find(|l| names_match(&l.name, name))
    }

    /// Register a new layout. The registry is unchanged on any error.
    pub fn create_layout(
        &mut self,
        name: &str,
        placement: BedPlacement,
    ) -> Result<LayoutRecord, CoreError> {
        let mut layouts = self.list_layouts();
        let name = validate_name("layout", name, layouts.iter().map(|l| l.name.as_str()))?;
        let record = LayoutRecord { name, placement };
        layouts.push(record.clone());
        self.write_json(REGISTRY_KEY, &layouts)?;
        log::info!("Created layout '{}' ({:?})", record.name, record.placement);
        Ok(record)
    }

    /// Remove a layout with its saved positions and staffing
    pub fn delete_layout(&mut self, name: &str) -> Result<(), CoreError> {
        let name = name.trim();
        if names_match(name, DEFAULT_LAYOUT) {
            return Err(CensusError::ProtectedLayout(name.to_string()).into());
        }
        let mut layouts = self.list_layouts();
        let index = layouts
            .iter()
            .position(|l| names_match(&l.name, name))
            .ok_or_else(|| CensusError::LayoutNotFound(name.to_string()))?;
        let record = layouts.remove(index);
        self.write_json(REGISTRY_KEY, &layouts)?;
        self.backend.remove(&positions_key(&record.name))?;
        self.backend.remove(&roster_key(&record.name))?;
        self.backend.remove(&staffing_key(&record.name))?;
        log::info!("Deleted layout '{}'", record.name);
        Ok(())
    }

    /// Placement used for beds without saved positions
    pub fn placement_for(&self, name: &str) -> BedPlacement {
        self.find_layout(name)
            .map(|l| l.placement)
            .unwrap_or_default()
    }

    /// Generate the base census and apply the saved roster and positions on top
    ///
    /// With a saved roster, generated beds missing from it are dropped and
    /// roster beds the generator does not produce come back vacant. Beds
    /// without a saved position keep the generated one; saved positions for
    /// ids not in the census are ignored. Any bed left off the board or on a
    /// cell another bed already holds is moved to the first free bed cell.
    pub fn load_layout(&self, name: &str, grid: GridSize, rng: &mut impl Rng) -> Vec<Patient> {
        let placement = self.placement_for(name);
        let mut patients = generate_patients(self.bed_count, grid, placement, rng);

        if let Some(roster) = self.read_json::<Vec<BedRecord>>(&roster_key(name)) {
            patients = apply_roster(patients, &roster, name);
        }

        match self.read_json::<Vec<PositionRecord>>(&positions_key(name)) {
            Some(records) => {
                let index: HashMap<PatientId, usize> = patients
                    .iter()
                    .enumerate()
                    .map(|(i, p)| (p.id, i))
                    .collect();
                let mut applied = 0;
                for record in &records {
                    match index.get(&record.id) {
                        Some(&i) => {
                            patients[i].grid = GridPos::new(record.grid_row, record.grid_column);
                            applied += 1;
                        }
                        None => log::debug!(
                            "Layout '{name}': ignoring position for unknown bed {}",
                            record.id
                        ),
                    }
                }
                log::info!(
                    "Loaded layout '{name}': {applied} of {} beds from saved positions",
                    patients.len()
                );
            }
            None => {
                log::info!("Layout '{name}': no saved positions, using {placement:?} placement")
            }
        }

        settle_beds(&mut patients, grid, placement, name);
        patients
    }

    /// Persist the bed roster and the grid position of every bed
    pub fn save_layout(&mut self, name: &str, patients: &[Patient]) -> Result<(), StorageError> {
        let records: Vec<PositionRecord> = patients
            .iter()
            .map(|p| PositionRecord {
                id: p.id,
                grid_row: p.grid.row,
                grid_column: p.grid.column,
            })
            .collect();
        let roster: Vec<BedRecord> = patients
            .iter()
            .map(|p| BedRecord {
                id: p.id,
                bed_number: p.bed_number,
                room: p.room.clone(),
            })
            .collect();
        self.write_json(&positions_key(name), &records)?;
        self.write_json(&roster_key(name), &roster)?;
        log::info!("Saved layout '{name}' ({} beds)", records.len());
        Ok(())
    }

    pub fn save_staffing(
        &mut self,
        name: &str,
        snapshot: &StaffingSnapshot,
    ) -> Result<(), StorageError> {
        self.write_json(&staffing_key(name), snapshot)
    }

    pub fn load_staffing(&self, name: &str) -> Option<StaffingSnapshot> {
        self.read_json(&staffing_key(name))
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let text = match self.backend.get(key) {
            Ok(Some(text)) => text,
            Ok(None) => return None,
            Err(e) => {
                log::error!("Failed to read '{key}': {e}");
                return None;
            }
        };
        match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(e) => {
                log::error!("Discarding unreadable '{key}': {e}");
                None
            }
        }
    }

    fn write_json<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), StorageError> {
        let text = serde_json::to_string(value)?;
        self.backend.set(key, &text)
    }
}

/// Reduce the generated census to the saved roster, in roster order.
/// Repeated ids or bed numbers keep their first entry.
fn apply_roster(generated: Vec<Patient>, roster: &[BedRecord], name: &str) -> Vec<Patient> {
    let mut base: HashMap<PatientId, Patient> =
        generated.into_iter().map(|p| (p.id, p)).collect();
    let mut seen_ids = HashSet::new();
    let mut seen_beds = HashSet::new();
    let mut patients = Vec::with_capacity(roster.len());

    for bed in roster {
        if !seen_ids.insert(bed.id) || !seen_beds.insert(bed.bed_number) {
            log::debug!("Layout '{name}': skipping repeated roster entry for bed {}", bed.bed_number);
            continue;
        }
        let patient = match base.remove(&bed.id) {
            Some(mut p) => {
                p.bed_number = bed.bed_number;
                p.room = bed.room.clone();
                p
            }
            // Placed by settle_beds unless a saved position follows
            None => Patient::vacant(bed.id, bed.bed_number, bed.room.as_str(), GridPos::new(0, 0)),
        };
        patients.push(patient);
    }
    if !base.is_empty() {
        log::debug!(
            "Layout '{name}': roster keeps {} beds, {} generated beds dropped",
            patients.len(),
            base.len()
        );
    }
    patients
}

/// Give every bed a cell of its own on the board.
fn settle_beds(patients: &mut [Patient], grid: GridSize, placement: BedPlacement, name: &str) {
    let mut occupancy = Occupancy::new(grid);
    let mut misplaced = Vec::new();
    for (i, p) in patients.iter().enumerate() {
        if occupancy.is_free(p.grid, PATIENT_CARD) {
            occupancy.mark(p.grid, PATIENT_CARD, Occupant::Patient(p.id));
        } else {
            misplaced.push(i);
        }
    }
    if misplaced.is_empty() {
        return;
    }

    let preferred = placement.cells(grid);
    for i in misplaced {
        let patient = &mut patients[i];
        match find_bed_slot(&occupancy, grid, &preferred) {
            Some(cell) => {
                log::warn!(
                    "Layout '{name}': bed {} at {} moved to {cell}",
                    patient.bed_number,
                    patient.grid
                );
                patient.grid = cell;
                occupancy.mark(cell, PATIENT_CARD, Occupant::Patient(patient.id));
            }
            None => log::error!(
                "Layout '{name}': no free cell for bed {}",
                patient.bed_number
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn store() -> LayoutStore<MemoryStorage> {
        LayoutStore::new(MemoryStorage::new(), 48)
    }

    #[test]
    fn test_registry_always_has_default() {
        let store = store();
        let layouts = store.list_layouts();
        assert_eq!(layouts, vec![LayoutRecord::default_layout()]);
    }

    #[test]
    fn test_create_layout_validation() {
        let mut store = store();
        store.create_layout("ICU Pod A", BedPlacement::Banks).unwrap();

        let err = store.create_layout("icu pod a", BedPlacement::Perimeter).unwrap_err();
        assert!(matches!(err, CoreError::Census(CensusError::DuplicateName { .. })));
        assert!(matches!(
            store.create_layout("  ", BedPlacement::Perimeter),
            Err(CoreError::Census(CensusError::EmptyName { .. }))
        ));
        assert!(matches!(
            store.create_layout("a/b", BedPlacement::Perimeter),
            Err(CoreError::Census(CensusError::InvalidNameCharacter { .. }))
        ));
        assert_eq!(store.list_layouts().len(), 2);
        assert_eq!(store.placement_for("icu POD a"), BedPlacement::Banks);
    }

    #[test]
    fn test_delete_layout() {
        let mut store = store();
        store.create_layout("Overflow", BedPlacement::Perimeter).unwrap();
        store.save_layout("Overflow", &[]).unwrap();

        assert!(matches!(
            store.delete_layout("Default"),
            Err(CoreError::Census(CensusError::ProtectedLayout(_)))
        ));
        store.delete_layout("overflow").unwrap();
        assert_eq!(store.list_layouts().len(), 1);
        assert_eq!(store.backend().get("layout:Overflow:positions").unwrap(), None);
        assert_eq!(store.backend().get("layout:Overflow:roster").unwrap(), None);
        assert!(matches!(
            store.delete_layout("Overflow"),
            Err(CoreError::Census(CensusError::LayoutNotFound(_)))
        ));
    }

    #[test]
    fn test_positions_round_trip_and_merge() {
        let mut store = store();
        let grid = GridSize::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut patients = store.load_layout("default", grid, &mut rng);
        patients[0].grid = GridPos::new(6, 6);
        // Positions for the first ten beds only, no roster: the rest keep
        // generated positions.
        let records: Vec<PositionRecord> = patients[..10]
            .iter()
            .map(|p| PositionRecord {
                id: p.id,
                grid_row: p.grid.row,
                grid_column: p.grid.column,
            })
            .collect();
        store.write_json(&positions_key("default"), &records).unwrap();

        let loaded = store.load_layout("default", grid, &mut rng);
        assert_eq!(loaded.len(), 48);
        assert_eq!(loaded[0].grid, GridPos::new(6, 6));
        assert_eq!(loaded[20].grid, patients[20].grid);
    }

    #[test]
    fn test_roster_keeps_deleted_and_created_beds() {
        let mut store = store();
        let grid = GridSize::default();
        let mut rng = StdRng::seed_from_u64(4);
        let mut patients = store.load_layout("default", grid, &mut rng);

        // Bed 2 deleted, bed 1 moved onto its cell, one bed added inside
        let freed = patients.remove(1).grid;
        patients[0].grid = freed;
        patients.push(Patient::vacant(PatientId(49), 49, "450", GridPos::new(6, 6)));
        store.save_layout("default", &patients).unwrap();

        let loaded = store.load_layout("default", grid, &mut rng);
        assert_eq!(loaded.len(), 48);
        assert!(loaded.iter().all(|p| p.id != PatientId(2)));
        assert_eq!(loaded[0].grid, freed);
        let added = loaded.iter().find(|p| p.id == PatientId(49)).unwrap();
        assert!(added.is_vacant());
        assert_eq!((added.bed_number, added.room.as_str()), (49, "450"));
        assert_eq!(added.grid, GridPos::new(6, 6));

        let cells: HashSet<GridPos> = loaded.iter().map(|p| p.grid).collect();
        assert_eq!(cells.len(), loaded.len());
    }

    #[test]
    fn test_colliding_positions_are_resettled() {
        let mut store = LayoutStore::new(MemoryStorage::new(), 3);
        let records: Vec<PositionRecord> = (1..=3)
            .map(|id| PositionRecord {
                id: PatientId(id),
                grid_row: 1,
                grid_column: 1,
            })
            .collect();
        store.write_json(&positions_key("default"), &records).unwrap();

        let mut rng = StdRng::seed_from_u64(5);
        let loaded = store.load_layout("default", GridSize::default(), &mut rng);
        let cells: Vec<GridPos> = loaded.iter().map(|p| p.grid).collect();
        assert_eq!(
            cells,
            vec![GridPos::new(1, 1), GridPos::new(1, 2), GridPos::new(1, 3)]
        );
    }

    #[test]
    fn test_unknown_position_ids_ignored() {
        let mut store = LayoutStore::new(MemoryStorage::new(), 4);
        let records = vec![PositionRecord {
            id: PatientId(99),
            grid_row: 5,
            grid_column: 5,
        }];
        store.write_json(&positions_key("default"), &records).unwrap();

        let mut rng = StdRng::seed_from_u64(2);
        let loaded = store.load_layout("default", GridSize::default(), &mut rng);
        let ids: Vec<u32> = loaded.iter().map(|p| p.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_unavailable_backend_degrades() {
        let mut store = store();
        store.backend_mut().set_available(false);

        assert_eq!(store.list_layouts().len(), 1);
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(store.load_layout("default", GridSize::default(), &mut rng).len(), 48);
        assert!(store.load_staffing("default").is_none());
        assert!(matches!(
            store.save_layout("default", &[]),
            Err(StorageError::Unavailable)
        ));
    }

    #[test]
    fn test_corrupt_registry_degrades() {
        let mut store = store();
        store.backend_mut().set(REGISTRY_KEY, "not json").unwrap();
        assert_eq!(store.list_layouts(), vec![LayoutRecord::default_layout()]);
    }

    #[test]
    fn test_file_storage() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = FileStorage::new(dir.path()).unwrap();
        assert_eq!(backend.get("layout:Pod B:positions").unwrap(), None);

        backend.set("layout:Pod B:positions", "[]").unwrap();
        assert_eq!(backend.get("layout:Pod B:positions").unwrap().as_deref(), Some("[]"));
        assert!(dir.path().join("layout%3APod%20B%3Apositions.json").exists());

        backend.remove("layout:Pod B:positions").unwrap();
        backend.remove("layout:Pod B:positions").unwrap();
        assert_eq!(backend.get("layout:Pod B:positions").unwrap(), None);
    }
}
