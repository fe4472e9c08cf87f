//! Spectra device pool.
//!
//! A device is held by at most one nurse or tech. Only in-service devices
//! can be handed out, and a held device cannot be taken out of service.
//! Device ids compare case-insensitively.

use serde::{Deserialize, Serialize};

use crate::error::{CensusError, Result};
use crate::model::{Nurse, PatientCareTech, StaffRef};
use crate::naming::{names_match, validate_name};

/// A handheld communication device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spectra {
    pub id: String,
    pub in_service: bool,
}

impl Spectra {
    pub fn new(id: impl Into<String>, in_service: bool) -> Self {
        Self {
            id: id.into(),
            in_service,
        }
    }
}

/// Every device known to the unit, in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpectraPool {
    devices: Vec<Spectra>,
}

impl SpectraPool {
    pub fn new(devices: Vec<Spectra>) -> Self {
        Self { devices }
    }

    pub fn devices(&self) -> &[Spectra] {
        &self.devices
    }

    pub fn get(&self, id: &str) -> Option<&Spectra> {
        self.devices.iter().find(|d| names_match(&d.id, id))
    }

    /// Register a new in-service device.
    pub fn add_device(&mut self, id: &str) -> Result<&Spectra> {
        let id = validate_name("spectra", id, self.devices.iter().map(|d| d.id.as_str()))?;
        self.devices.push(Spectra::new(id, true));
        Ok(&self.devices[self.devices.len() - 1])
    }

    /// First in-service device nobody holds, in pool order.
    pub fn first_available(&self, nurses: &[Nurse], techs: &[PatientCareTech]) -> Option<&Spectra> {
        self.devices
            .iter()
            .find(|d| d.in_service && holder(&d.id, nurses, techs).is_none())
    }

    /// Check that `id` can be handed to a staff member.
    ///
    /// `except` is the staff member receiving the device; already holding it
    /// is not a conflict. Returns the pool's canonical spelling of the id.
    pub fn check_assignable(
        &self,
        id: &str,
        nurses: &[Nurse],
        techs: &[PatientCareTech],
        except: Option<StaffRef>,
    ) -> Result<String> {
        let device = self
            .get(id)
            .ok_or_else(|| CensusError::SpectraNotFound(id.to_string()))?;
        if !device.in_service {
            return Err(CensusError::SpectraOutOfService(device.id.clone()));
        }
        match holder(&device.id, nurses, techs) {
            Some(h) if Some(h) != except => Err(CensusError::SpectraInUse(device.id.clone())),
            _ => Ok(device.id.clone()),
        }
    }
}

/// Staff member currently holding device `id`, if any.
pub fn holder(id: &str, nurses: &[Nurse], techs: &[PatientCareTech]) -> Option<StaffRef> {
    let held = |s: &Option<String>| s.as_deref().is_some_and(|s| names_match(s, id));
    nurses
        .iter()
        .find(|n| held(&n.spectra))
        .map(|n| StaffRef::Nurse(n.id))
        .or_else(|| {
            techs
                .iter()
                .find(|t| held(&t.spectra))
                .map(|t| StaffRef::Tech(t.id))
        })
}

/// Put a device in or out of service.
///
/// Taking a held device out of service is rejected and the pool is left
/// untouched.
pub fn toggle_spectra_status(
    pool: &mut SpectraPool,
    id: &str,
    in_service: bool,
    nurses: &[Nurse],
    techs: &[PatientCareTech],
) -> Result<()> {
    let index = pool
        .devices
        .iter()
        .position(|d| names_match(&d.id, id))
        .ok_or_else(|| CensusError::SpectraNotFound(id.to_string()))?;
    if !in_service && holder(id, nurses, techs).is_some() {
        return Err(CensusError::SpectraInUse(pool.devices[index].id.clone()));
    }
    pool.devices[index].in_service = in_service;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridPos;
    use crate::model::{StaffId, StaffRole};

    fn pool() -> SpectraPool {
        SpectraPool::new(vec![
            Spectra::new("SPEC-1121", true),
            Spectra::new("SPEC-1122", true),
            Spectra::new("SPEC-1123", false),
        ])
    }

    fn holder_of(device: &str) -> Vec<Nurse> {
        vec![
            Nurse::new(StaffId(1), "Grace", StaffRole::StaffNurse, GridPos::new(2, 3))
                .with_spectra(device),
        ]
    }

    #[test]
    fn held_device_cannot_go_out_of_service() {
        let mut pool = pool();
        let before = pool.clone();
        let nurses = holder_of("SPEC-1122");
        let err = toggle_spectra_status(&mut pool, "SPEC-1122", false, &nurses, &[]).unwrap_err();
        assert_eq!(err, CensusError::SpectraInUse("SPEC-1122".into()));
        assert_eq!(pool, before);
    }

    #[test]
    fn toggle_free_device() {
        let mut pool = pool();
        toggle_spectra_status(&mut pool, "spec-1121", false, &[], &[]).unwrap();
        assert!(!pool.get("SPEC-1121").unwrap().in_service);
        toggle_spectra_status(&mut pool, "SPEC-1123", true, &[], &[]).unwrap();
        assert!(pool.get("SPEC-1123").unwrap().in_service);
        assert!(matches!(
            toggle_spectra_status(&mut pool, "SPEC-9999", true, &[], &[]),
            Err(CensusError::SpectraNotFound(_))
        ));
    }

    #[test]
    fn add_device_rejects_duplicates() {
        let mut pool = pool();
        assert!(matches!(
            pool.add_device("spec-1121"),
            Err(CensusError::DuplicateName { .. })
        ));
        let added = pool.add_device(" SPEC-1130 ").unwrap();
        assert_eq!(added.id, "SPEC-1130");
        assert!(added.in_service);
    }

    #[test]
    fn first_available_skips_held_and_out_of_service() {
        let pool = pool();
        let nurses = holder_of("SPEC-1121");
        assert_eq!(pool.first_available(&nurses, &[]).unwrap().id, "SPEC-1122");
        let nurses = holder_of("SPEC-1122");
        let techs = vec![{
            let mut t = PatientCareTech::new(StaffId(9), "Ray", GridPos::new(5, 5));
            t.spectra = Some("SPEC-1121".into());
            t
        }];
        assert!(pool.first_available(&nurses, &techs).is_none());
    }

    #[test]
    fn assignability() {
        let pool = pool();
        let nurses = holder_of("SPEC-1122");
        assert_eq!(
            pool.check_assignable("SPEC-1123", &nurses, &[], None),
            Err(CensusError::SpectraOutOfService("SPEC-1123".into()))
        );
        assert_eq!(
            pool.check_assignable("SPEC-1122", &nurses, &[], None),
            Err(CensusError::SpectraInUse("SPEC-1122".into()))
        );
        assert_eq!(
            pool.check_assignable("spec-1122", &nurses, &[], Some(StaffRef::Nurse(StaffId(1)))),
            Ok("SPEC-1122".into())
        );
    }
}
