//! Validation errors reported synchronously to the caller.
//!
//! Nothing here is fatal. A rejected mutation leaves every collection exactly
//! as it was, and the message is meant to be shown to the user as-is.

use thiserror::Error;

use crate::grid::GridPos;
use crate::model::{PatientId, StaffId};

/// Convenience alias used across the census crates.
pub type Result<T> = std::result::Result<T, CensusError>;

/// Everything a census mutation can be rejected for.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CensusError {
    #[error("{kind} name must not be empty")]
    EmptyName { kind: &'static str },
    #[error("{kind} name `{name}` must not contain `/`")]
    InvalidNameCharacter { kind: &'static str, name: String },
    #[error("{kind} `{name}` already exists")]
    DuplicateName { kind: &'static str, name: String },
    #[error("layout `{0}` cannot be deleted")]
    ProtectedLayout(String),
    #[error("layout `{0}` not found")]
    LayoutNotFound(String),

    #[error("no spectra device is available")]
    NoSpectraAvailable,
    #[error("spectra `{0}` not found")]
    SpectraNotFound(String),
    #[error("spectra `{0}` is out of service")]
    SpectraOutOfService(String),
    #[error("spectra `{0}` is assigned to a staff member")]
    SpectraInUse(String),

    #[error("no free grid slot for a {height}x{width} card")]
    NoGridSlot { height: u16, width: u16 },
    #[error("grid cell {0} is already occupied")]
    PositionOccupied(GridPos),
    #[error("grid cell {0} is outside the unit")]
    OutOfBounds(GridPos),

    #[error("layout is locked")]
    LayoutLocked,

    #[error("patient {0} not found")]
    PatientNotFound(PatientId),
    #[error("bed {0} not found")]
    BedNotFound(u32),
    #[error("staff member {0} not found")]
    StaffNotFound(StaffId),
    #[error("bed {0} is occupied")]
    RoomNotVacant(u32),
    #[error("bed {0} is blocked")]
    RoomBlocked(u32),
}
