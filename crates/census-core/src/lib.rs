//! Census Core - nursing unit board engine
//!
//! Seed data, persistence, and the session controller built on the pure
//! logic in `census_logic`.
//!
//! # Architecture
//!
//! - **Generation**: seed beds, nurses, and spectra for a layout with nothing saved
//! - **Store**: named layouts over a key/value [`store::StorageBackend`]
//! - **Session**: [`session::UnitSession`] owns the active layout and applies every mutation
//! - **Report / Remote**: shift snapshots and the sink they are published to
//!
//! # Example
//!
//! ```rust,no_run
//! use census_core::prelude::*;
//!
//! let config = UnitConfig::default();
//! let backend = FileStorage::new(&config.storage_dir)?;
//! let mut session = UnitSession::open(config, backend)?;
//!
//! session.balance_assignments()?;
//! println!("{}", render_census(session.patients(), session.techs()));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod error;
pub mod generation;
pub mod persistence;
pub mod remote;
pub mod report;
pub mod session;
pub mod store;

pub use error::{CoreError, StorageError};

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::config::UnitConfig;
    pub use crate::error::{CoreError, StorageError};
    pub use crate::remote::{JsonDirSink, MemorySink, SnapshotSink};
    pub use crate::report::{render_assignment_sheet, render_census, Shift, ShiftSnapshot};
    pub use crate::session::{NewNurse, NewTech, UnitSession};
    pub use crate::store::{FileStorage, MemoryStorage, StorageBackend};
    pub use census_logic::grid::{GridPos, GridSize};
    pub use census_logic::model::{PatientForm, PatientId, StaffId, StaffRef, StaffRole};
    pub use census_logic::CensusError;
}
