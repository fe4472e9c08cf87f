//! Pure census logic for a nursing unit board.
//!
//! This crate holds the data model and every algorithm that touches it,
//! with no storage, clock, or randomness. Functions take plain slices and
//! return results, so the session controller, the headless harness, and the
//! tests all drive exactly the same code.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`assignment`] | Assignment ledger keeping patient and nurse sides consistent |
//! | [`balance`] | Caseload auto-balance across Staff and Float Pool nurses |
//! | [`constants`] | Vacant sentinel, slot capacity, default board size |
//! | [`error`] | Validation error taxonomy |
//! | [`grid`] | Board geometry, card footprints, perimeter ordering |
//! | [`model`] | Patient, nurse, and tech records |
//! | [`naming`] | Layout, room, and device name validation |
//! | [`placement`] | Occupancy map, empty-slot search, move validation |
//! | [`spectra`] | Device pool and the in-service guard |
//! | [`tech_groups`] | Derived tech assignment groups |

pub mod assignment;
pub mod balance;
pub mod constants;
pub mod error;
pub mod grid;
pub mod model;
pub mod naming;
pub mod placement;
pub mod spectra;
pub mod tech_groups;

pub use error::{CensusError, Result};
