//! Generation - seed data for a unit that has nothing saved yet.

mod names;
mod patients;
mod staff;

pub use names::*;
pub use patients::*;
pub use staff::*;
