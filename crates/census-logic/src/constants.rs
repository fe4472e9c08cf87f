//! Unit-wide constants shared by every census module.

/// Name carried by the sentinel record that marks an empty bed.
pub const VACANT: &str = "Vacant";

/// Fixed number of assignment slots on a nurse card.
pub const MAX_ASSIGNMENTS: usize = 6;

/// Default grid height in rows.
pub const DEFAULT_GRID_ROWS: u16 = 12;

/// Default grid width in columns. 12 × 14 gives a perimeter of exactly 48 cells.
pub const DEFAULT_GRID_COLUMNS: u16 = 14;

/// Number of beds generated for a fresh unit.
pub const SEED_BED_COUNT: usize = 48;

/// Name of the layout that always exists in the registry.
pub const DEFAULT_LAYOUT: &str = "default";

/// Label given to a tech that receives no rooms.
pub const UNASSIGNED_GROUP: &str = "Unassigned";
