//! Card placement on the unit board: occupancy, empty-slot search, and move
//! validation.
//!
//! Patients, nurses, and techs share one board. Every bed (vacant or not)
//! occupies its cell; a nurse card covers three rows of one column.

use crate::error::{CensusError, Result};
use crate::grid::{
    row_major_cells, Footprint, GridPos, GridSize, NURSE_CARD, PATIENT_CARD, TECH_CARD,
};
use crate::model::{Nurse, Patient, PatientCareTech, PatientId, StaffRef};

/// What sits in a board cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Occupant {
    Patient(PatientId),
    Staff(StaffRef),
}

impl Occupant {
    pub fn footprint(self) -> Footprint {
        match self {
            Occupant::Patient(_) => PATIENT_CARD,
            Occupant::Staff(StaffRef::Nurse(_)) => NURSE_CARD,
            Occupant::Staff(StaffRef::Tech(_)) => TECH_CARD,
        }
    }
}

/// A cell claimed by two cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overlap {
    pub cell: GridPos,
    pub first: Occupant,
    pub second: Occupant,
}

/// Cell map of the board.
#[derive(Debug, Clone)]
pub struct Occupancy {
    size: GridSize,
    cells: Vec<Option<Occupant>>,
    overlaps: Vec<Overlap>,
}

impl Occupancy {
    pub fn new(size: GridSize) -> Self {
        Self {
            size,
            cells: vec![None; size.cell_count()],
            overlaps: Vec::new(),
        }
    }

    /// Map every card on the board, skipping `exclude`.
    pub fn build(
        size: GridSize,
        patients: &[Patient],
        nurses: &[Nurse],
        techs: &[PatientCareTech],
        exclude: Option<Occupant>,
    ) -> Self {
        let mut occupancy = Self::new(size);
        let cards = patients
            .iter()
            .map(|p| (Occupant::Patient(p.id), p.grid))
            .chain(nurses.iter().map(|n| (Occupant::Staff(StaffRef::Nurse(n.id)), n.grid)))
            .chain(techs.iter().map(|t| (Occupant::Staff(StaffRef::Tech(t.id)), t.grid)));
        for (who, origin) in cards {
            if Some(who) != exclude {
                occupancy.mark(origin, who.footprint(), who);
            }
        }
        occupancy
    }

    fn index(&self, pos: GridPos) -> Option<usize> {
        self.size.contains(pos).then(|| {
            (pos.row as usize - 1) * self.size.columns as usize + (pos.column as usize - 1)
        })
    }

    /// Claim the cells of a card. Off-board cells are ignored; double claims
    /// are recorded as overlaps.
    pub fn mark(&mut self, origin: GridPos, footprint: Footprint, who: Occupant) {
        for cell in footprint.cells(origin) {
            let Some(i) = self.index(cell) else { continue };
            match self.cells[i] {
                Some(first) => self.overlaps.push(Overlap {
                    cell,
                    first,
                    second: who,
                }),
                None => self.cells[i] = Some(who),
            }
        }
    }

    pub fn occupant(&self, pos: GridPos) -> Option<Occupant> {
        self.index(pos).and_then(|i| self.cells[i])
    }

    /// First occupied cell under the footprint, if any.
    pub fn first_blocked(&self, origin: GridPos, footprint: Footprint) -> Option<GridPos> {
        footprint
            .cells(origin)
            .find(|&cell| self.occupant(cell).is_some())
    }

    /// Footprint lies on the board and every covered cell is empty.
    pub fn is_free(&self, origin: GridPos, footprint: Footprint) -> bool {
        self.size.fits(origin, footprint) && self.first_blocked(origin, footprint).is_none()
    }

    pub fn overlaps(&self) -> &[Overlap] {
        &self.overlaps
    }
}

/// Staff-occupied cells in enumeration order: nurses in roster order, then
/// techs, each card top to bottom.
pub fn staff_cells(nurses: &[Nurse], techs: &[PatientCareTech]) -> Vec<GridPos> {
    nurses
        .iter()
        .flat_map(|n| NURSE_CARD.cells(n.grid))
        .chain(techs.iter().flat_map(|t| TECH_CARD.cells(t.grid)))
        .collect()
}

/// Find an anchor for a new card of `footprint`.
///
/// First tries the positions immediately left and then right of each staff
/// cell, in enumeration order, so new staff cards cluster with existing ones.
/// Falls back to a row-major scan of the whole board. Returns `None` only when
/// no free footprint exists anywhere.
pub fn find_slot(
    size: GridSize,
    patients: &[Patient],
    nurses: &[Nurse],
    techs: &[PatientCareTech],
    footprint: Footprint,
) -> Option<GridPos> {
    let occupancy = Occupancy::build(size, patients, nurses, techs, None);

    for cell in staff_cells(nurses, techs) {
        let left = cell
            .column
            .checked_sub(footprint.width)
            .map(|c| GridPos::new(cell.row, c));
        let right = cell.column.checked_add(1).map(|c| GridPos::new(cell.row, c));
        if let Some(pos) = [left, right]
            .into_iter()
            .flatten()
            .find(|&pos| occupancy.is_free(pos, footprint))
        {
            return Some(pos);
        }
    }

    row_major_cells(size).find(|&pos| occupancy.is_free(pos, footprint))
}

/// First free cell for a bed card, preferring `preferred` in order (usually
/// the perimeter), then row-major.
pub fn find_bed_slot(
    occupancy: &Occupancy,
    size: GridSize,
    preferred: &[GridPos],
) -> Option<GridPos> {
    preferred
        .iter()
        .copied()
        .chain(row_major_cells(size))
        .find(|&pos| occupancy.is_free(pos, PATIENT_CARD))
}

/// Gate a drag of `mover` to `destination`.
///
/// The mover's own cells are ignored; any other card under the destination
/// footprint rejects the move.
pub fn validate_move(
    size: GridSize,
    patients: &[Patient],
    nurses: &[Nurse],
    techs: &[PatientCareTech],
    mover: Occupant,
    destination: GridPos,
) -> Result<()> {
    let footprint = mover.footprint();
    if !size.fits(destination, footprint) {
        return Err(CensusError::OutOfBounds(destination));
    }
    let occupancy = Occupancy::build(size, patients, nurses, techs, Some(mover));
    match occupancy.first_blocked(destination, footprint) {
        Some(cell) => Err(CensusError::PositionOccupied(cell)),
        None => Ok(()),
    }
}
