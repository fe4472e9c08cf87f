//! Name validation for layouts, rooms, and devices.

use crate::error::{CensusError, Result};

/// Check a user-supplied name against the existing ones.
///
/// Returns the trimmed name. Names must be non-empty, must not contain `/`
/// (they become storage key segments), and must not match an existing name
/// ignoring case.
pub fn validate_name<'a>(
    kind: &'static str,
    name: &str,
    existing: impl IntoIterator<Item = &'a str>,
) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CensusError::EmptyName { kind });
    }
    if name.contains('/') {
        return Err(CensusError::InvalidNameCharacter {
            kind,
            name: name.to_string(),
        });
    }
    if existing.into_iter().any(|e| names_match(e, name)) {
        return Err(CensusError::DuplicateName {
            kind,
            name: name.to_string(),
        });
    }
    Ok(name.to_string())
}

/// Name equality used for every lookup and duplicate check: surrounding
/// whitespace ignored, case folded with full Unicode lowercasing.
pub fn names_match(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    a == b || a.to_lowercase() == b.to_lowercase()
}
