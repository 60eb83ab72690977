//! Side ledger: per-faction score, casualty and mission counters.
//!
//! Sides are created when a scenario loads and are only mutated by the
//! outcome calculators in [`crate::scoring`], [`crate::casualties`] and
//! [`crate::completion`]. The ledger owns every side exclusively; calculators
//! borrow it for the duration of one call and never keep a reference.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Display colour of a side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SideColor {
    /// Red.
    Red,
    /// Blue.
    Blue,
    /// Green.
    Green,
    /// Yellow.
    Yellow,
    /// Black, also used for unknown colour names.
    #[default]
    #[serde(other)]
    Black,
}

/// A faction with aggregate counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Side {
    /// Unique side identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Running score, may go negative.
    #[serde(default)]
    pub total_score: i64,
    /// Units lost.
    #[serde(default)]
    pub casualties: u32,
    /// Missions handed to this side.
    #[serde(default)]
    pub missions_assigned: u32,
    /// Missions that reached a terminal state.
    #[serde(default)]
    pub missions_completed: u32,
    /// Successful missions plus successful patrol periods.
    #[serde(default)]
    pub missions_succeeded: u32,
    /// Failed missions.
    #[serde(default)]
    pub missions_failed: u32,
    /// Display colour.
    #[serde(default)]
    pub color: SideColor,
}

impl Side {
    /// Create a side with zeroed counters.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            total_score: 0,
            casualties: 0,
            missions_assigned: 0,
            missions_completed: 0,
            missions_succeeded: 0,
            missions_failed: 0,
            color: SideColor::default(),
        }
    }

    /// Set the display colour.
    #[must_use]
    pub fn with_color(mut self, color: SideColor) -> Self {
        self.color = color;
        self
    }

    /// Record one terminal mission result.
    ///
    /// `missionsCompleted` and exactly one of succeeded/failed move together,
    /// so the pair is always updated as a single bookkeeping operation.
    pub(crate) fn record_completion(&mut self, succeeded: bool) {
        let before = (
            self.missions_completed,
            self.missions_succeeded,
            self.missions_failed,
        );
        self.missions_completed += 1;
        if succeeded {
            self.missions_succeeded += 1;
        } else {
            self.missions_failed += 1;
        }
        debug_assert_eq!(
            self.missions_completed - before.0,
            (self.missions_succeeded - before.1) + (self.missions_failed - before.2)
        );
    }
}

/// Ordered collection of sides, unique by id.
///
/// Order is significant: snapshots are consumed positionally (`sides[0]`,
/// `sides[1]`) by the feature extractor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Side>", into = "Vec<Side>")]
pub struct SideLedger {
    sides: Vec<Side>,
}

impl SideLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self { sides: Vec::new() }
    }

    /// Add a side, rejecting duplicate ids.
    pub fn insert(&mut self, side: Side) -> Result<()> {
        if self.get(&side.id).is_some() {
            return Err(EngineError::DuplicateSide(side.id));
        }
        self.sides.push(side);
        Ok(())
    }

    /// Remove a side by id.
    pub fn remove(&mut self, side_id: &str) -> Option<Side> {
        let index = self.sides.iter().position(|s| s.id == side_id)?;
        Some(self.sides.remove(index))
    }

    /// Look up a side by id.
    #[must_use]
    pub fn get(&self, side_id: &str) -> Option<&Side> {
        self.sides.iter().find(|s| s.id == side_id)
    }

    /// Look up a side by id for mutation.
    pub fn get_mut(&mut self, side_id: &str) -> Option<&mut Side> {
        self.sides.iter_mut().find(|s| s.id == side_id)
    }

    /// Side at a given position.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<&Side> {
        self.sides.get(index)
    }

    /// Iterate sides in ledger order.
    pub fn iter(&self) -> impl Iterator<Item = &Side> {
        self.sides.iter()
    }

    /// Number of sides.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sides.len()
    }

    /// Whether the ledger has no sides.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sides.is_empty()
    }
}

impl TryFrom<Vec<Side>> for SideLedger {
    type Error = EngineError;

    fn try_from(sides: Vec<Side>) -> Result<Self> {
        let mut ledger = Self::new();
        for side in sides {
            ledger.insert(side)?;
        }
        Ok(ledger)
    }
}

impl From<SideLedger> for Vec<Side> {
    fn from(ledger: SideLedger) -> Self {
        ledger.sides
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_side_has_zeroed_counters() {
        let side = Side::new("blue", "Blue Force");
        assert_eq!(side.total_score, 0);
        assert_eq!(side.casualties, 0);
        assert_eq!(side.missions_completed, 0);
        assert_eq!(side.color, SideColor::Black);
    }

    #[test]
    fn test_record_completion_moves_counters_together() {
        let mut side = Side::new("blue", "Blue Force");
        side.record_completion(true);
        side.record_completion(false);
        side.record_completion(false);
        assert_eq!(side.missions_completed, 3);
        assert_eq!(side.missions_succeeded, 1);
        assert_eq!(side.missions_failed, 2);
    }

    #[test]
    fn test_ledger_rejects_duplicate_ids() {
        let mut ledger = SideLedger::new();
        ledger.insert(Side::new("a", "Alpha")).unwrap();
        let err = ledger.insert(Side::new("a", "Again")).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateSide(id) if id == "a"));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_ledger_preserves_order() {
        let mut ledger = SideLedger::new();
        ledger.insert(Side::new("b", "Bravo")).unwrap();
        ledger.insert(Side::new("a", "Alpha")).unwrap();
        assert_eq!(ledger.at(0).unwrap().id, "b");
        assert_eq!(ledger.at(1).unwrap().id, "a");
    }

    #[test]
    fn test_side_json_uses_camel_case_and_defaults() {
        let side: Side =
            serde_json::from_str(r#"{"id":"x","name":"X","totalScore":-20,"color":"magenta"}"#)
                .unwrap();
        assert_eq!(side.total_score, -20);
        assert_eq!(side.missions_assigned, 0);
        assert_eq!(side.color, SideColor::Black);

        let json = serde_json::to_string(&side).unwrap();
        assert!(json.contains("\"missionsSucceeded\":0"));
    }

    #[test]
    fn test_ledger_deserialize_rejects_duplicates() {
        let result: std::result::Result<SideLedger, _> =
            serde_json::from_str(r#"[{"id":"a","name":"A"},{"id":"a","name":"B"}]"#);
        assert!(result.is_err());
    }
}
