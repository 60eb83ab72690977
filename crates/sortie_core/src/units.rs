//! Unit variants tracked by a scenario.
//!
//! Movement, detection and combat resolution for these units live outside
//! the engine. The engine only needs their identity, owning side and kind,
//! plus the fuel and magazine fields that snapshots and the feature extractor
//! read. Field names follow the snapshot wire format (`sideId`, `className`,
//! `currentFuel`, `currentQuantity`).

use serde::{Deserialize, Serialize};

/// Kind tag for anything that can score or be scored against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    /// Fixed- or rotary-wing aircraft.
    Aircraft,
    /// Surface vessel.
    Ship,
    /// Fixed installation such as a SAM site.
    Facility,
    /// Airbase.
    Airbase,
    /// Expendable munition in flight.
    Weapon,
}

impl UnitKind {
    /// Fixed installations (facilities and airbases).
    #[must_use]
    pub const fn is_installation(self) -> bool {
        matches!(self, Self::Facility | Self::Airbase)
    }

    /// Whether losing this unit counts as a casualty.
    #[must_use]
    pub const fn is_casualty_capable(self) -> bool {
        !matches!(self, Self::Weapon)
    }
}

/// Owned identity of a unit, detached from scenario storage.
///
/// Calculators take tags instead of unit references so that callers can
/// mutate the scenario's side ledger while reading its unit collections.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnitTag {
    /// Unit identifier.
    pub id: String,
    /// Owning side.
    pub side_id: String,
    /// Kind tag.
    pub kind: UnitKind,
}

impl UnitTag {
    /// Create a tag.
    #[must_use]
    pub fn new(id: impl Into<String>, side_id: impl Into<String>, kind: UnitKind) -> Self {
        Self {
            id: id.into(),
            side_id: side_id.into(),
            kind,
        }
    }
}

/// Capability shared by every unit variant.
pub trait Combatant {
    /// Unit identifier.
    fn id(&self) -> &str;
    /// Owning side.
    fn side_id(&self) -> &str;
    /// Class name, e.g. "F-22 Raptor".
    fn class_name(&self) -> &str;
    /// Kind tag.
    fn kind(&self) -> UnitKind;

    /// Owned identity for calculator calls.
    fn tag(&self) -> UnitTag {
        UnitTag::new(self.id(), self.side_id(), self.kind())
    }
}

macro_rules! impl_combatant {
    ($ty:ty, $kind:expr) => {
        impl Combatant for $ty {
            fn id(&self) -> &str {
                &self.id
            }
            fn side_id(&self) -> &str {
                &self.side_id
            }
            fn class_name(&self) -> &str {
                &self.class_name
            }
            fn kind(&self) -> UnitKind {
                $kind
            }
        }
    };
}

/// A munition, either stored in a magazine or in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weapon {
    /// Identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Owning side.
    pub side_id: String,
    /// Class name.
    #[serde(default)]
    pub class_name: String,
    /// Unit that fired this weapon, if in flight.
    #[serde(default)]
    pub launcher_id: Option<String>,
    /// Target unit, if in flight.
    #[serde(default)]
    pub target_id: Option<String>,
    /// Latitude in degrees.
    #[serde(default)]
    pub latitude: f64,
    /// Longitude in degrees.
    #[serde(default)]
    pub longitude: f64,
    /// Speed in knots.
    #[serde(default)]
    pub speed: f64,
    /// Remaining fuel.
    #[serde(default)]
    pub current_fuel: f64,
    /// Fuel capacity.
    #[serde(default)]
    pub max_fuel: f64,
    /// Fuel burned per hour.
    #[serde(default)]
    pub fuel_rate: f64,
    /// Probability of a kill on arrival.
    #[serde(default)]
    pub lethality: f64,
    /// Rounds in the magazine.
    #[serde(default)]
    pub current_quantity: u32,
    /// Magazine capacity.
    #[serde(default)]
    pub max_quantity: u32,
}

impl_combatant!(Weapon, UnitKind::Weapon);

/// An aircraft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aircraft {
    /// Identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Owning side.
    pub side_id: String,
    /// Class name.
    #[serde(default)]
    pub class_name: String,
    /// Latitude in degrees.
    #[serde(default)]
    pub latitude: f64,
    /// Longitude in degrees.
    #[serde(default)]
    pub longitude: f64,
    /// Altitude in feet.
    #[serde(default)]
    pub altitude: f64,
    /// Heading in degrees.
    #[serde(default)]
    pub heading: f64,
    /// Speed in knots.
    #[serde(default)]
    pub speed: f64,
    /// Remaining fuel.
    #[serde(default)]
    pub current_fuel: f64,
    /// Fuel capacity.
    #[serde(default)]
    pub max_fuel: f64,
    /// Fuel burned per hour.
    #[serde(default)]
    pub fuel_rate: f64,
    /// Home airbase or ship.
    #[serde(default)]
    pub home_base_id: Option<String>,
    /// Current target.
    #[serde(default)]
    pub target_id: Option<String>,
    /// Stored munitions.
    #[serde(default)]
    pub weapons: Vec<Weapon>,
}

impl_combatant!(Aircraft, UnitKind::Aircraft);

/// A surface vessel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ship {
    /// Identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Owning side.
    pub side_id: String,
    /// Class name.
    #[serde(default)]
    pub class_name: String,
    /// Latitude in degrees.
    #[serde(default)]
    pub latitude: f64,
    /// Longitude in degrees.
    #[serde(default)]
    pub longitude: f64,
    /// Heading in degrees.
    #[serde(default)]
    pub heading: f64,
    /// Speed in knots.
    #[serde(default)]
    pub speed: f64,
    /// Remaining fuel.
    #[serde(default)]
    pub current_fuel: f64,
    /// Fuel capacity.
    #[serde(default)]
    pub max_fuel: f64,
    /// Fuel burned per hour.
    #[serde(default)]
    pub fuel_rate: f64,
    /// Engagement range in nautical miles.
    #[serde(default)]
    pub range: f64,
    /// Stored munitions.
    #[serde(default)]
    pub weapons: Vec<Weapon>,
}

impl_combatant!(Ship, UnitKind::Ship);

/// A fixed installation, usually a SAM site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facility {
    /// Identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Owning side.
    pub side_id: String,
    /// Class name.
    #[serde(default)]
    pub class_name: String,
    /// Latitude in degrees.
    #[serde(default)]
    pub latitude: f64,
    /// Longitude in degrees.
    #[serde(default)]
    pub longitude: f64,
    /// Engagement range in nautical miles.
    #[serde(default)]
    pub range: f64,
    /// Stored munitions.
    #[serde(default)]
    pub weapons: Vec<Weapon>,
}

impl_combatant!(Facility, UnitKind::Facility);

/// An airbase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Airbase {
    /// Identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Owning side.
    pub side_id: String,
    /// Class name.
    #[serde(default)]
    pub class_name: String,
    /// Latitude in degrees.
    #[serde(default)]
    pub latitude: f64,
    /// Longitude in degrees.
    #[serde(default)]
    pub longitude: f64,
}

impl_combatant!(Airbase, UnitKind::Airbase);
