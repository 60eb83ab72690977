//! Feature extraction from recorded runs.
//!
//! Turns the first and last snapshot of a run into a fixed-schema
//! [`FeatureRow`]: per-side unit totals, per-class counts, fuel, stored
//! ordnance, mission counts and a binary outcome label. The first snapshot
//! supplies the initial force composition; the last supplies casualties and
//! mission success.
//!
//! Side A and side B are `sides[0]` and `sides[1]` of the first snapshot.
//! Casualties are read positionally from the last snapshot, success rates by
//! side id.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use sortie_core::completion::calculate_side_mission_success_rate;
use sortie_core::playback::RecourseLines;
use sortie_core::scenario::SNAPSHOT_SCENARIO_KEY;
use sortie_core::side::Side;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::OutcomeThresholds;

/// Ship classes counted per side: `(column suffix, className)`.
pub const SHIP_CLASSES: &[(&str, &str)] = &[
    ("aircraft_carrier", "Aircraft Carrier"),
    ("destroyer", "Destroyer"),
    ("frigate", "Frigate"),
    ("corvette", "Corvette"),
    ("amphibious_assault_ship", "Amphibious Assault Ship"),
    ("patrol_boat", "Patrol Boat"),
];

/// Aircraft classes counted per side.
pub const AIRCRAFT_CLASSES: &[(&str, &str)] = &[
    ("f35a_lightning_ii", "F-35A Lightning II"),
    ("kc135r_stratotanker", "KC-135R Stratotanker"),
    ("a10c_thunderbolt_ii", "A-10C Thunderbolt II"),
    ("b2_spirit", "B-2 Spirit"),
    ("f22_raptor", "F-22 Raptor"),
    ("c130_hercules", "C-130 Hercules"),
    ("c17_globemaster_iii", "C-17 Globemaster III"),
    ("f16_fighting_falcon", "F-16 Fighting Falcon"),
    ("f15_eagle", "F-15 Eagle"),
    ("fa18_hornet", "F/A-18 Hornet"),
    ("b52_stratofortress", "B-52 Stratofortress"),
    ("f4_phantom_ii", "F-4 Phantom II"),
    ("b1b_lancer", "B-1B Lancer"),
    ("c12_huron", "C-12 Huron"),
    ("f14_tomcat", "F-14 Tomcat"),
    ("e3_sentry", "E-3 Sentry"),
    ("p8_poseidon", "P-8 Poseidon"),
];

/// SAM site classes counted per side.
pub const SAM_CLASSES: &[(&str, &str)] = &[
    ("s400_triumf", "S-400 Triumf"),
    ("s300v4", "S-300V4"),
    ("s500_prometey", "S-500 Prometey"),
    ("buk_m3", "Buk-M3"),
    ("tor_m2", "Tor-M2"),
    ("pantsir_s1", "Pantsir-S1"),
    ("hq9", "HQ-9"),
    ("hq19", "HQ-19"),
    ("hq16", "HQ-16"),
    ("hq17", "HQ-17"),
    ("hq7", "HQ-7"),
    ("mim104_patriot", "MIM-104 Patriot"),
    ("thaad", "THAAD"),
    ("aster30", "Aster 30"),
    ("barak8", "Barak 8"),
    ("nasams", "NASAMS"),
    ("s300", "S-300"),
    ("s500", "S-500"),
];

/// Mission name substring counted as a patrol.
pub const PATROL_NAME_MARKER: &str = "Patrol";
/// Mission name substring counted as a strike.
pub const STRIKE_NAME_MARKER: &str = "Strike";

/// Error type for feature extraction.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// A snapshot line is not valid JSON of the expected shape.
    #[error("Malformed {which} snapshot: {source}")]
    MalformedSnapshot {
        /// `"first"` or `"last"`.
        which: &'static str,
        /// Parse failure.
        #[source]
        source: serde_json::Error,
    },
    /// Extraction needs two opposing sides.
    #[error("Expected two sides in snapshot, found {found}")]
    MissingSides {
        /// Number of sides present.
        found: usize,
    },
}

/// One numeric cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeatureValue {
    /// Integer count or label.
    Count(u64),
    /// Continuous amount.
    Amount(f64),
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(value) => write!(f, "{value}"),
            Self::Amount(value) => write!(f, "{value}"),
        }
    }
}

// Lenient views of the snapshot: only the fields the extractor reads.

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotView {
    #[serde(default)]
    name: String,
    #[serde(default)]
    sides: Vec<Side>,
    #[serde(default)]
    aircraft: Vec<UnitView>,
    #[serde(default)]
    ships: Vec<UnitView>,
    #[serde(default)]
    facilities: Vec<UnitView>,
    #[serde(default)]
    airbases: Vec<UnitView>,
    #[serde(default)]
    missions: Vec<MissionView>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnitView {
    side_id: String,
    #[serde(default)]
    class_name: String,
    #[serde(default)]
    current_fuel: f64,
    #[serde(default)]
    weapons: Vec<StoredWeaponView>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredWeaponView {
    #[serde(default)]
    current_quantity: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MissionView {
    side_id: String,
    #[serde(default)]
    name: String,
}

fn parse_snapshot(line: &str, which: &'static str) -> Result<SnapshotView, ExtractError> {
    let malformed = |source| ExtractError::MalformedSnapshot { which, source };
    let mut value: serde_json::Value = serde_json::from_str(line).map_err(malformed)?;
    let inner = value
        .as_object_mut()
        .and_then(|object| object.remove(SNAPSHOT_SCENARIO_KEY));
    serde_json::from_value(inner.unwrap_or(value)).map_err(malformed)
}

/// Features of one side.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SideFeatures {
    /// Side id.
    pub side_id: String,
    /// Binary outcome label.
    pub outcome: u8,
    /// Ships at the start.
    pub total_ships: u64,
    /// Aircraft at the start.
    pub total_planes: u64,
    /// Facilities at the start.
    pub total_sam_sites: u64,
    /// Airbases at the start.
    pub total_airbases: u64,
    /// Fuel across aircraft and ships at the start.
    pub total_fuel_available: f64,
    /// Counts aligned with [`SHIP_CLASSES`].
    pub ship_classes: Vec<u64>,
    /// Counts aligned with [`AIRCRAFT_CLASSES`].
    pub aircraft_classes: Vec<u64>,
    /// Counts aligned with [`SAM_CLASSES`].
    pub sam_classes: Vec<u64>,
    /// Rounds in ship magazines at the start.
    pub total_weapons_stored: u64,
    /// Missions assigned at the start.
    pub total_missions_assigned: u64,
    /// Missions whose name marks a patrol.
    pub patrol_missions_assigned: u64,
    /// Missions whose name marks a strike.
    pub strike_missions_assigned: u64,
    /// Casualties at the end.
    pub casualties: u64,
    /// `casualties / initial units`, `0` with no units.
    pub casualty_rate: f64,
    /// Mission success rate at the end.
    pub mission_success_rate: f64,
}

impl SideFeatures {
    fn from_initial<'s>(snapshot: &'s SnapshotView, side_id: &str) -> Self {
        let owned = |units: &'s [UnitView]| {
            units
                .iter()
                .filter(|unit| unit.side_id == side_id)
                .collect::<Vec<_>>()
        };
        let ships = owned(&snapshot.ships);
        let planes = owned(&snapshot.aircraft);
        let sams = owned(&snapshot.facilities);
        let airbases = owned(&snapshot.airbases);

        let class_counts = |units: &[&UnitView], table: &[(&str, &str)]| {
            table
                .iter()
                .map(|(_, class_name)| {
                    units
                        .iter()
                        .filter(|unit| unit.class_name == *class_name)
                        .count() as u64
                })
                .collect::<Vec<_>>()
        };

        let missions: Vec<&MissionView> = snapshot
            .missions
            .iter()
            .filter(|mission| mission.side_id == side_id)
            .collect();
        let named = |marker: &str| {
            missions
                .iter()
                .filter(|mission| mission.name.contains(marker))
                .count() as u64
        };

        Self {
            side_id: side_id.to_string(),
            total_ships: ships.len() as u64,
            total_planes: planes.len() as u64,
            total_sam_sites: sams.len() as u64,
            total_airbases: airbases.len() as u64,
            total_fuel_available: planes
                .iter()
                .chain(ships.iter())
                .map(|unit| unit.current_fuel)
                .sum(),
            ship_classes: class_counts(&ships, SHIP_CLASSES),
            aircraft_classes: class_counts(&planes, AIRCRAFT_CLASSES),
            sam_classes: class_counts(&sams, SAM_CLASSES),
            total_weapons_stored: ships
                .iter()
                .flat_map(|ship| ship.weapons.iter())
                .map(|weapon| weapon.current_quantity)
                .sum(),
            total_missions_assigned: missions.len() as u64,
            patrol_missions_assigned: named(PATROL_NAME_MARKER),
            strike_missions_assigned: named(STRIKE_NAME_MARKER),
            ..Self::default()
        }
    }

    /// Units the side started with.
    #[must_use]
    pub fn total_initial_units(&self) -> u64 {
        self.total_ships + self.total_planes + self.total_sam_sites + self.total_airbases
    }

    fn apply_result(&mut self, final_side: &Side, success_rate: f64, thresholds: &OutcomeThresholds) {
        self.casualties = u64::from(final_side.casualties);
        let initial = self.total_initial_units();
        self.casualty_rate = if initial > 0 {
            self.casualties as f64 / initial as f64
        } else {
            0.0
        };
        self.mission_success_rate = success_rate;
        self.outcome = thresholds.label(self.casualty_rate, success_rate);
    }

    /// Feature cells in column order, without the outcome label.
    fn cells(&self) -> Vec<(String, FeatureValue)> {
        use FeatureValue::{Amount, Count};

        let mut cells = vec![
            ("total_ships".to_string(), Count(self.total_ships)),
            ("total_planes".to_string(), Count(self.total_planes)),
            ("total_sam_sites".to_string(), Count(self.total_sam_sites)),
            ("total_airbases".to_string(), Count(self.total_airbases)),
            (
                "total_fuel_available".to_string(),
                Amount(self.total_fuel_available),
            ),
        ];
        for (table, counts) in [
            (SHIP_CLASSES, &self.ship_classes),
            (AIRCRAFT_CLASSES, &self.aircraft_classes),
            (SAM_CLASSES, &self.sam_classes),
        ] {
            cells.extend(
                table
                    .iter()
                    .zip(counts.iter())
                    .map(|((column, _), count)| ((*column).to_string(), Count(*count))),
            );
        }
        cells.extend([
            (
                "total_weapons_stored".to_string(),
                Count(self.total_weapons_stored),
            ),
            (
                "total_missions_assigned".to_string(),
                Count(self.total_missions_assigned),
            ),
            (
                "patrol_missions_assigned".to_string(),
                Count(self.patrol_missions_assigned),
            ),
            (
                "strike_missions_assigned".to_string(),
                Count(self.strike_missions_assigned),
            ),
        ]);
        cells
    }
}

/// Fixed-schema summary of one finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    /// Scenario the row was extracted from. Not a column.
    pub scenario_name: String,
    /// First side.
    pub side_a: SideFeatures,
    /// Second side.
    pub side_b: SideFeatures,
}

impl FeatureRow {
    /// All columns in order: outcomes first, then `side_a_*`/`side_b_*` pairs.
    #[must_use]
    pub fn columns(&self) -> Vec<(String, FeatureValue)> {
        let mut columns = vec![
            (
                "side_a_outcome".to_string(),
                FeatureValue::Count(u64::from(self.side_a.outcome)),
            ),
            (
                "side_b_outcome".to_string(),
                FeatureValue::Count(u64::from(self.side_b.outcome)),
            ),
        ];
        for ((name, a), (_, b)) in self.side_a.cells().into_iter().zip(self.side_b.cells()) {
            columns.push((format!("side_a_{name}"), a));
            columns.push((format!("side_b_{name}"), b));
        }
        columns
    }

    /// Column names in order.
    #[must_use]
    pub fn header(&self) -> Vec<String> {
        self.columns().into_iter().map(|(name, _)| name).collect()
    }

    /// Column names every row carries, without needing a row.
    #[must_use]
    pub fn schema() -> Vec<String> {
        let side = SideFeatures {
            ship_classes: vec![0; SHIP_CLASSES.len()],
            aircraft_classes: vec![0; AIRCRAFT_CLASSES.len()],
            sam_classes: vec![0; SAM_CLASSES.len()],
            ..SideFeatures::default()
        };
        Self {
            scenario_name: String::new(),
            side_a: side.clone(),
            side_b: side,
        }
        .header()
    }

    /// Cell values as strings, in column order.
    #[must_use]
    pub fn csv_record(&self) -> Vec<String> {
        self.columns()
            .into_iter()
            .map(|(_, value)| value.to_string())
            .collect()
    }
}

impl Serialize for FeatureRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let columns = self.columns();
        let mut map = serializer.serialize_map(Some(columns.len()))?;
        for (name, value) in &columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Extract a feature row from the first and last snapshot of a run.
///
/// # Errors
/// Fails when either line is malformed or has fewer than two sides.
pub fn extract_features(
    first_line: &str,
    last_line: &str,
    thresholds: &OutcomeThresholds,
) -> Result<FeatureRow, ExtractError> {
    let initial = parse_snapshot(first_line, "first")?;
    let result = parse_snapshot(last_line, "last")?;

    let [side_a, side_b, ..] = initial.sides.as_slice() else {
        return Err(ExtractError::MissingSides {
            found: initial.sides.len(),
        });
    };
    let [final_a, final_b, ..] = result.sides.as_slice() else {
        return Err(ExtractError::MissingSides {
            found: result.sides.len(),
        });
    };

    let success_rate = |side_id: &str| {
        result
            .sides
            .iter()
            .find(|side| side.id == side_id)
            .map_or(0.0, calculate_side_mission_success_rate)
    };

    let mut features_a = SideFeatures::from_initial(&initial, &side_a.id);
    let mut features_b = SideFeatures::from_initial(&initial, &side_b.id);
    features_a.apply_result(final_a, success_rate(&side_a.id), thresholds);
    features_b.apply_result(final_b, success_rate(&side_b.id), thresholds);

    debug!(
        scenario = %initial.name,
        side_a_outcome = features_a.outcome,
        side_b_outcome = features_b.outcome,
        "Extracted features"
    );

    Ok(FeatureRow {
        scenario_name: initial.name,
        side_a: features_a,
        side_b: features_b,
    })
}

/// Extract a row for a finished run, or `None` when the run did not end.
///
/// # Errors
/// Propagates extraction failures for finished runs.
pub fn process_recourse_data(
    lines: &RecourseLines,
    thresholds: &OutcomeThresholds,
) -> Result<Option<FeatureRow>, ExtractError> {
    if !lines.has_game_ended {
        info!("Game has not ended, recourse data will not be processed");
        return Ok(None);
    }
    extract_features(&lines.first, &lines.last, thresholds).map(Some)
}
