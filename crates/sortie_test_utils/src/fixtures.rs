//! Test fixtures and helpers.
//!
//! Pre-built scenarios and unit configurations for consistent testing.
//! Every fixture scenario has exactly two sides, `SIDE_A` then `SIDE_B`,
//! which is the shape the feature extractor expects.

use sortie_core::prelude::*;

/// Id of the first side in fixture scenarios.
pub const SIDE_A: &str = "side-a";
/// Id of the second side in fixture scenarios.
pub const SIDE_B: &str = "side-b";
/// Start time shared by fixture scenarios.
pub const FIXTURE_START_TIME: i64 = 1_699_073_110;
/// Duration shared by fixture scenarios.
pub const FIXTURE_DURATION: i64 = 14_400;

/// Empty scenario with a blue `SIDE_A` and a red `SIDE_B`.
///
/// # Panics
///
/// Never in practice: the two side ids are distinct.
#[must_use]
pub fn two_side_scenario(name: &str) -> Scenario {
    let mut scenario = Scenario::new(
        format!("{name}-id"),
        name,
        FIXTURE_START_TIME,
        FIXTURE_DURATION,
    );
    scenario
        .sides
        .insert(Side::new(SIDE_A, "Blue Force").with_color(SideColor::Blue))
        .expect("fixture side ids are unique");
    scenario
        .sides
        .insert(Side::new(SIDE_B, "Red Force").with_color(SideColor::Red))
        .expect("fixture side ids are unique");
    scenario
}

/// Aircraft at a position with a full tank and no fuel burn.
#[must_use]
pub fn aircraft(id: &str, side_id: &str, class_name: &str, latitude: f64, longitude: f64) -> Aircraft {
    Aircraft {
        id: id.into(),
        name: id.into(),
        side_id: side_id.into(),
        class_name: class_name.into(),
        latitude,
        longitude,
        altitude: 10_000.0,
        heading: 90.0,
        speed: 450.0,
        current_fuel: 5_000.0,
        max_fuel: 5_000.0,
        fuel_rate: 0.0,
        home_base_id: None,
        target_id: None,
        weapons: Vec::new(),
    }
}

/// Ship with `fuel` remaining and one magazine of `rounds`.
#[must_use]
pub fn ship(id: &str, side_id: &str, class_name: &str, fuel: f64, rounds: u32) -> Ship {
    Ship {
        id: id.into(),
        name: id.into(),
        side_id: side_id.into(),
        class_name: class_name.into(),
        latitude: 0.0,
        longitude: 0.0,
        heading: 0.0,
        speed: 20.0,
        current_fuel: fuel,
        max_fuel: fuel,
        fuel_rate: 0.0,
        range: 100.0,
        weapons: vec![magazine(&format!("{id}-mag"), side_id, rounds)],
    }
}

/// Fixed installation of a given class.
#[must_use]
pub fn facility(id: &str, side_id: &str, class_name: &str) -> Facility {
    Facility {
        id: id.into(),
        name: id.into(),
        side_id: side_id.into(),
        class_name: class_name.into(),
        latitude: 0.0,
        longitude: 0.0,
        range: 25.0,
        weapons: Vec::new(),
    }
}

/// Airbase.
#[must_use]
pub fn airbase(id: &str, side_id: &str) -> Airbase {
    Airbase {
        id: id.into(),
        name: id.into(),
        side_id: side_id.into(),
        class_name: "Airfield".into(),
        latitude: 0.0,
        longitude: 0.0,
    }
}

/// Stored weapon with `rounds` in the magazine.
#[must_use]
pub fn magazine(id: &str, side_id: &str, rounds: u32) -> Weapon {
    Weapon {
        id: id.into(),
        name: id.into(),
        side_id: side_id.into(),
        class_name: "Harpoon".into(),
        launcher_id: None,
        target_id: None,
        latitude: 0.0,
        longitude: 0.0,
        speed: 0.0,
        current_fuel: 0.0,
        max_fuel: 0.0,
        fuel_rate: 0.0,
        lethality: 0.5,
        current_quantity: rounds,
        max_quantity: rounds,
    }
}

/// Axis-aligned square of reference points, counter-clockwise from the
/// south-west corner.
#[must_use]
pub fn square_area(latitude: f64, longitude: f64, size: f64) -> Vec<ReferencePoint> {
    vec![
        ReferencePoint::at(latitude, longitude),
        ReferencePoint::at(latitude, longitude + size),
        ReferencePoint::at(latitude + size, longitude + size),
        ReferencePoint::at(latitude + size, longitude),
    ]
}

/// Patrol over a 10x10 degree square at the origin.
///
/// # Panics
///
/// Never in practice: the square has four points.
#[must_use]
pub fn patrol_mission(id: &str, side_id: &str, unit_ids: &[&str], time_limit: i64) -> Mission {
    Mission::Patrol(
        PatrolMission::new(
            id,
            format!("Patrol {id}"),
            side_id,
            unit_ids.iter().map(|u| (*u).to_string()),
            square_area(0.0, 0.0, 10.0),
            time_limit,
        )
        .expect("square area has four points"),
    )
}

/// Strike mission against `target_ids`.
#[must_use]
pub fn strike_mission(id: &str, side_id: &str, unit_ids: &[&str], target_ids: &[&str]) -> Mission {
    Mission::Strike(StrikeMission {
        id: id.into(),
        name: format!("Strike {id}"),
        side_id: side_id.into(),
        assigned_unit_ids: unit_ids.iter().map(|u| (*u).to_string()).collect(),
        assigned_target_ids: target_ids.iter().map(|t| (*t).to_string()).collect(),
        active: false,
        status: MissionStatus::Assigned,
        time_limit: 3_600,
    })
}

/// Rescue mission.
#[must_use]
pub fn rescue_mission(id: &str, side_id: &str, unit_ids: &[&str]) -> Mission {
    Mission::Rescue(RescueMission {
        id: id.into(),
        name: format!("Rescue {id}"),
        side_id: side_id.into(),
        assigned_unit_ids: unit_ids.iter().map(|u| (*u).to_string()).collect(),
        assigned_target_ids: Default::default(),
        active: false,
        status: MissionStatus::Assigned,
        time_limit: 3_600,
    })
}

/// A populated engagement: fighters, a frigate and a SAM site per side plus
/// a patrol for `SIDE_A` and a strike for `SIDE_B`.
///
/// # Panics
///
/// Never in practice: mission ids are unique and time limits fit.
#[must_use]
pub fn engagement_scenario(name: &str) -> Scenario {
    let mut scenario = two_side_scenario(name);
    scenario.aircraft.push(aircraft("a-f1", SIDE_A, "F-16C Fighting Falcon", 5.0, 5.0));
    scenario.aircraft.push(aircraft("a-f2", SIDE_A, "F-16C Fighting Falcon", 20.0, 20.0));
    scenario.aircraft.push(aircraft("b-f1", SIDE_B, "Su-27 Flanker", 30.0, 30.0));
    scenario.ships.push(ship("a-s1", SIDE_A, "Arleigh Burke", 1_000.0, 8));
    scenario.ships.push(ship("b-s1", SIDE_B, "Type 052D", 800.0, 4));
    scenario.facilities.push(facility("a-sam", SIDE_A, "MIM-104 Patriot"));
    scenario.facilities.push(facility("b-sam", SIDE_B, "S-400 Triumf"));
    scenario.airbases.push(airbase("b-ab", SIDE_B));
    scenario
        .assign_mission(patrol_mission("a-patrol", SIDE_A, &["a-f1"], 3_600))
        .expect("fixture patrol fits");
    scenario
        .assign_mission(strike_mission("b-strike", SIDE_B, &["b-f1"], &["a-sam"]))
        .expect("fixture strike fits");
    scenario
}

/// Snapshot lines for two scenario states.
///
/// # Panics
///
/// Panics if either scenario fails to serialize.
#[must_use]
pub fn snapshot_pair(first: &Scenario, last: &Scenario) -> (String, String) {
    (
        first.to_snapshot_line().expect("fixture serializes"),
        last.to_snapshot_line().expect("fixture serializes"),
    )
}
