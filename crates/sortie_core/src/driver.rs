//! Default world driver for unattended runs.
//!
//! [`ClockDriver`] does no movement or combat. Per tick it advances the clock
//! by `time_compression` seconds, burns fuel, and resolves missions from what
//! is left on the board:
//!
//! - aircraft and in-flight weapons that run dry are lost (weapons count as
//!   ineffective rather than as casualties)
//! - patrols earn one period when an assigned unit sits inside the area and
//!   the scoring interval has elapsed; they fail once every assigned unit is
//!   gone and succeed at their end time
//! - strikes succeed once every target is gone and fail once every attacker is
//! - rescues fail once every assigned unit is gone

use tracing::{debug, trace};

use crate::casualties::increment_casualty;
use crate::completion::increment_patrol_period_success;
use crate::game::WorldDriver;
use crate::mission::{Mission, MissionOutcome, MissionStatus, PATROL_SCORING_INTERVAL_SECONDS};
use crate::scenario::Scenario;
use crate::scoring::{
    process_fuel_exhaustion, process_patrol_mission_success, process_strike_mission_success,
    process_weapon_ineffective,
};
use crate::units::Combatant;

const SECONDS_PER_HOUR: f64 = 3600.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MissionAction {
    PatrolPeriod,
    Resolve(MissionOutcome),
}

/// Clock-only world driver.
#[derive(Debug, Clone)]
pub struct ClockDriver {
    patrol_interval: i64,
}

impl Default for ClockDriver {
    fn default() -> Self {
        Self {
            patrol_interval: PATROL_SCORING_INTERVAL_SECONDS,
        }
    }
}

impl ClockDriver {
    /// Driver with the default patrol cadence.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds between scored patrol periods.
    #[must_use]
    pub fn with_patrol_interval(mut self, seconds: i64) -> Self {
        self.patrol_interval = seconds;
        self
    }

    fn burn_fuel(scenario: &mut Scenario, seconds: i64) {
        let hours = seconds as f64 / SECONDS_PER_HOUR;
        let mut lost_aircraft = Vec::new();
        for aircraft in &mut scenario.aircraft {
            if aircraft.fuel_rate <= 0.0 {
                continue;
            }
            aircraft.current_fuel = (aircraft.current_fuel - aircraft.fuel_rate * hours).max(0.0);
            if aircraft.current_fuel <= 0.0 {
                lost_aircraft.push(aircraft.tag());
            }
        }
        for ship in &mut scenario.ships {
            if ship.fuel_rate > 0.0 {
                ship.current_fuel = (ship.current_fuel - ship.fuel_rate * hours).max(0.0);
            }
        }
        let mut spent_weapons = Vec::new();
        for weapon in &mut scenario.weapons {
            if weapon.fuel_rate <= 0.0 {
                continue;
            }
            weapon.current_fuel = (weapon.current_fuel - weapon.fuel_rate * hours).max(0.0);
            if weapon.current_fuel <= 0.0 {
                spent_weapons.push(weapon.tag());
            }
        }

        for tag in lost_aircraft {
            debug!(unit = %tag.id, "Aircraft out of fuel");
            process_fuel_exhaustion(&mut scenario.sides, &tag);
            increment_casualty(&mut scenario.sides, &tag);
            scenario.remove_unit(&tag.id);
        }
        for tag in spent_weapons {
            trace!(unit = %tag.id, "Weapon out of fuel");
            process_weapon_ineffective(&mut scenario.sides, &tag);
            scenario.remove_unit(&tag.id);
        }
    }

    fn evaluate(scenario: &Scenario, mission: &Mission) -> Option<MissionAction> {
        let units = mission.assigned_unit_ids();
        let all_units_lost = !units.is_empty() && !units.iter().any(|id| scenario.unit_exists(id));
        match mission {
            Mission::Patrol(patrol) => {
                if all_units_lost {
                    return Some(MissionAction::Resolve(MissionOutcome::Failed));
                }
                if patrol
                    .mission_end_time()
                    .is_some_and(|end| scenario.current_time >= end)
                {
                    return Some(MissionAction::Resolve(MissionOutcome::Succeeded));
                }
                let on_station = units.iter().any(|id| {
                    scenario
                        .unit_position(id)
                        .is_some_and(|(lat, lon)| patrol.contains_coordinates(lat, lon))
                });
                on_station.then_some(MissionAction::PatrolPeriod)
            }
            Mission::Strike(strike) => {
                let targets = &strike.assigned_target_ids;
                if !targets.is_empty() && !targets.iter().any(|id| scenario.unit_exists(id)) {
                    Some(MissionAction::Resolve(MissionOutcome::Succeeded))
                } else if all_units_lost {
                    Some(MissionAction::Resolve(MissionOutcome::Failed))
                } else {
                    None
                }
            }
            Mission::Rescue(_) => {
                all_units_lost.then_some(MissionAction::Resolve(MissionOutcome::Failed))
            }
        }
    }

    fn update_missions(&self, scenario: &mut Scenario) {
        let now = scenario.current_time;
        for index in 0..scenario.missions.len() {
            if scenario.missions[index].status() == MissionStatus::Assigned {
                scenario.missions[index].activate();
            }
            if scenario.missions[index].status() != MissionStatus::Active {
                continue;
            }
            match Self::evaluate(scenario, &scenario.missions[index]) {
                Some(MissionAction::PatrolPeriod) => {
                    let claimed = scenario.missions[index]
                        .as_patrol_mut()
                        .is_some_and(|patrol| patrol.try_claim_period(now, self.patrol_interval));
                    if claimed {
                        process_patrol_mission_success(&mut scenario.sides, &scenario.missions[index]);
                        increment_patrol_period_success(&mut scenario.sides, &scenario.missions[index]);
                    }
                }
                Some(MissionAction::Resolve(outcome)) => {
                    let id = scenario.missions[index].id().to_string();
                    let is_strike = matches!(scenario.missions[index], Mission::Strike(_));
                    if let Ok(true) = scenario.resolve_mission(&id, outcome) {
                        if is_strike && outcome == MissionOutcome::Succeeded {
                            process_strike_mission_success(&mut scenario.sides, &scenario.missions[index]);
                        }
                    }
                }
                None => {}
            }
        }
    }
}

impl WorldDriver for ClockDriver {
    fn advance(&mut self, scenario: &mut Scenario) {
        let seconds = scenario.time_compression.max(1);
        scenario.current_time += seconds;
        Self::burn_fuel(scenario, seconds);
        self.update_missions(scenario);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::{PatrolMission, ReferencePoint, StrikeMission};
    use crate::side::Side;
    use crate::units::{Aircraft, Facility};

    fn aircraft(id: &str, side: &str, lat: f64, lon: f64, fuel: f64, rate: f64) -> Aircraft {
        Aircraft {
            id: id.into(),
            name: id.into(),
            side_id: side.into(),
            class_name: "F-16".into(),
            latitude: lat,
            longitude: lon,
            altitude: 10_000.0,
            heading: 0.0,
            speed: 400.0,
            current_fuel: fuel,
            max_fuel: fuel,
            fuel_rate: rate,
            home_base_id: None,
            target_id: None,
            weapons: Vec::new(),
        }
    }

    fn scenario() -> Scenario {
        let mut scenario = Scenario::new("s", "Drill", 0, 3600);
        scenario.sides.insert(Side::new("a", "Alpha")).unwrap();
        scenario.sides.insert(Side::new("b", "Bravo")).unwrap();
        scenario
    }

    fn square() -> Vec<ReferencePoint> {
        vec![
            ReferencePoint::at(0.0, 0.0),
            ReferencePoint::at(0.0, 10.0),
            ReferencePoint::at(10.0, 10.0),
            ReferencePoint::at(10.0, 0.0),
        ]
    }

    #[test]
    fn test_clock_advances_by_compression() {
        let mut scenario = scenario();
        scenario.time_compression = 30;
        ClockDriver::new().advance(&mut scenario);
        assert_eq!(scenario.current_time, 30);
    }

    #[test]
    fn test_aircraft_fuel_exhaustion() {
        let mut scenario = scenario();
        scenario.time_compression = 3600;
        scenario.aircraft.push(aircraft("f1", "a", 0.0, 0.0, 50.0, 100.0));
        ClockDriver::new().advance(&mut scenario);
        assert!(scenario.aircraft.is_empty());
        let side = scenario.get_side("a").unwrap();
        assert_eq!(side.total_score, -100);
        assert_eq!(side.casualties, 1);
    }

    #[test]
    fn test_patrol_periods_then_failure() {
        let mut scenario = scenario();
        scenario.aircraft.push(aircraft("p1", "a", 5.0, 5.0, 1000.0, 0.0));
        let patrol = PatrolMission::new("m", "Patrol 1", "a", ["p1".to_string()], square(), 3000).unwrap();
        scenario.assign_mission(Mission::Patrol(patrol)).unwrap();
        scenario.time_compression = 60;

        let mut driver = ClockDriver::new();
        for _ in 0..3 {
            driver.advance(&mut scenario);
        }
        scenario.remove_unit("p1");
        driver.advance(&mut scenario);

        let side = scenario.get_side("a").unwrap();
        assert_eq!(side.total_score, 30);
        assert_eq!(side.missions_succeeded, 3);
        assert_eq!(side.missions_completed, 1);
        assert_eq!(side.missions_failed, 1);
        assert_eq!(scenario.missions[0].status(), MissionStatus::Failed);
    }

    #[test]
    fn test_strike_succeeds_when_targets_gone() {
        let mut scenario = scenario();
        scenario.aircraft.push(aircraft("f1", "a", 0.0, 0.0, 1000.0, 0.0));
        scenario.facilities.push(Facility {
            id: "sam".into(),
            name: "SAM".into(),
            side_id: "b".into(),
            class_name: "SA-2".into(),
            latitude: 0.0,
            longitude: 0.0,
            range: 10.0,
            weapons: Vec::new(),
        });
        scenario
            .assign_mission(Mission::Strike(StrikeMission {
                id: "k".into(),
                name: "Strike 1".into(),
                side_id: "a".into(),
                assigned_unit_ids: ["f1".to_string()].into(),
                assigned_target_ids: ["sam".to_string()].into(),
                active: false,
                status: MissionStatus::Assigned,
                time_limit: 600,
            }))
            .unwrap();
        let mut driver = ClockDriver::new();
        driver.advance(&mut scenario);
        assert_eq!(scenario.missions[0].status(), MissionStatus::Active);

        crate::outcome::record_kill(&mut scenario, None, "sam");
        driver.advance(&mut scenario);
        driver.advance(&mut scenario);
        let side = scenario.get_side("a").unwrap();
        assert_eq!(side.total_score, 200);
        assert_eq!(side.missions_completed, 1);
        assert_eq!(side.missions_succeeded, 1);
    }
}
