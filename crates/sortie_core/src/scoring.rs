//! Scoring engine.
//!
//! Stateless point awards applied to the [`SideLedger`]. Every function looks
//! up the owning side by id and silently returns if it is missing: events from
//! the combat collaborator may reference sides that have already been removed.

use tracing::{debug, trace};

use crate::mission::Mission;
use crate::side::SideLedger;
use crate::units::{UnitKind, UnitTag};

/// Base award for destroying an enemy.
pub const KILL_POINTS: i64 = 50;
/// Award when the victor is a facility such as a SAM site.
pub const FACILITY_KILL_POINTS: i64 = 30;
/// Award for intercepting a weapon in flight.
pub const INTERCEPT_POINTS: i64 = 10;
/// Penalty for losing a facility or airbase.
pub const INSTALLATION_LOSS_POINTS: i64 = -70;
/// Penalty for losing any other unit.
pub const UNIT_LOSS_POINTS: i64 = -50;
/// Penalty for running a unit out of fuel.
pub const FUEL_EXHAUSTION_POINTS: i64 = -100;
/// Penalty for a weapon that failed to score a hit.
pub const WEAPON_INEFFECTIVE_POINTS: i64 = -5;
/// Award for a successful strike mission.
pub const STRIKE_SUCCESS_POINTS: i64 = 200;
/// Award for each qualifying patrol period.
pub const PATROL_PERIOD_POINTS: i64 = 10;

fn adjust(ledger: &mut SideLedger, side_id: &str, points: i64, reason: &str) {
    match ledger.get_mut(side_id) {
        Some(side) => {
            side.total_score += points;
            trace!(side = %side.name, points, total = side.total_score, reason, "Score adjusted");
        }
        None => debug!(side_id, reason, "Ignoring score event for unknown side"),
    }
}

/// Points the victor earns for destroying `defeated`.
///
/// A facility victor earns the facility rate. Airbases score like mobile
/// units: intercepting a weapon earns the intercept rate, anything else the
/// base rate.
#[must_use]
pub const fn kill_award(victor: UnitKind, defeated: UnitKind) -> i64 {
    if matches!(victor, UnitKind::Facility) {
        FACILITY_KILL_POINTS
    } else if matches!(defeated, UnitKind::Weapon) {
        INTERCEPT_POINTS
    } else {
        KILL_POINTS
    }
}

/// Points the defeated side loses.
#[must_use]
pub const fn loss_penalty(defeated: UnitKind) -> i64 {
    if defeated.is_installation() {
        INSTALLATION_LOSS_POINTS
    } else {
        UNIT_LOSS_POINTS
    }
}

/// Apply a kill. A `None` victor penalizes the defeated side only.
pub fn process_kill(ledger: &mut SideLedger, victor: Option<&UnitTag>, defeated: &UnitTag) {
    if let Some(victor) = victor {
        adjust(
            ledger,
            &victor.side_id,
            kill_award(victor.kind, defeated.kind),
            "kill",
        );
    }
    adjust(
        ledger,
        &defeated.side_id,
        loss_penalty(defeated.kind),
        "loss",
    );
}

/// A unit ran out of fuel.
pub fn process_fuel_exhaustion(ledger: &mut SideLedger, unit: &UnitTag) {
    adjust(
        ledger,
        &unit.side_id,
        FUEL_EXHAUSTION_POINTS,
        "fuel_exhaustion",
    );
}

/// A fired weapon missed.
pub fn process_weapon_ineffective(ledger: &mut SideLedger, weapon: &UnitTag) {
    adjust(
        ledger,
        &weapon.side_id,
        WEAPON_INEFFECTIVE_POINTS,
        "weapon_ineffective",
    );
}

/// Strike objective achieved.
pub fn process_strike_mission_success(ledger: &mut SideLedger, mission: &Mission) {
    adjust(
        ledger,
        mission.side_id(),
        STRIKE_SUCCESS_POINTS,
        "strike_success",
    );
}

/// One qualifying patrol period. Called once per period, not once per mission.
pub fn process_patrol_mission_success(ledger: &mut SideLedger, mission: &Mission) {
    adjust(
        ledger,
        mission.side_id(),
        PATROL_PERIOD_POINTS,
        "patrol_period",
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::side::Side;

    fn ledger() -> SideLedger {
        let mut ledger = SideLedger::new();
        ledger.insert(Side::new("a", "Alpha")).unwrap();
        ledger.insert(Side::new("b", "Bravo")).unwrap();
        ledger
    }

    fn score(ledger: &SideLedger, id: &str) -> i64 {
        ledger.get(id).unwrap().total_score
    }

    #[test]
    fn test_kill_awards() {
        assert_eq!(kill_award(UnitKind::Aircraft, UnitKind::Ship), 50);
        assert_eq!(kill_award(UnitKind::Facility, UnitKind::Aircraft), 30);
        assert_eq!(kill_award(UnitKind::Facility, UnitKind::Weapon), 30);
        assert_eq!(kill_award(UnitKind::Ship, UnitKind::Weapon), 10);
        assert_eq!(kill_award(UnitKind::Airbase, UnitKind::Ship), 50);
        assert_eq!(kill_award(UnitKind::Airbase, UnitKind::Weapon), 10);
        assert_eq!(loss_penalty(UnitKind::Airbase), -70);
        assert_eq!(loss_penalty(UnitKind::Facility), -70);
        assert_eq!(loss_penalty(UnitKind::Aircraft), -50);
    }

    #[test]
    fn test_process_kill_updates_both_sides() {
        let mut ledger = ledger();
        let victor = UnitTag::new("f1", "a", UnitKind::Aircraft);
        let defeated = UnitTag::new("s1", "b", UnitKind::Ship);
        process_kill(&mut ledger, Some(&victor), &defeated);
        assert_eq!(score(&ledger, "a"), 50);
        assert_eq!(score(&ledger, "b"), -50);
    }

    #[test]
    fn test_null_victor_penalizes_only_defeated() {
        let mut ledger = ledger();
        let defeated = UnitTag::new("sam", "b", UnitKind::Facility);
        process_kill(&mut ledger, None, &defeated);
        assert_eq!(score(&ledger, "a"), 0);
        assert_eq!(score(&ledger, "b"), -70);
    }

    #[test]
    fn test_unknown_side_is_noop() {
        let mut ledger = ledger();
        let ghost = UnitTag::new("x", "ghost", UnitKind::Aircraft);
        process_fuel_exhaustion(&mut ledger, &ghost);
        process_kill(&mut ledger, Some(&ghost), &ghost);
        assert_eq!(score(&ledger, "a"), 0);
        assert_eq!(score(&ledger, "b"), 0);
    }

    #[test]
    fn test_penalties() {
        let mut ledger = ledger();
        process_fuel_exhaustion(&mut ledger, &UnitTag::new("p", "a", UnitKind::Aircraft));
        process_weapon_ineffective(&mut ledger, &UnitTag::new("w", "a", UnitKind::Weapon));
        assert_eq!(score(&ledger, "a"), -105);
    }
}
