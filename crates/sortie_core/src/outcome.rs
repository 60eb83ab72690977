//! Entry point for combat collaborators reporting a kill.

use tracing::debug;

use crate::casualties::increment_casualty;
use crate::scenario::Scenario;
use crate::scoring::process_kill;
use crate::units::UnitTag;

/// Resolve a kill against the scenario.
///
/// Applies kill scoring, counts a casualty for anything but a weapon and
/// removes the defeated unit. Returns the defeated unit's identity, or `None`
/// if it was no longer in play.
pub fn record_kill(
    scenario: &mut Scenario,
    victor: Option<&UnitTag>,
    defeated_id: &str,
) -> Option<UnitTag> {
    let Some(defeated) = scenario.remove_unit(defeated_id) else {
        debug!(unit = defeated_id, "Kill reported for unit no longer in play");
        return None;
    };
    process_kill(&mut scenario.sides, victor, &defeated);
    if defeated.kind.is_casualty_capable() {
        increment_casualty(&mut scenario.sides, &defeated);
    }
    Some(defeated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::side::Side;
    use crate::units::{Facility, UnitKind, Weapon};

    fn scenario() -> Scenario {
        let mut scenario = Scenario::new("s", "Test", 0, 100);
        scenario.sides.insert(Side::new("a", "Alpha")).unwrap();
        scenario.sides.insert(Side::new("b", "Bravo")).unwrap();
        scenario
    }

    #[test]
    fn test_kill_facility_without_victor() {
        let mut scenario = scenario();
        scenario.facilities.push(Facility {
            id: "sam".into(),
            name: "SAM".into(),
            side_id: "b".into(),
            class_name: "SA-2".into(),
            latitude: 0.0,
            longitude: 0.0,
            range: 20.0,
            weapons: Vec::new(),
        });
        let tag = record_kill(&mut scenario, None, "sam").unwrap();
        assert_eq!(tag.kind, UnitKind::Facility);
        let b = scenario.get_side("b").unwrap();
        assert_eq!(b.total_score, -70);
        assert_eq!(b.casualties, 1);
        assert_eq!(scenario.get_side("a").unwrap().total_score, 0);
        assert!(scenario.facilities.is_empty());
    }

    #[test]
    fn test_intercepted_weapon_is_not_a_casualty() {
        let mut scenario = scenario();
        scenario.weapons.push(Weapon {
            id: "w1".into(),
            name: "Missile".into(),
            side_id: "b".into(),
            class_name: "AGM".into(),
            launcher_id: None,
            target_id: None,
            latitude: 0.0,
            longitude: 0.0,
            speed: 0.0,
            current_fuel: 1.0,
            max_fuel: 1.0,
            fuel_rate: 0.0,
            lethality: 0.5,
            current_quantity: 1,
            max_quantity: 1,
        });
        let victor = UnitTag::new("ship", "a", UnitKind::Ship);
        record_kill(&mut scenario, Some(&victor), "w1").unwrap();
        assert_eq!(scenario.get_side("a").unwrap().total_score, 10);
        assert_eq!(scenario.get_side("b").unwrap().casualties, 0);
    }

    #[test]
    fn test_unknown_unit_is_noop() {
        let mut scenario = scenario();
        assert!(record_kill(&mut scenario, None, "ghost").is_none());
        assert_eq!(scenario.get_side("a").unwrap().total_score, 0);
    }
}
