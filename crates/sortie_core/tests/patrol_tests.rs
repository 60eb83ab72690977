//! Patrol geometry and time-limit properties.

use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sortie_core::prelude::*;
use sortie_test_utils::fixtures::square_area;
use sortie_test_utils::strategies::{arb_patrol_area, arb_probe_points};

fn patrol(area: Vec<ReferencePoint>, time_limit: i64) -> PatrolMission {
    PatrolMission::new("p", "Patrol", "a", Vec::new(), area, time_limit).unwrap()
}

#[test]
fn boundary_points_are_outside() {
    let mission = patrol(square_area(0.0, 0.0, 10.0), 60);
    assert!(!mission.contains_coordinates(0.0, 5.0));
    assert!(!mission.contains_coordinates(10.0, 10.0));
    assert!(mission.contains_coordinates(0.1, 0.1));
}

#[test]
fn random_coordinates_are_reproducible_with_seed() {
    let mission = patrol(square_area(40.0, -75.0, 2.0), 60);
    let mut first = ChaCha8Rng::seed_from_u64(42);
    let mut second = ChaCha8Rng::seed_from_u64(42);
    for _ in 0..50 {
        let a = mission.generate_random_coordinates(&mut first);
        let b = mission.generate_random_coordinates(&mut second);
        assert_eq!(a, b);
        assert!((40.0..42.0).contains(&a.0));
        assert!((-75.0..-73.0).contains(&a.1));
    }
}

#[test]
fn patrol_loaded_from_json_has_working_geometry() {
    let json = r#"{
        "kind": "patrol",
        "id": "p1",
        "name": "CAP North",
        "sideId": "a",
        "assignedUnitIds": ["f1"],
        "assignedArea": [
            {"latitude": 0.0, "longitude": 0.0},
            {"latitude": 0.0, "longitude": 4.0},
            {"latitude": 4.0, "longitude": 4.0},
            {"latitude": 4.0, "longitude": 0.0}
        ],
        "timeLimit": 900
    }"#;
    let mission: Mission = serde_json::from_str(json).unwrap();
    let patrol = mission.as_patrol().unwrap();
    assert!(patrol.contains_coordinates(2.0, 2.0));
    assert!(!patrol.contains_coordinates(5.0, 2.0));
    assert_eq!(patrol.time_limit, 900);
}

#[test]
fn patrol_with_two_points_is_rejected_on_load() {
    let json = r#"{"kind":"patrol","id":"p","name":"P","sideId":"a",
        "assignedArea":[{"latitude":0.0,"longitude":0.0},{"latitude":1.0,"longitude":1.0}]}"#;
    assert!(serde_json::from_str::<Mission>(json).is_err());
}

proptest! {
    #[test]
    fn containment_is_stable_across_rebuilds(
        area in arb_patrol_area(),
        probes in arb_probe_points(32)
    ) {
        let mut mission = patrol(area, 60);
        let before: Vec<bool> = probes.iter().map(|&(lat, lon)| mission.contains_coordinates(lat, lon)).collect();
        mission.update_patrol_area_geometry();
        mission.update_patrol_area_geometry();
        let after: Vec<bool> = probes.iter().map(|&(lat, lon)| mission.contains_coordinates(lat, lon)).collect();
        prop_assert_eq!(before, after);
    }

    #[test]
    fn check_time_limit_matches_definition(
        current in -1_000_000i64..1_000_000,
        limit in 0i64..100_000,
        sim_limit in -1_000_000i64..1_100_000
    ) {
        let mission = patrol(square_area(0.0, 0.0, 1.0), limit);
        prop_assert_eq!(mission.check_time_limit(current, sim_limit), current + limit > sim_limit);
        prop_assert!(!mission.check_time_limit(sim_limit - limit, sim_limit));
    }
}
