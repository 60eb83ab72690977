//! Recorder and stepper integration tests.

use sortie_core::prelude::*;
use sortie_test_utils::fixtures::{engagement_scenario, two_side_scenario, SIDE_A};

#[test]
fn rotation_exports_exactly_once_when_crossing_ceiling() {
    let sink = MemorySink::new();
    let mut recorder = PlaybackRecorder::new(10)
        .with_sink(sink.clone())
        .with_byte_limit(100);
    recorder.start_recording(&two_side_scenario("Rotate"));

    let payload = "x".repeat(39);
    recorder.record_step(&payload, 10);
    recorder.record_step(&payload, 20);
    assert_eq!(recorder.auto_exports(), 0);
    recorder.record_step(&payload, 30);

    assert_eq!(recorder.auto_exports(), 1);
    assert!(recorder.recording().is_empty());
    assert_eq!(recorder.recording_start_time(), 30);
    let artifacts = sink.artifacts();
    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0].contents.lines().count(), 3);

    recorder.record_step(&payload, 40);
    assert_eq!(recorder.auto_exports(), 1);
    assert_eq!(recorder.recording().lines().count(), 1);
}

#[test]
fn should_record_twice_at_same_time_is_false_second_time() {
    let mut recorder = PlaybackRecorder::new(10);
    recorder.start_recording(&two_side_scenario("Interval"));
    let t = recorder.last_recording_time() + 10;
    assert!(recorder.should_record(t));
    assert!(!recorder.should_record(t));
}

#[test]
fn reset_forgets_scenario() {
    let mut recorder = PlaybackRecorder::new(10);
    recorder.start_recording(&two_side_scenario("Forget"));
    recorder.record_step("{}", 5);
    recorder.reset();
    assert_eq!(recorder.scenario_name(), "New Scenario");
    assert!(recorder.recording().is_empty());
    assert_eq!(recorder.last_recording_time(), 0);
}

#[test]
fn already_decided_scenario_records_first_and_last_only() {
    let mut scenario = two_side_scenario("Decided");
    scenario.current_time = scenario.end_time;
    let mut game = Game::new(scenario, ClockDriver::new(), PlaybackRecorder::new(10));
    game.start_recording();
    let summary = game.run();

    assert!(summary.already_over);
    assert!(summary.has_game_ended);
    assert_eq!(summary.steps, 0);
    let lines = game
        .recorder()
        .export_recourse_recording(game.scenario().current_time, None, summary.has_game_ended)
        .unwrap();
    assert_eq!(game.recorder().recording().lines().count(), 2);
    assert_eq!(lines.first, lines.last);
}

#[test]
fn engagement_runs_to_end_with_clock_driver() {
    let mut scenario = engagement_scenario("Engagement");
    scenario.time_compression = 60;
    let mut game = Game::new(scenario, ClockDriver::new(), PlaybackRecorder::new(600));
    game.start_recording();
    let summary = game.run();

    assert!(summary.has_game_ended);
    assert_eq!(game.state(), GameState::Ended);
    let side_a = game.scenario().get_side(SIDE_A).unwrap();
    // 59 periods on station, then the patrol succeeds at its end time and
    // side A has completed everything it was assigned.
    assert_eq!(summary.steps, 60);
    assert_eq!(side_a.missions_completed, 1);
    assert_eq!(side_a.missions_succeeded, 60);
    assert_eq!(side_a.total_score, 590);

    let recording = game.recorder().recording();
    let first = recording.lines().next().unwrap();
    let parsed = Scenario::from_json(first).unwrap();
    assert_eq!(parsed.name, "Engagement");
    assert!(!parsed.paused);
}
