//! Simulation stepper.
//!
//! [`Game`] owns one scenario, the world driver that moves it forward and the
//! recorder that snapshots it. A run goes `NotStarted -> Running` and ends in
//! `Ended` when a termination condition fires, or `Paused` when the step
//! bound is hit first. Every tick completes, calculator side effects
//! included, before the next begins.

use tracing::{debug, info, warn};

use crate::completion::are_all_missions_complete;
use crate::playback::PlaybackRecorder;
use crate::scenario::Scenario;

/// Default safety bound on ticks per run.
pub const DEFAULT_MAX_STEPS: u64 = 1_000_000;

/// Advances world state by one tick.
///
/// Implementations own movement, detection and combat. They report events
/// through the calculators in [`crate::scoring`], [`crate::casualties`],
/// [`crate::completion`] and [`crate::outcome`], and are responsible for
/// advancing `scenario.current_time`.
pub trait WorldDriver {
    /// Apply one tick to `scenario`.
    fn advance(&mut self, scenario: &mut Scenario);
}

/// Run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameState {
    /// Constructed, not yet run.
    #[default]
    NotStarted,
    /// Inside the step loop.
    Running,
    /// Suspended without a termination condition firing.
    Paused,
    /// A termination condition fired.
    Ended,
}

/// Lightweight view of the scenario after a tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Simulation time after the tick.
    pub current_time: i64,
    /// `(side id, total score)` in ledger order.
    pub side_scores: Vec<(String, i64)>,
}

/// Extra information about a tick.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StepInfo {
    /// Ticks taken so far, including this one.
    pub step: u64,
    /// Sides whose missions are all complete.
    pub winning_side_ids: Vec<String>,
}

/// Result of one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    /// Scenario view after the tick.
    pub observation: Observation,
    /// Score change of the first side during the tick.
    pub reward: i64,
    /// A side finished all its missions.
    pub terminated: bool,
    /// Simulation time reached the scenario end.
    pub truncated: bool,
    /// Extra information.
    pub info: StepInfo,
}

/// Summary of a full run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Whether a termination condition ended the run.
    pub has_game_ended: bool,
    /// Ticks taken.
    pub steps: u64,
    /// The scenario was decided before the first tick.
    pub already_over: bool,
}

/// One scenario run.
#[derive(Debug)]
pub struct Game<D: WorldDriver> {
    scenario: Scenario,
    driver: D,
    recorder: PlaybackRecorder,
    state: GameState,
    steps: u64,
    max_steps: u64,
}

impl<D: WorldDriver> Game<D> {
    /// Create a game around a loaded scenario.
    pub fn new(scenario: Scenario, driver: D, recorder: PlaybackRecorder) -> Self {
        Self {
            scenario,
            driver,
            recorder,
            state: GameState::NotStarted,
            steps: 0,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Override the tick bound.
    #[must_use]
    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Scenario under simulation.
    #[must_use]
    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// Mutable scenario access for setup between construction and run.
    pub fn scenario_mut(&mut self) -> &mut Scenario {
        &mut self.scenario
    }

    /// Attached recorder.
    #[must_use]
    pub fn recorder(&self) -> &PlaybackRecorder {
        &self.recorder
    }

    /// Mutable recorder access.
    pub fn recorder_mut(&mut self) -> &mut PlaybackRecorder {
        &mut self.recorder
    }

    /// Current run state.
    #[must_use]
    pub fn state(&self) -> GameState {
        self.state
    }

    /// Ticks taken.
    #[must_use]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Split into scenario and recorder.
    #[must_use]
    pub fn into_parts(self) -> (Scenario, PlaybackRecorder) {
        (self.scenario, self.recorder)
    }

    /// Attach the recorder to the scenario and clear its buffer.
    pub fn start_recording(&mut self) {
        self.recorder.start_recording(&self.scenario);
        self.scenario.recording = true;
    }

    /// Record a snapshot if recording is on and the interval elapsed, or
    /// unconditionally when `force` is set.
    pub fn record_step(&mut self, force: bool) {
        if !self.scenario.recording {
            return;
        }
        let now = self.scenario.current_time;
        if !force && !self.recorder.should_record(now) {
            return;
        }
        match self.scenario.to_snapshot_line() {
            Ok(line) => self.recorder.record_step(&line, now),
            Err(err) => warn!(%err, "Failed to serialize snapshot"),
        }
    }

    /// Sides whose missions are all complete.
    #[must_use]
    pub fn winning_side_ids(&self) -> Vec<String> {
        self.scenario
            .sides
            .iter()
            .filter(|side| are_all_missions_complete(side))
            .map(|side| side.id.clone())
            .collect()
    }

    /// Some side has completed every mission it was assigned.
    #[must_use]
    pub fn check_winning_conditions(&self) -> bool {
        self.scenario.sides.iter().any(are_all_missions_complete)
    }

    /// Simulation time has reached the scenario end.
    #[must_use]
    pub fn check_game_ended(&self) -> bool {
        self.scenario.current_time >= self.scenario.end_time
    }

    fn first_side_score(&self) -> i64 {
        self.scenario.sides.at(0).map_or(0, |side| side.total_score)
    }

    /// Advance one tick.
    pub fn step(&mut self) -> StepResult {
        let before = self.first_side_score();
        self.driver.advance(&mut self.scenario);
        self.steps += 1;
        self.record_step(false);

        let terminated = self.check_winning_conditions();
        let truncated = self.check_game_ended();
        let observation = Observation {
            current_time: self.scenario.current_time,
            side_scores: self
                .scenario
                .sides
                .iter()
                .map(|side| (side.id.clone(), side.total_score))
                .collect(),
        };
        StepResult {
            observation,
            reward: self.first_side_score() - before,
            terminated,
            truncated,
            info: StepInfo {
                step: self.steps,
                winning_side_ids: if terminated {
                    self.winning_side_ids()
                } else {
                    Vec::new()
                },
            },
        }
    }

    /// Run until a termination condition fires or the tick bound is hit.
    ///
    /// Records a forced first snapshot before checking termination and a
    /// forced last snapshot after the loop, so an already-decided scenario
    /// yields exactly two snapshots and no ticks.
    pub fn run(&mut self) -> RunSummary {
        info!(scenario = %self.scenario.name, "Game loop starts");
        self.state = GameState::Running;
        self.scenario.paused = false;
        self.record_step(true);

        let already_over = self.check_winning_conditions() || self.check_game_ended();
        let has_game_ended = if already_over {
            info!(scenario = %self.scenario.name, "Game was already over before starting loop");
            true
        } else {
            loop {
                let result = self.step();
                if result.terminated || result.truncated {
                    debug!(
                        terminated = result.terminated,
                        truncated = result.truncated,
                        step = self.steps,
                        "Game ended"
                    );
                    break true;
                }
                if self.steps >= self.max_steps {
                    warn!(
                        scenario = %self.scenario.name,
                        max_steps = self.max_steps,
                        "Step bound reached before the game ended"
                    );
                    break false;
                }
            }
        };

        self.record_step(true);
        self.scenario.paused = true;
        self.state = if has_game_ended {
            GameState::Ended
        } else {
            GameState::Paused
        };
        info!(scenario = %self.scenario.name, steps = self.steps, has_game_ended, "Game loop ends");
        RunSummary {
            has_game_ended,
            steps: self.steps,
            already_over,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::side::Side;

    struct Tick(i64);

    impl WorldDriver for Tick {
        fn advance(&mut self, scenario: &mut Scenario) {
            scenario.current_time += self.0;
        }
    }

    fn scenario(duration: i64) -> Scenario {
        let mut scenario = Scenario::new("s", "Drill", 0, duration);
        scenario.sides.insert(Side::new("a", "Alpha")).unwrap();
        scenario.sides.insert(Side::new("b", "Bravo")).unwrap();
        scenario
    }

    #[test]
    fn test_run_until_end_time() {
        let mut game = Game::new(scenario(100), Tick(10), PlaybackRecorder::new(10));
        game.start_recording();
        let summary = game.run();
        assert!(summary.has_game_ended);
        assert!(!summary.already_over);
        assert_eq!(summary.steps, 10);
        assert_eq!(game.state(), GameState::Ended);
        assert!(game.scenario().paused);
        // first + one per tick + forced last
        assert_eq!(game.recorder().recording().lines().count(), 12);
    }

    #[test]
    fn test_already_over_records_two_snapshots() {
        let mut game = Game::new(scenario(0), Tick(10), PlaybackRecorder::new(10));
        game.start_recording();
        let summary = game.run();
        assert!(summary.already_over);
        assert_eq!(summary.steps, 0);
        assert_eq!(game.recorder().recording().lines().count(), 2);
    }

    #[test]
    fn test_step_bound_pauses_run() {
        let mut game =
            Game::new(scenario(1000), Tick(0), PlaybackRecorder::new(10)).with_max_steps(5);
        let summary = game.run();
        assert!(!summary.has_game_ended);
        assert_eq!(summary.steps, 5);
        assert_eq!(game.state(), GameState::Paused);
        assert!(game.recorder().recording().is_empty());
    }

    #[test]
    fn test_winning_condition_terminates() {
        let mut s = scenario(1000);
        let side = s.get_side_mut("b").unwrap();
        side.missions_assigned = 1;
        side.missions_completed = 1;
        side.missions_succeeded = 1;
        let game = Game::new(s, Tick(1), PlaybackRecorder::default());
        assert!(game.check_winning_conditions());
        assert_eq!(game.winning_side_ids(), vec!["b".to_string()]);
    }

    #[test]
    fn test_step_reports_reward() {
        struct Scorer;
        impl WorldDriver for Scorer {
            fn advance(&mut self, scenario: &mut Scenario) {
                scenario.current_time += 1;
                scenario.get_side_mut("a").unwrap().total_score += 7;
            }
        }
        let mut game = Game::new(scenario(10), Scorer, PlaybackRecorder::default());
        let result = game.step();
        assert_eq!(result.reward, 7);
        assert_eq!(result.observation.current_time, 1);
        assert!(!result.terminated);
        assert!(!result.truncated);
    }
}
