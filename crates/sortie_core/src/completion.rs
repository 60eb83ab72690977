//! Mission completion tracker.
//!
//! Terminal results move `missions_completed` and exactly one of
//! `missions_succeeded`/`missions_failed` together. Patrol *periods* are the
//! exception: a patrol can accrue several period successes before it ends, so
//! those bump `missions_succeeded` alone. After `n` periods and one terminal
//! result the ledger therefore reads `succeeded = n (+1)`, `completed = 1`.

use tracing::{debug, info};

use crate::mission::{Mission, MissionOutcome};
use crate::side::{Side, SideLedger};

fn complete(ledger: &mut SideLedger, mission: &Mission, succeeded: bool) {
    let Some(side) = ledger.get_mut(mission.side_id()) else {
        debug!(mission = %mission.id(), side_id = %mission.side_id(), "Completion for unknown side ignored");
        return;
    };
    side.record_completion(succeeded);
    info!(
        side = %side.name,
        mission = %mission.name(),
        kind = ?mission.kind(),
        succeeded,
        completed = side.missions_completed,
        "Mission completed"
    );
}

/// Strike objective achieved.
pub fn increment_strike_mission_success(ledger: &mut SideLedger, mission: &Mission) {
    complete(ledger, mission, true);
}

/// Strike objective lost.
pub fn increment_strike_mission_failure(ledger: &mut SideLedger, mission: &Mission) {
    complete(ledger, mission, false);
}

/// Patrol ended successfully.
pub fn increment_patrol_mission_success(ledger: &mut SideLedger, mission: &Mission) {
    complete(ledger, mission, true);
}

/// Patrol ended in failure.
pub fn increment_patrol_mission_failure(ledger: &mut SideLedger, mission: &Mission) {
    complete(ledger, mission, false);
}

/// Rescue objective achieved.
pub fn increment_rescue_mission_success(ledger: &mut SideLedger, mission: &Mission) {
    complete(ledger, mission, true);
}

/// Rescue objective lost.
pub fn increment_rescue_mission_failure(ledger: &mut SideLedger, mission: &Mission) {
    complete(ledger, mission, false);
}

/// One qualifying patrol period. Does not touch `missions_completed`.
pub fn increment_patrol_period_success(ledger: &mut SideLedger, mission: &Mission) {
    match ledger.get_mut(mission.side_id()) {
        Some(side) => {
            side.missions_succeeded += 1;
            debug!(side = %side.name, mission = %mission.name(), succeeded = side.missions_succeeded, "Patrol period");
        }
        None => debug!(mission = %mission.id(), "Patrol period for unknown side ignored"),
    }
}

/// Record a terminal result, dispatching on the mission kind.
pub fn record_mission_outcome(ledger: &mut SideLedger, mission: &Mission, outcome: MissionOutcome) {
    use MissionOutcome::{Failed, Succeeded};
    match (mission, outcome) {
        (Mission::Strike(_), Succeeded) => increment_strike_mission_success(ledger, mission),
        (Mission::Strike(_), Failed) => increment_strike_mission_failure(ledger, mission),
        (Mission::Patrol(_), Succeeded) => increment_patrol_mission_success(ledger, mission),
        (Mission::Patrol(_), Failed) => increment_patrol_mission_failure(ledger, mission),
        (Mission::Rescue(_), Succeeded) => increment_rescue_mission_success(ledger, mission),
        (Mission::Rescue(_), Failed) => increment_rescue_mission_failure(ledger, mission),
    }
}

/// `missions_succeeded / missions_completed`, or `0.0` with nothing completed.
///
/// Patrol periods can push this above `1.0`.
#[must_use]
pub fn calculate_side_mission_success_rate(side: &Side) -> f64 {
    if side.missions_completed == 0 {
        return 0.0;
    }
    f64::from(side.missions_succeeded) / f64::from(side.missions_completed)
}

/// Strict check: every assigned mission is done and at least one was.
#[must_use]
pub fn are_all_missions_complete(side: &Side) -> bool {
    side.missions_completed > 0 && side.missions_completed == side.missions_assigned
}

/// Lenient check by side id: a side with nothing assigned counts as complete.
/// Unknown sides are never complete.
#[must_use]
pub fn are_all_missions_complete_in_scenario(ledger: &SideLedger, side_id: &str) -> bool {
    ledger
        .get(side_id)
        .is_some_and(|side| side.missions_completed == side.missions_assigned)
}
