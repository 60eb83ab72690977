//! Casualty tracker.

use tracing::{debug, info};

use crate::side::SideLedger;
use crate::units::UnitTag;

/// Count one lost unit against its side.
pub fn increment_casualty(ledger: &mut SideLedger, lost: &UnitTag) {
    let Some(side) = ledger.get_mut(&lost.side_id) else {
        debug!(unit = %lost.id, side_id = %lost.side_id, "Casualty for unknown side ignored");
        return;
    };
    side.casualties += 1;
    info!(side = %side.name, unit = %lost.id, kind = ?lost.kind, casualties = side.casualties, "Unit lost");
}
