//! Proptest strategies for ledger and mission properties.

use proptest::prelude::*;
use sortie_core::prelude::*;

/// One call into the completion tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionEvent {
    /// Strike ended successfully.
    StrikeSuccess,
    /// Strike failed.
    StrikeFailure,
    /// Patrol ended successfully.
    PatrolSuccess,
    /// Patrol failed.
    PatrolFailure,
    /// Rescue ended successfully.
    RescueSuccess,
    /// Rescue failed.
    RescueFailure,
    /// Qualifying patrol period.
    PatrolPeriod,
}

impl CompletionEvent {
    /// Whether the event is a terminal mission result.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::PatrolPeriod)
    }
}

/// Any completion event.
pub fn arb_completion_event() -> impl Strategy<Value = CompletionEvent> {
    prop_oneof![
        Just(CompletionEvent::StrikeSuccess),
        Just(CompletionEvent::StrikeFailure),
        Just(CompletionEvent::PatrolSuccess),
        Just(CompletionEvent::PatrolFailure),
        Just(CompletionEvent::RescueSuccess),
        Just(CompletionEvent::RescueFailure),
        Just(CompletionEvent::PatrolPeriod),
    ]
}

/// Sequences of completion events.
pub fn arb_completion_events(max_len: usize) -> impl Strategy<Value = Vec<CompletionEvent>> {
    proptest::collection::vec(arb_completion_event(), 0..max_len)
}

/// Any unit kind.
pub fn arb_unit_kind() -> impl Strategy<Value = UnitKind> {
    prop_oneof![
        Just(UnitKind::Aircraft),
        Just(UnitKind::Ship),
        Just(UnitKind::Facility),
        Just(UnitKind::Airbase),
        Just(UnitKind::Weapon),
    ]
}

/// Side with arbitrary mission counters.
pub fn arb_side_counters() -> impl Strategy<Value = Side> {
    (0u32..10_000, 0u32..10_000, 0u32..10_000).prop_map(|(completed, succeeded, assigned)| {
        let mut side = Side::new("p", "Prop");
        side.missions_completed = completed;
        side.missions_succeeded = succeeded;
        side.missions_assigned = assigned;
        side
    })
}

/// Latitude in degrees, away from the poles.
pub fn arb_latitude() -> impl Strategy<Value = f64> {
    -80.0f64..80.0
}

/// Longitude in degrees.
pub fn arb_longitude() -> impl Strategy<Value = f64> {
    -179.0f64..179.0
}

/// Patrol area of 3 to 8 arbitrary points.
pub fn arb_patrol_area() -> impl Strategy<Value = Vec<ReferencePoint>> {
    proptest::collection::vec(
        (arb_latitude(), arb_longitude()).prop_map(|(lat, lon)| ReferencePoint::at(lat, lon)),
        3..8,
    )
}

/// Probe coordinates for containment checks.
pub fn arb_probe_points(max_len: usize) -> impl Strategy<Value = Vec<(f64, f64)>> {
    proptest::collection::vec((arb_latitude(), arb_longitude()), 1..max_len)
}
