//! # Room-State Coordinator
//!
//! Maps reservation and maintenance events to room status changes, and
//! guards direct status requests against an in-house guest.
//!
//! ## Event Table
//! ```text
//! ┌──────────────────────────────┬─────────────────┬─────────────────────────┐
//! │ Event                        │ From            │ To                      │
//! ├──────────────────────────────┼─────────────────┼─────────────────────────┤
//! │ GuestCheckedIn               │ any             │ OCCUPIED                │
//! │ GuestCheckedOut              │ any             │ CLEANING                │
//! │ StayCancelled (was in-house) │ OCCUPIED        │ CLEANING                │
//! │ Reported EMERGENCY           │ any (override)  │ OUT_OF_SERVICE          │
//! │ Reported URGENT              │ any (override)  │ MAINTENANCE             │
//! │ Reported HIGH                │ AVAILABLE       │ MAINTENANCE             │
//! │ Maintenance started          │ ≠ OUT_OF_SERVICE│ MAINTENANCE             │
//! │ Maintenance completed        │ any             │ CLEANING                │
//! │ Maintenance cancelled        │ MAINTENANCE     │ AVAILABLE               │
//! └──────────────────────────────┴─────────────────┴─────────────────────────┘
//! ```
//!
//! Direct requests (front desk sets a room to CLEANING, etc.) go through
//! [`guard_manual_change`]: an OCCUPIED room with a CHECKED_IN reservation
//! cannot be moved to another status by hand.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::RoomStatus;

// =============================================================================
// Maintenance
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenancePriority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceKind {
    Preventive,
    Corrective,
    Emergency,
}

/// Lifecycle events of a maintenance ticket that affect its room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MaintenanceEvent {
    Reported {
        priority: MaintenancePriority,
        kind: MaintenanceKind,
    },
    Started,
    Completed,
    Cancelled,
}

// =============================================================================
// Events
// =============================================================================

/// Anything that may move a room's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomEvent {
    GuestCheckedIn,
    GuestCheckedOut,
    /// A reservation was cancelled; `was_checked_in` tells whether the
    /// guest was in the room at the time.
    StayCancelled { was_checked_in: bool },
    Maintenance(MaintenanceEvent),
}

/// Returns the room's new status, or `None` if the event leaves it unchanged.
///
/// ## Example
/// ```rust
/// use hotel_core::room_state::{next_status, RoomEvent};
/// use hotel_core::types::RoomStatus;
///
/// assert_eq!(
///     next_status(RoomStatus::Occupied, RoomEvent::GuestCheckedOut),
///     Some(RoomStatus::Cleaning)
/// );
/// ```
pub fn next_status(current: RoomStatus, event: RoomEvent) -> Option<RoomStatus> {
    let next = match event {
        RoomEvent::GuestCheckedIn => Some(RoomStatus::Occupied),
        RoomEvent::GuestCheckedOut => Some(RoomStatus::Cleaning),
        RoomEvent::StayCancelled { was_checked_in } => {
            (was_checked_in && current == RoomStatus::Occupied).then_some(RoomStatus::Cleaning)
        }
        RoomEvent::Maintenance(event) => maintenance_status(current, event),
    };

    next.filter(|status| *status != current)
}

fn maintenance_status(current: RoomStatus, event: MaintenanceEvent) -> Option<RoomStatus> {
    match event {
        MaintenanceEvent::Reported { kind, priority } => {
            if kind == MaintenanceKind::Emergency {
                Some(RoomStatus::OutOfService)
            } else if priority == MaintenancePriority::Urgent {
                Some(RoomStatus::Maintenance)
            } else if priority == MaintenancePriority::High && current == RoomStatus::Available {
                Some(RoomStatus::Maintenance)
            } else {
                None
            }
        }
        MaintenanceEvent::Started => {
            (current != RoomStatus::OutOfService).then_some(RoomStatus::Maintenance)
        }
        MaintenanceEvent::Completed => Some(RoomStatus::Cleaning),
        MaintenanceEvent::Cancelled => {
            (current == RoomStatus::Maintenance).then_some(RoomStatus::Available)
        }
    }
}

/// Guards a direct status request.
///
/// ## Errors
/// - `RoomHasActiveStay` when the room is OCCUPIED by a CHECKED_IN
///   reservation and `requested` is anything else
pub fn guard_manual_change(
    room_id: i64,
    current: RoomStatus,
    requested: RoomStatus,
    has_checked_in_stay: bool,
) -> CoreResult<()> {
    if current == RoomStatus::Occupied && requested != RoomStatus::Occupied && has_checked_in_stay {
        return Err(CoreError::RoomHasActiveStay {
            room_id,
            from: current,
            to: requested,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn reported(priority: MaintenancePriority, kind: MaintenanceKind) -> RoomEvent {
        RoomEvent::Maintenance(MaintenanceEvent::Reported { priority, kind })
    }

    #[test]
    fn test_stay_events() {
        assert_eq!(
            next_status(RoomStatus::Available, RoomEvent::GuestCheckedIn),
            Some(RoomStatus::Occupied)
        );
        assert_eq!(
            next_status(RoomStatus::Occupied, RoomEvent::GuestCheckedOut),
            Some(RoomStatus::Cleaning)
        );
    }

    #[test]
    fn test_cancel_releases_only_an_occupied_in_house_room() {
        assert_eq!(
            next_status(
                RoomStatus::Occupied,
                RoomEvent::StayCancelled {
                    was_checked_in: true
                }
            ),
            Some(RoomStatus::Cleaning)
        );
        assert_eq!(
            next_status(
                RoomStatus::Occupied,
                RoomEvent::StayCancelled {
                    was_checked_in: false
                }
            ),
            None
        );
        assert_eq!(
            next_status(
                RoomStatus::Available,
                RoomEvent::StayCancelled {
                    was_checked_in: false
                }
            ),
            None
        );
    }

    #[test]
    fn test_emergency_overrides_any_status() {
        for current in [RoomStatus::Available, RoomStatus::Occupied, RoomStatus::Cleaning] {
            assert_eq!(
                next_status(current, reported(MaintenancePriority::Low, MaintenanceKind::Emergency)),
                Some(RoomStatus::OutOfService)
            );
        }
    }

    #[test]
    fn test_urgent_overrides_occupied() {
        assert_eq!(
            next_status(
                RoomStatus::Occupied,
                reported(MaintenancePriority::Urgent, MaintenanceKind::Corrective)
            ),
            Some(RoomStatus::Maintenance)
        );
    }

    #[test]
    fn test_high_priority_only_takes_available_rooms() {
        let event = reported(MaintenancePriority::High, MaintenanceKind::Corrective);
        assert_eq!(
            next_status(RoomStatus::Available, event),
            Some(RoomStatus::Maintenance)
        );
        assert_eq!(next_status(RoomStatus::Occupied, event), None);
    }

    #[test]
    fn test_low_priority_leaves_room_alone() {
        let event = reported(MaintenancePriority::Low, MaintenanceKind::Preventive);
        assert_eq!(next_status(RoomStatus::Available, event), None);
    }

    #[test]
    fn test_maintenance_lifecycle() {
        let started = RoomEvent::Maintenance(MaintenanceEvent::Started);
        assert_eq!(next_status(RoomStatus::Available, started), Some(RoomStatus::Maintenance));
        assert_eq!(next_status(RoomStatus::OutOfService, started), None);

        let completed = RoomEvent::Maintenance(MaintenanceEvent::Completed);
        assert_eq!(next_status(RoomStatus::Maintenance, completed), Some(RoomStatus::Cleaning));

        let cancelled = RoomEvent::Maintenance(MaintenanceEvent::Cancelled);
        assert_eq!(next_status(RoomStatus::Maintenance, cancelled), Some(RoomStatus::Available));
        assert_eq!(next_status(RoomStatus::OutOfService, cancelled), None);
    }

    #[test]
    fn test_manual_change_guard() {
        assert!(matches!(
            guard_manual_change(1, RoomStatus::Occupied, RoomStatus::Available, true),
            Err(CoreError::RoomHasActiveStay { .. })
        ));
        assert!(guard_manual_change(1, RoomStatus::Occupied, RoomStatus::Available, false).is_ok());
        assert!(guard_manual_change(1, RoomStatus::Cleaning, RoomStatus::Available, true).is_ok());
    }

    #[test]
    fn test_event_serialization() {
        let event = MaintenanceEvent::Reported {
            priority: MaintenancePriority::Urgent,
            kind: MaintenanceKind::Emergency,
        };
        let json = serde_json::to_value(event).unwrap();
        assert_eq!(json["event"], "reported");
        assert_eq!(json["priority"], "urgent");
    }
}
