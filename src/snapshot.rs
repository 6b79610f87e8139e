//! Pre-mutation snapshot log for cached network state.
//!
//! Every mutating session operation records a timestamped deep copy of the
//! cache slot it is about to overwrite. The log is append-only and keyed by
//! a typed [`CaptureTarget`], so a lookup can never return entries recorded
//! for a different slot.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::api::{PeeringConnection, RouteTable, Subnet};
use crate::session::PeeringState;

/// Which half of the peering cache a capture addresses.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum PeeringSide {
    /// Connections where this VPC is the accepter.
    Accepted,
    /// Connections where this VPC is the requester.
    Requested,
}

impl PeeringSide {
    /// Stable lowercase name, matching the cache field it addresses.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Requested => "requested",
        }
    }
}

impl fmt::Display for PeeringSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cache slot addressed by a snapshot capture.
///
/// Typed keys instead of stringly attribute paths: a path that does not
/// exist on the cache is unrepresentable here.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum CaptureTarget {
    /// The whole route-table map.
    RouteTables,
    /// The whole subnet map.
    Subnets,
    /// The two-sided peering structure.
    Peering,
    /// One side of the peering structure.
    PeeringSlot(PeeringSide),
}

impl CaptureTarget {
    /// Stable name used in error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RouteTables => "route_tables",
            Self::Subnets => "subnets",
            Self::Peering => "peering_connections",
            Self::PeeringSlot(PeeringSide::Accepted) => "peering_connections.accepted",
            Self::PeeringSlot(PeeringSide::Requested) => "peering_connections.requested",
        }
    }
}

impl fmt::Display for CaptureTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deep copy of one cache slot at capture time.
///
/// A variant per resource kind keeps captures type-safe while staying
/// polymorphic over what gets captured.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SnapshotValue {
    /// Capture of the route-table map.
    RouteTables(BTreeMap<String, RouteTable>),
    /// Capture of the subnet map.
    Subnets(BTreeMap<String, Subnet>),
    /// Capture of the full peering structure.
    Peering(PeeringState),
    /// Capture of one peering side.
    PeeringSlot(BTreeMap<String, PeeringConnection>),
}

impl SnapshotValue {
    /// Short name of the variant, used in mismatch errors.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::RouteTables(_) => "route_tables",
            Self::Subnets(_) => "subnets",
            Self::Peering(_) => "peering_connections",
            Self::PeeringSlot(_) => "peering_slot",
        }
    }

    const fn matches(&self, target: CaptureTarget) -> bool {
        matches!(
            (self, target),
            (Self::RouteTables(_), CaptureTarget::RouteTables)
                | (Self::Subnets(_), CaptureTarget::Subnets)
                | (Self::Peering(_), CaptureTarget::Peering)
                | (Self::PeeringSlot(_), CaptureTarget::PeeringSlot(_))
        )
    }
}

/// One timestamped capture. Immutable after creation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SnapshotEntry {
    captured_at: DateTime<Utc>,
    data: SnapshotValue,
}

impl SnapshotEntry {
    /// Wall-clock time of the capture.
    #[must_use]
    pub const fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// The captured value.
    #[must_use]
    pub const fn data(&self) -> &SnapshotValue {
        &self.data
    }
}

/// Errors raised by the snapshot log.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SnapshotError {
    /// The recorded value's shape does not belong to the capture target.
    #[error("snapshot value {value_kind} does not match capture target {target}")]
    TargetMismatch {
        /// Target the caller addressed.
        target: &'static str,
        /// Variant of the value actually supplied.
        value_kind: &'static str,
    },
}

/// Append-only, timestamped history of cache slots.
#[derive(Debug, Default)]
pub struct SnapshotLog {
    entries: BTreeMap<CaptureTarget, Vec<SnapshotEntry>>,
}

impl SnapshotLog {
    /// Creates an empty log.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Appends a capture of `value` under `target`, creating the sequence on
    /// first use. The value must already be an owned deep copy of the cache
    /// slot; the log never reads the live cache.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::TargetMismatch`] when the value's variant
    /// does not belong to the addressed target.
    pub fn record(
        &mut self,
        target: CaptureTarget,
        value: SnapshotValue,
    ) -> Result<(), SnapshotError> {
        if !value.matches(target) {
            return Err(SnapshotError::TargetMismatch {
                target: target.as_str(),
                value_kind: value.kind(),
            });
        }
        self.entries.entry(target).or_default().push(SnapshotEntry {
            captured_at: Utc::now(),
            data: value,
        });
        Ok(())
    }

    /// Ordered history for a target; empty when nothing has been recorded.
    #[must_use]
    pub fn history(&self, target: CaptureTarget) -> &[SnapshotEntry] {
        self.entries.get(&target).map_or(&[], Vec::as_slice)
    }

    /// Number of captures recorded for a target.
    #[must_use]
    pub fn count(&self, target: CaptureTarget) -> usize {
        self.history(target).len()
    }

    /// Whether the log holds no captures at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Vec::is_empty)
    }
}
