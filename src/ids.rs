//! Identifier spaces for chain graph nodes, pins and links.
//!
//! Each kind lives in its own disjoint numeric range so that a bare `u32`
//! handed through the editor's opaque id space can be classified again by
//! range alone.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Width of every id range.
pub const ID_RANGE_SIZE: u32 = 0x0010_0000;

pub const NODE_ID_BASE: u32 = 0x0010_0000;
pub const PIN_ID_BASE: u32 = NODE_ID_BASE + ID_RANGE_SIZE;
pub const LINK_ID_BASE: u32 = PIN_ID_BASE + ID_RANGE_SIZE;

macro_rules! graph_id {
    ($name:ident, $base:expr, $tag:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u32);

        impl $name {
            pub const BASE: u32 = $base;

            /// Reinterpret a raw value, rejecting anything outside this kind's range.
            pub fn from_raw(raw: u32) -> Option<Self> {
                (Self::BASE..Self::BASE + ID_RANGE_SIZE)
                    .contains(&raw)
                    .then_some(Self(raw))
            }

            pub fn raw(self) -> u32 {
                self.0
            }

            /// The `n`-th id of this range; only for small fixed offsets.
            pub(crate) const fn nth(n: u32) -> Self {
                Self($base + n)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", $tag, self.0 - Self::BASE)
            }
        }
    };
}

graph_id!(NodeId, NODE_ID_BASE, "node");
graph_id!(PinId, PIN_ID_BASE, "pin");
graph_id!(LinkId, LINK_ID_BASE, "link");

/// A raw id classified by the range it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnyId {
    Node(NodeId),
    Pin(PinId),
    Link(LinkId),
}

pub fn classify_raw(raw: u32) -> Option<AnyId> {
    NodeId::from_raw(raw)
        .map(AnyId::Node)
        .or_else(|| PinId::from_raw(raw).map(AnyId::Pin))
        .or_else(|| LinkId::from_raw(raw).map(AnyId::Link))
}

/// Monotonic counter over one id range. Values are never reused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdAllocator {
    base: u32,
    next: u32,
}

impl IdAllocator {
    pub fn new(base: u32) -> Self {
        Self { base, next: base }
    }

    /// Returns `None` once the range is exhausted.
    pub fn allocate(&mut self) -> Option<u32> {
        if self.next >= self.base + ID_RANGE_SIZE {
            return None;
        }
        let id = self.next;
        self.next += 1;
        Some(id)
    }

    /// Make sure future allocations land after `raw` (used when restoring a document).
    pub fn reserve_through(&mut self, raw: u32) {
        if raw >= self.next {
            self.next = raw.saturating_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_are_disjoint() {
        assert!(NodeId::from_raw(PIN_ID_BASE).is_none());
        assert!(PinId::from_raw(NODE_ID_BASE).is_none());
        assert!(LinkId::from_raw(PIN_ID_BASE + ID_RANGE_SIZE - 1).is_none());
        assert_eq!(classify_raw(0), None);
        assert_eq!(classify_raw(LINK_ID_BASE + ID_RANGE_SIZE), None);
    }

    #[test]
    fn classify_recovers_kind() {
        let mut pins = IdAllocator::new(PIN_ID_BASE);
        let raw = pins.allocate().unwrap();
        match classify_raw(raw) {
            Some(AnyId::Pin(p)) => assert_eq!(p.raw(), raw),
            other => panic!("expected pin, got {other:?}"),
        }
    }

    #[test]
    fn allocator_stops_at_range_end() {
        let mut alloc = IdAllocator::new(LINK_ID_BASE);
        alloc.reserve_through(LINK_ID_BASE + ID_RANGE_SIZE - 2);
        assert_eq!(alloc.allocate(), Some(LINK_ID_BASE + ID_RANGE_SIZE - 1));
        assert_eq!(alloc.allocate(), None);
    }
}
