//! Resource kinds, per-kind quantity vectors, and the shared pool.
//!
//! The kind set is closed and tiny, so quantities live in fixed-size
//! `[u32; ResourceKind::COUNT]` arrays indexed by kind rather than maps.
//! Snapshots are `Copy` and iteration order is always kind order.

use serde::{Deserialize, Serialize};

/// A kind of system resource a process can demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ResourceKind {
    Cpu = 0,
    Memory = 1,
    Disk = 2,
    Printer = 3,
}

impl ResourceKind {
    /// Number of resource kinds.
    pub const COUNT: usize = 4;

    /// All kinds in index order.
    pub const ALL: [ResourceKind; Self::COUNT] =
        [Self::Cpu, Self::Memory, Self::Disk, Self::Printer];

    /// Position of this kind in a [`ResourceVec`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Cpu => "CPU",
            Self::Memory => "Memory",
            Self::Disk => "Disk",
            Self::Printer => "Printer",
        }
    }

    pub fn from_u8(val: u8) -> Option<Self> {
        match val {
            0 => Some(Self::Cpu),
            1 => Some(Self::Memory),
            2 => Some(Self::Disk),
            3 => Some(Self::Printer),
            _ => None,
        }
    }
}

/// Units per resource kind, indexed by [`ResourceKind`].
///
/// Serializes as a plain array in kind order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceVec([u32; ResourceKind::COUNT]);

impl ResourceVec {
    /// All-zero vector.
    pub const ZERO: ResourceVec = ResourceVec([0; ResourceKind::COUNT]);

    /// Build from explicit (kind, units) pairs; unlisted kinds are zero.
    pub fn of(pairs: &[(ResourceKind, u32)]) -> Self {
        let mut vec = Self::ZERO;
        for &(kind, units) in pairs {
            vec.0[kind.index()] += units;
        }
        vec
    }

    pub fn get(&self, kind: ResourceKind) -> u32 {
        self.0[kind.index()]
    }

    pub fn set(&mut self, kind: ResourceKind, units: u32) {
        self.0[kind.index()] = units;
    }

    pub fn add(&mut self, kind: ResourceKind, units: u32) {
        self.0[kind.index()] += units;
    }

    /// Whether every entry is zero.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&u| u == 0)
    }

    /// Whether `self[k] >= other[k]` for every kind.
    pub fn covers(&self, other: &ResourceVec) -> bool {
        ResourceKind::ALL
            .iter()
            .all(|&k| self.get(k) >= other.get(k))
    }

    /// Per-kind difference, saturating at zero.
    pub fn saturating_sub(&self, other: &ResourceVec) -> ResourceVec {
        let mut out = Self::ZERO;
        for kind in ResourceKind::ALL {
            out.set(kind, self.get(kind).saturating_sub(other.get(kind)));
        }
        out
    }

    /// Entries with nonzero units, in kind order.
    pub fn nonzero(&self) -> impl Iterator<Item = (ResourceKind, u32)> + '_ {
        ResourceKind::ALL
            .into_iter()
            .filter_map(move |k| match self.get(k) {
                0 => None,
                units => Some((k, units)),
            })
    }

    /// Count of kinds with nonzero units.
    pub fn nonzero_kinds(&self) -> u32 {
        self.0.iter().filter(|&&u| u > 0).count() as u32
    }
}

impl From<[u32; ResourceKind::COUNT]> for ResourceVec {
    fn from(units: [u32; ResourceKind::COUNT]) -> Self {
        ResourceVec(units)
    }
}

/// Shared pool of resource units for one level.
///
/// `total` is fixed for the pool's lifetime; `available` moves between
/// 0 and `total` as units are reserved and released.
#[derive(Debug, Clone)]
pub struct ResourcePool {
    total: ResourceVec,
    available: ResourceVec,
}

impl ResourcePool {
    /// Create a pool with every kind fully available.
    pub fn new(total: ResourceVec) -> Self {
        Self {
            total,
            available: total,
        }
    }

    pub fn total(&self, kind: ResourceKind) -> u32 {
        self.total.get(kind)
    }

    pub fn available(&self, kind: ResourceKind) -> u32 {
        self.available.get(kind)
    }

    /// Whether a kind has no free units left.
    pub fn is_exhausted(&self, kind: ResourceKind) -> bool {
        self.available.get(kind) == 0
    }

    /// Reserve `units` of `kind`, all or nothing.
    ///
    /// Returns false and changes nothing when fewer than `units` are free.
    pub fn try_reserve(&mut self, kind: ResourceKind, units: u32) -> bool {
        if units > self.available.get(kind) {
            return false;
        }
        self.available.set(kind, self.available.get(kind) - units);
        true
    }

    /// Return `units` of `kind` to the pool.
    ///
    /// Panics when the release would push `available` past `total`; that
    /// can only mean allocation bookkeeping upstream has broken.
    pub fn release(&mut self, kind: ResourceKind, units: u32) {
        let restored = self.available.get(kind) + units;
        assert!(
            restored <= self.total.get(kind),
            "release of {} {} units exceeds total {}",
            units,
            kind.name(),
            self.total.get(kind),
        );
        self.available.set(kind, restored);
    }

    /// Owned copy of current totals and availability.
    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            total: self.total,
            available: self.available,
        }
    }
}

/// Immutable view of pool state for reports and rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub total: ResourceVec,
    pub available: ResourceVec,
}
