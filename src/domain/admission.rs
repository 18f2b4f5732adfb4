//! Admission control for new positions
//!
//! Enforces the overlap and capacity rules: one position per pair, no
//! instrument held long and short at the same time, at most two
//! concurrent positions anchored on the same instrument in the same
//! direction, and a hard cap on the open-position count.

use thiserror::Error;

use super::position::Position;

/// Same-direction reuse cap per instrument.
pub const MAX_POSITIONS_PER_ASSET: usize = 2;

/// Why an entry was refused. The display strings are the short rejection
/// reasons surfaced by the command interface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionReject {
    #[error("duplicate: pair {0} already has an open position")]
    Duplicate(String),

    #[error("long_conflict: {0} is already the short leg of an open position")]
    LongConflict(String),

    #[error("short_conflict: {0} is already the long leg of an open position")]
    ShortConflict(String),

    #[error("max_exposure: {0} already anchors {1} open positions")]
    MaxExposure(String, usize),

    #[error("capacity: {0}/{1} position slots in use")]
    CapacityFull(usize, usize),
}

/// Check whether a candidate entry is admissible against the open set.
///
/// `long_asset`/`short_asset` are the legs the new position would hold.
pub fn check_entry(
    pair_key: &str,
    long_asset: &str,
    short_asset: &str,
    open: &[Position],
    capacity: usize,
) -> Result<(), AdmissionReject> {
    if open.iter().any(|p| p.pair.key() == pair_key) {
        return Err(AdmissionReject::Duplicate(pair_key.to_string()));
    }

    for p in open {
        // an instrument may never be held in both directions at once
        if p.short_asset == long_asset {
            return Err(AdmissionReject::LongConflict(long_asset.to_string()));
        }
        if p.long_asset == short_asset {
            return Err(AdmissionReject::ShortConflict(short_asset.to_string()));
        }
    }

    let long_uses = open.iter().filter(|p| p.long_asset == long_asset).count();
    if long_uses >= MAX_POSITIONS_PER_ASSET {
        return Err(AdmissionReject::MaxExposure(long_asset.to_string(), long_uses));
    }
    let short_uses = open.iter().filter(|p| p.short_asset == short_asset).count();
    if short_uses >= MAX_POSITIONS_PER_ASSET {
        return Err(AdmissionReject::MaxExposure(short_asset.to_string(), short_uses));
    }

    if open.len() >= capacity {
        return Err(AdmissionReject::CapacityFull(open.len(), capacity));
    }

    Ok(())
}
