//! Marshaling validated features into guest memory.
//!
//! A feature becomes two guest allocations: every ring's values interleaved
//! into one `f32` point buffer, and a `u32` ring index table marking where
//! each ring starts. The four resulting numbers are exactly what the guest's
//! plot entry expects.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use histomap_core::{RingIndexTable, ValidatedFeature};

use crate::guest::{GuestError, GuestMemory, ELEMENT_SIZE};
use crate::memory::ProtocolViolation;

/// Offsets and element counts of one marshaled feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarshaledFeature {
    pub points_offset: u32,
    /// Number of `f32` values (not pairs).
    pub points_count: u32,
    pub ring_index_offset: u32,
    /// Number of `u32` entries (ring count + 1).
    pub ring_index_count: u32,
}

#[derive(Error, Debug)]
pub enum MarshalError {
    #[error("feature '{name}' has more values than the guest can address")]
    TooLarge { name: String },

    #[error("guest allocation failed: {0}")]
    Guest(#[from] GuestError),

    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),
}

/// Writes features into guest scratch memory.
///
/// The host-side staging buffer is reused across calls; guest allocations
/// are not. Callers must serialize access to the guest.
#[derive(Debug, Default)]
pub struct BufferMarshaler {
    points: Vec<f32>,
}

impl BufferMarshaler {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Stage `feature`, allocate its two buffers in the guest and write them.
    ///
    /// On any failure after the first allocation the guest's scratch is
    /// released before the error is returned.
    pub fn marshal<G>(&mut self, feature: &ValidatedFeature, guest: &mut G) -> Result<MarshaledFeature, MarshalError>
    where
        G: GuestMemory + ?Sized,
    {
        let too_large = || MarshalError::TooLarge {
            name: feature.name.clone(),
        };

        let table = RingIndexTable::from_rings(&feature.rings).ok_or_else(too_large)?;
        let ring_index_count = u32::try_from(table.entries().len()).map_err(|_| too_large())?;

        self.points.clear();
        self.points.extend(feature.flat_values().map(|v| v as f32));

        let result = self.write(&table, ring_index_count, guest);
        if result.is_err() {
            guest.release_scratch();
        }
        result
    }

    fn write<G>(
        &self,
        table: &RingIndexTable,
        ring_index_count: u32,
        guest: &mut G,
    ) -> Result<MarshaledFeature, MarshalError>
    where
        G: GuestMemory + ?Sized,
    {
        let points_count = table.total();

        let points_offset = guest.allocate(points_count)?;
        let ring_index_offset = guest.allocate(ring_index_count)?;
        check_disjoint(
            (points_offset, points_count),
            (ring_index_offset, ring_index_count),
        )?;

        let memory = guest.memory_mut();
        memory
            .view_mut::<f32>(points_offset, points_count)?
            .copy_from_slice(&self.points)?;
        memory
            .view_mut::<u32>(ring_index_offset, ring_index_count)?
            .copy_from_slice(table.entries())?;

        Ok(MarshaledFeature {
            points_offset,
            points_count,
            ring_index_offset,
            ring_index_count,
        })
    }
}

/// Two allocations handed out for the same call must not share bytes.
fn check_disjoint(a: (u32, u32), b: (u32, u32)) -> Result<(), ProtocolViolation> {
    let span = |(offset, count): (u32, u32)| {
        let start = offset as u64;
        (start, start + count as u64 * ELEMENT_SIZE as u64)
    };
    let (a_start, a_end) = span(a);
    let (b_start, b_end) = span(b);

    if a_start < a_end && b_start < b_end && a_start < b_end && b_start < a_end {
        return Err(ProtocolViolation::Overlap {
            first: a.0,
            second: b.0,
        });
    }
    Ok(())
}
