//! The capability surface the sandboxed plotting guest exposes to the host.
//!
//! A guest enumerates its feature paths once at start-up, hands out scratch
//! allocations in its linear memory, and plots features whose geometry the
//! host has written into those allocations. The guest reclaims scratch after
//! every plot call; the host treats each allocation as valid only until then,
//! and hands scratch back explicitly when it abandons an allocation without
//! plotting it.

use thiserror::Error;

use histomap_core::RingIndexTable;
use histomap_io::HostSettings;

use crate::marshal::MarshaledFeature;
use crate::memory::{LinearMemory, ProtocolViolation, PAGE_SIZE};
use crate::render_data::{DisplayList, PlottedFeature, PlottedPoint};
use crate::viewport::CanvasFrame;

/// Size in bytes of one allocation element. Point values (`f32`) and ring
/// index entries (`u32`) share it.
pub const ELEMENT_SIZE: u32 = 4;

const _: () = assert!(std::mem::size_of::<f32>() == ELEMENT_SIZE as usize);
const _: () = assert!(std::mem::size_of::<u32>() == ELEMENT_SIZE as usize);

// ── Errors ────────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuestError {
    #[error("guest out of memory: {requested} more bytes requested, limit is {limit} bytes")]
    OutOfMemory { requested: usize, limit: usize },

    #[error("guest trapped: {0}")]
    Trap(String),
}

impl From<ProtocolViolation> for GuestError {
    fn from(err: ProtocolViolation) -> Self {
        GuestError::Trap(err.to_string())
    }
}

// ── Capability traits ─────────────────────────────────────────────────

/// Scratch allocation plus host access to the guest's linear memory.
pub trait GuestMemory {
    /// Reserve `count` elements of [`ELEMENT_SIZE`] bytes and return the byte
    /// offset of the first one.
    fn allocate(&mut self, count: u32) -> Result<u32, GuestError>;

    /// Give back every outstanding scratch allocation. Called when marshaling
    /// or plotting fails part way, so an aborted feature cannot pin scratch.
    fn release_scratch(&mut self);

    fn memory(&self) -> &LinearMemory;

    fn memory_mut(&mut self) -> &mut LinearMemory;
}

/// The full guest module as the render bridge drives it.
pub trait GuestModule: GuestMemory + Send {
    /// Feature paths the guest knows about, in display order.
    fn features(&self) -> Vec<String>;

    /// Plot one feature from a marshaled point buffer and ring index table.
    fn plot_feature(&mut self, frame: CanvasFrame, feature: MarshaledFeature) -> Result<(), GuestError>;

    /// Plot a single point (legacy demo mode).
    fn plot_point(&mut self, frame: CanvasFrame, x: f32, y: f32) -> Result<(), GuestError>;
}

// ── Scratch guest ─────────────────────────────────────────────────────

/// Low memory the guest keeps for its own statics; scratch starts above it.
const SCRATCH_BASE: u32 = 1024;

/// An in-process guest with a bump-allocated scratch heap.
///
/// Plot calls read the buffers back through typed views, check the ring
/// index table, and append to a display list instead of rasterizing. All
/// scratch is reclaimed after each `plot_feature`.
#[derive(Debug)]
pub struct ScratchGuest {
    features: Vec<String>,
    memory: LinearMemory,
    cursor: u32,
    max_pages: u32,
    display: DisplayList,
}

impl ScratchGuest {
    pub fn new(features: Vec<String>, pages: u32, max_pages: u32) -> Self {
        Self {
            features,
            memory: LinearMemory::with_pages(pages),
            cursor: SCRATCH_BASE,
            max_pages: max_pages.max(pages),
            display: DisplayList::default(),
        }
    }

    pub fn from_settings(features: Vec<String>, settings: &HostSettings) -> Self {
        Self::new(features, settings.memory_pages, settings.max_memory_pages)
    }

    pub fn display_list(&self) -> &DisplayList {
        &self.display
    }

    pub fn take_display_list(&mut self) -> DisplayList {
        std::mem::take(&mut self.display)
    }

    /// Bytes of scratch currently handed out.
    pub fn scratch_in_use(&self) -> u32 {
        self.cursor - SCRATCH_BASE
    }

    fn ensure_capacity(&mut self, end: usize) -> Result<(), GuestError> {
        if end <= self.memory.len() {
            return Ok(());
        }
        let limit = self.max_pages as usize * PAGE_SIZE;
        if end > limit || end > u32::MAX as usize {
            return Err(GuestError::OutOfMemory {
                requested: end - self.memory.len(),
                limit,
            });
        }
        let missing = (end - self.memory.len()).div_ceil(PAGE_SIZE) as u32;
        let previous = self.memory.grow(missing);
        log::debug!("Guest memory grown from {} to {} pages", previous, previous + missing);
        Ok(())
    }

    fn read_feature(&self, frame: CanvasFrame, feature: MarshaledFeature) -> Result<PlottedFeature, GuestError> {
        let points = self
            .memory
            .read::<f32>(feature.points_offset, feature.points_count)?;
        let index = self
            .memory
            .read::<u32>(feature.ring_index_offset, feature.ring_index_count)?;

        if !RingIndexTable::is_well_formed(&index, feature.points_count) {
            return Err(GuestError::Trap(format!(
                "malformed ring index table {:?} for {} values",
                index, feature.points_count
            )));
        }

        let rings = index
            .windows(2)
            .map(|w| points[w[0] as usize..w[1] as usize].to_vec())
            .collect();

        Ok(PlottedFeature {
            context: frame.context,
            canvas: frame.size,
            rings,
        })
    }
}

impl GuestMemory for ScratchGuest {
    fn allocate(&mut self, count: u32) -> Result<u32, GuestError> {
        let start = self.cursor;
        let end = (count as usize)
            .checked_mul(ELEMENT_SIZE as usize)
            .and_then(|len| (start as usize).checked_add(len))
            .ok_or(GuestError::OutOfMemory {
                requested: usize::MAX,
                limit: self.max_pages as usize * PAGE_SIZE,
            })?;

        self.ensure_capacity(end)?;
        self.cursor = end as u32;
        Ok(start)
    }

    fn release_scratch(&mut self) {
        self.cursor = SCRATCH_BASE;
    }

    fn memory(&self) -> &LinearMemory {
        &self.memory
    }

    fn memory_mut(&mut self) -> &mut LinearMemory {
        &mut self.memory
    }
}

impl GuestModule for ScratchGuest {
    fn features(&self) -> Vec<String> {
        self.features.clone()
    }

    fn plot_feature(&mut self, frame: CanvasFrame, feature: MarshaledFeature) -> Result<(), GuestError> {
        let plotted = self.read_feature(frame, feature);
        self.release_scratch();
        let plotted = plotted?;
        log::debug!(
            "Plotted {} values in {} rings",
            plotted.value_count(),
            plotted.rings.len()
        );
        self.display.features.push(plotted);
        Ok(())
    }

    fn plot_point(&mut self, frame: CanvasFrame, x: f32, y: f32) -> Result<(), GuestError> {
        self.display.points.push(PlottedPoint {
            context: frame.context,
            canvas: frame.size,
            x,
            y,
        });
        Ok(())
    }
}
