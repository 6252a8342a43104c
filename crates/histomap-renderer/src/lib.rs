//! # Histomap Renderer
//!
//! Host side of the plotting guest: typed views over guest linear memory,
//! marshaling of validated features into guest scratch allocations, and the
//! selection-driven bridge that fetches a layer, plots it, and keeps the
//! feature buttons in sync.

pub mod memory;
pub mod guest;
pub mod marshal;
pub mod viewport;
pub mod render_data;
pub mod selection;
pub mod bridge;

pub use memory::{LinearMemory, ProtocolViolation, PAGE_SIZE};
pub use guest::{GuestError, GuestMemory, GuestModule, ScratchGuest, ELEMENT_SIZE};
pub use marshal::{BufferMarshaler, MarshalError, MarshaledFeature};
pub use viewport::{CanvasFrame, CanvasSize, CanvasSizeError, ContextHandle, HeadlessViewport, ViewportController};
pub use render_data::{DisplayList, PlottedFeature, PlottedPoint};
pub use selection::{ButtonState, SelectionState, SelectionTicket};
pub use bridge::{RenderBridge, RenderError, SelectionOutcome};
