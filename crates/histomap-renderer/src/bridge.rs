//! Selection-driven rendering.
//!
//! Each click on a feature button runs one independent pipeline:
//! fetch, validate, then marshal and plot every feature, and finally update
//! the button states. Clicks are not debounced or cancelled; several
//! selections may be in flight at once and each updates the UI when it
//! completes.
//!
//! Guest access is serialized: a selection holds the guest for its whole
//! marshal/plot loop, and that loop never awaits, so scratch allocations of
//! two selections never interleave.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::task::JoinHandle;

use histomap_core::{validate, LayerParseError, ValidatedLayer};
use histomap_io::{ButtonPalette, FetchError, HostSettings, LayerSource, SelectionPolicy};

use crate::guest::{GuestError, GuestModule};
use crate::marshal::{BufferMarshaler, MarshalError};
use crate::selection::{ButtonState, SelectionState, SelectionTicket};
use crate::viewport::ViewportController;

// ── Errors ────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("failed to parse feature layer: {0}")]
    Parse(#[from] LayerParseError),

    #[error("feature layer contains no usable features")]
    EmptyLayer,

    #[error("marshaling failed: {0}")]
    Marshal(#[from] MarshalError),

    #[error("plotting failed: {0}")]
    Guest(#[from] GuestError),
}

/// How a selection ended.
#[derive(Debug)]
pub enum SelectionOutcome {
    /// The layer was plotted and its button highlighted.
    Rendered { features: usize },
    /// The button was flagged as failed.
    Failed(RenderError),
    /// A newer click took over before this one finished (only under
    /// [`SelectionPolicy::LatestIntent`]).
    Superseded,
}

impl SelectionOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, SelectionOutcome::Rendered { .. })
    }
}

// ── Bridge ────────────────────────────────────────────────────────────

struct GuestSlot<G> {
    guest: G,
    marshaler: BufferMarshaler,
}

pub struct RenderBridge<G> {
    source: Arc<dyn LayerSource>,
    viewport: Arc<dyn ViewportController>,
    guest: Mutex<GuestSlot<G>>,
    selection: Mutex<SelectionState>,
    policy: SelectionPolicy,
    palette: ButtonPalette,
}

impl<G: GuestModule> RenderBridge<G> {
    /// Enumerates the guest's feature paths once and registers a button for
    /// each.
    pub fn new(
        guest: G,
        source: Arc<dyn LayerSource>,
        viewport: Arc<dyn ViewportController>,
        settings: &HostSettings,
    ) -> Self {
        let paths = guest.features();
        log::info!(
            "Render bridge ready: {} feature layers, {:?} selection policy",
            paths.len(),
            settings.selection_policy
        );

        Self {
            source,
            viewport,
            guest: Mutex::new(GuestSlot {
                guest,
                marshaler: BufferMarshaler::new(),
            }),
            selection: Mutex::new(SelectionState::new(paths)),
            policy: settings.selection_policy,
            palette: settings.palette.clone(),
        }
    }

    pub fn feature_paths(&self) -> Vec<String> {
        self.lock_selection().paths().map(str::to_string).collect()
    }

    pub fn button_state(&self, path: &str) -> Option<ButtonState> {
        self.lock_selection().state(path)
    }

    /// Background colour of the button for `path`.
    pub fn background(&self, path: &str) -> Option<String> {
        self.button_state(path)
            .map(|s| s.background(&self.palette).to_string())
    }

    pub fn selected(&self) -> Option<String> {
        self.lock_selection().selected().map(str::to_string)
    }

    /// Run `f` against the guest while holding the guest lock.
    pub fn with_guest<R>(&self, f: impl FnOnce(&mut G) -> R) -> R {
        f(&mut self.lock_guest().guest)
    }

    /// Handle a click on the button for `path`.
    ///
    /// Only the fetch suspends. Everything after it (the staleness check,
    /// plotting and the button update) runs under the selection lock, so a
    /// newer click cannot slip in between plotting a layer and recording it.
    pub async fn on_feature_selected(&self, path: &str) -> SelectionOutcome {
        let ticket = self.lock_selection().begin();
        log::debug!("Selected {}", path);

        let loaded = self.load(path).await;

        let mut selection = self.lock_selection();
        if self.is_stale(&selection, ticket) {
            log::debug!("Discarding stale selection of {}", path);
            return SelectionOutcome::Superseded;
        }

        let result = loaded.and_then(|layer| {
            self.plot_layer(&layer)?;
            Ok(layer.feature_count())
        });

        match result {
            Ok(features) => {
                selection.mark_success(path);
                log::info!("Rendered {} ({} features)", path, features);
                SelectionOutcome::Rendered { features }
            }
            Err(e) => {
                selection.mark_failure(path);
                log::error!("Failed to render feature layer {}: {}", path, e);
                SelectionOutcome::Failed(e)
            }
        }
    }

    async fn load(&self, path: &str) -> Result<ValidatedLayer, RenderError> {
        let raw = self.source.fetch(path).await?;
        validate(&raw)?.ok_or(RenderError::EmptyLayer)
    }

    /// Clear the canvas once, then marshal and plot every feature in order.
    ///
    /// A failure on feature k aborts the rest of the layer but leaves the
    /// canvas cleared with features 0..k drawn on it; the caller still flags
    /// the selection as failed. Outstanding guest scratch is released so the
    /// next selection starts from an empty scratch heap.
    fn plot_layer(&self, layer: &ValidatedLayer) -> Result<(), RenderError> {
        if let Some(bbox) = layer.bbox() {
            let center = bbox.center();
            log::debug!(
                "Layer extent {} x {} centred on ({}, {})",
                bbox.width(),
                bbox.height(),
                center.x,
                center.y
            );
        }

        let frame = self.viewport.frame();
        let mut slot = self.lock_guest();
        let GuestSlot { guest, marshaler } = &mut *slot;

        self.viewport.clear();
        for feature in layer.features() {
            let plotted = marshaler
                .marshal(feature, guest)
                .map_err(RenderError::from)
                .and_then(|marshaled| Ok(guest.plot_feature(frame, marshaled)?));
            if let Err(e) = plotted {
                guest.release_scratch();
                log::warn!("Aborted layer at feature '{}'", feature.name);
                return Err(e);
            }
        }
        Ok(())
    }

    fn is_stale(&self, selection: &SelectionState, ticket: SelectionTicket) -> bool {
        self.policy == SelectionPolicy::LatestIntent && !selection.is_latest(ticket)
    }

    fn lock_selection(&self) -> MutexGuard<'_, SelectionState> {
        self.selection.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_guest(&self) -> MutexGuard<'_, GuestSlot<G>> {
        self.guest.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<G: GuestModule + 'static> RenderBridge<G> {
    /// Fire-and-forget entry point for click handlers.
    pub fn spawn_selection(self: &Arc<Self>, path: impl Into<String>) -> JoinHandle<SelectionOutcome> {
        let bridge = Arc::clone(self);
        let path = path.into();
        tokio::spawn(async move { bridge.on_feature_selected(&path).await })
    }
}
