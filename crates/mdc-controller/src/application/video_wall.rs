//! Applying planned video-wall layouts to displays.
//!
//! [`VideoWallManager`] looks a layout up in its [`LayoutPlanner`] and sends
//! every display in it the wall mode for its grid cell, all displays
//! concurrently.  The outcome is reported per display; one failure does not
//! stop the others.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use mdc_core::{DisplayId, LayoutPlanner};
use tokio::task::JoinSet;
use tracing::{info, info_span, warn, Instrument, Span};

use crate::application::display_control::{ControlError, VideoWallMode};

/// A display that accepts video wall commands.
#[async_trait]
pub trait VideoWallDisplay: Send + Sync {
    fn display_id(&self) -> DisplayId;

    async fn set_video_wall_mode(&self, mode: VideoWallMode) -> Result<(), ControlError>;
}

/// Per-display results of a wall operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WallOutcome {
    /// Layout that was applied, `None` when the wall was disabled.
    pub layout: Option<String>,
    pub results: BTreeMap<DisplayId, Result<(), ControlError>>,
}

impl WallOutcome {
    /// `true` only if every display succeeded.
    pub fn success(&self) -> bool {
        self.results.values().all(Result::is_ok)
    }

    pub fn failures(&self) -> impl Iterator<Item = (DisplayId, &ControlError)> {
        self.results
            .iter()
            .filter_map(|(id, r)| r.as_ref().err().map(|e| (*id, e)))
    }
}

/// Configures and disables video walls over a fixed planner.
pub struct VideoWallManager {
    planner: LayoutPlanner,
    span: Span,
}

impl VideoWallManager {
    pub fn new(planner: LayoutPlanner) -> Self {
        Self {
            planner,
            span: info_span!("video_wall"),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn planner(&self) -> &LayoutPlanner {
        &self.planner
    }

    /// Enables wall mode on every display of `layout_name`.
    ///
    /// Displays of the layout missing from `displays` get
    /// [`ControlError::AdapterNotFound`] in the outcome.
    ///
    /// # Errors
    ///
    /// [`ControlError::LayoutNotFound`] if the planner has no such layout;
    /// nothing is sent in that case.
    pub async fn configure_video_wall(
        &self,
        layout_name: &str,
        displays: &[Arc<dyn VideoWallDisplay>],
    ) -> Result<WallOutcome, ControlError> {
        let layout = self
            .planner
            .layout(layout_name)
            .map_err(|_| ControlError::LayoutNotFound(layout_name.to_string()))?;

        let by_id: HashMap<DisplayId, &Arc<dyn VideoWallDisplay>> =
            displays.iter().map(|d| (d.display_id(), d)).collect();

        let mut results = BTreeMap::new();
        let mut jobs = Vec::with_capacity(layout.positions.len());
        for (display_id, position) in &layout.positions {
            match by_id.get(display_id) {
                Some(display) => jobs.push((
                    Arc::clone(display),
                    VideoWallMode::enabled_at(layout.horizontal, layout.vertical, *position),
                )),
                None => {
                    results.insert(*display_id, Err(ControlError::AdapterNotFound(*display_id)));
                }
            }
        }

        results.extend(self.apply_all(jobs).await);
        let outcome = WallOutcome {
            layout: Some(layout.name.clone()),
            results,
        };
        self.log_outcome("configure", &outcome);
        Ok(outcome)
    }

    /// Sends [`VideoWallMode::disabled`] to every display in `displays`.
    pub async fn disable_video_wall(&self, displays: &[Arc<dyn VideoWallDisplay>]) -> WallOutcome {
        let jobs = displays
            .iter()
            .map(|d| (Arc::clone(d), VideoWallMode::disabled()))
            .collect();
        let outcome = WallOutcome {
            layout: None,
            results: self.apply_all(jobs).await,
        };
        self.log_outcome("disable", &outcome);
        outcome
    }

    async fn apply_all(
        &self,
        jobs: Vec<(Arc<dyn VideoWallDisplay>, VideoWallMode)>,
    ) -> BTreeMap<DisplayId, Result<(), ControlError>> {
        let mut tasks = JoinSet::new();
        let mut owners = HashMap::with_capacity(jobs.len());

        for (display, mode) in jobs {
            let display_id = display.display_id();
            let span = info_span!(parent: &self.span, "wall_mode", display = display_id);
            let handle = tasks
                .spawn(async move { display.set_video_wall_mode(mode).await }.instrument(span));
            owners.insert(handle.id(), display_id);
        }

        let mut results = BTreeMap::new();
        while let Some(joined) = tasks.join_next_with_id().await {
            let (task_id, result) = match joined {
                Ok((task_id, result)) => (task_id, result),
                Err(e) => (e.id(), Err(ControlError::TaskFailed(e.to_string()))),
            };
            if let Some(display_id) = owners.get(&task_id) {
                results.insert(*display_id, result);
            }
        }
        results
    }

    fn log_outcome(&self, action: &str, outcome: &WallOutcome) {
        for (display_id, error) in outcome.failures() {
            warn!(parent: &self.span, action, display = display_id, %error, "video wall command failed");
        }
        info!(
            parent: &self.span,
            action,
            layout = outcome.layout.as_deref().unwrap_or("-"),
            displays = outcome.results.len(),
            success = outcome.success(),
            "video wall updated"
        );
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
