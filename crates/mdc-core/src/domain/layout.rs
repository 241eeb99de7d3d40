//! Video-wall layout planning.
//!
//! A video wall is a rectangular grid of displays that jointly render one
//! image.  Every display is told the grid dimensions and its own 1-based
//! position, and crops its share of the picture accordingly.
//!
//! Given a fixed, ordered set of displays, [`LayoutPlanner`] enumerates every
//! rectangular grid that uses all of them exactly once (one per divisor of
//! the display count) and assigns grid cells in row-major order:
//!
//! ```text
//! "2x2" for displays [A, B, C, D]
//!   h=1  h=2
//!  ┌────┬────┐
//!  │ A  │ B  │ v=1
//!  ├────┼────┤
//!  │ C  │ D  │ v=2
//!  └────┴────┘
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// MDC device id of a display (the third byte of every frame).
pub type DisplayId = u8;

/// Errors that can occur when looking up layouts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    /// No layout with this name exists for the planner's display set.
    #[error("layout not found: {0}")]
    NotFound(String),
}

/// 1-based cell of a display within a video-wall grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPosition {
    /// Column, `1..=horizontal`.
    pub horizontal: u8,
    /// Row, `1..=vertical`.
    pub vertical: u8,
}

/// One rectangular arrangement of the whole display set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoWallLayout {
    /// `"{horizontal}x{vertical}"`, e.g. `"2x2"`.
    pub name: String,
    pub horizontal: u8,
    pub vertical: u8,
    pub total_displays: usize,
    /// `horizontal / vertical`.
    pub aspect_ratio: f64,
    /// Display → cell, in the planner's display order.
    pub positions: Vec<(DisplayId, GridPosition)>,
}

impl VideoWallLayout {
    /// Grid position of `display_id`, if it belongs to this layout.
    pub fn position_of(&self, display_id: DisplayId) -> Option<GridPosition> {
        self.positions
            .iter()
            .find(|(id, _)| *id == display_id)
            .map(|(_, pos)| *pos)
    }
}

/// Row-major cell for the `index`-th display of a grid `horizontal` cells wide.
///
/// `None` when `horizontal` is zero or the row number does not fit in a `u8`.
pub fn grid_position(index: usize, horizontal: u8) -> Option<GridPosition> {
    let width = usize::from(horizontal);
    if width == 0 {
        return None;
    }
    Some(GridPosition {
        horizontal: u8::try_from(index % width + 1).ok()?,
        vertical: u8::try_from(index / width + 1).ok()?,
    })
}

/// Enumerates every full-grid layout for a fixed set of displays.
///
/// Layouts are computed once, at construction; build a new planner to
/// re-plan for a different display set.
#[derive(Debug, Clone)]
pub struct LayoutPlanner {
    display_ids: Vec<DisplayId>,
    layouts: BTreeMap<String, VideoWallLayout>,
    order: Vec<String>,
}

impl LayoutPlanner {
    /// Plans all layouts for `display_ids`, keeping their iteration order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mdc_core::domain::layout::LayoutPlanner;
    ///
    /// let planner = LayoutPlanner::new([1, 2, 3, 4]);
    /// assert_eq!(planner.layout_names(), vec!["1x4", "2x2", "4x1"]);
    /// ```
    pub fn new(display_ids: impl IntoIterator<Item = DisplayId>) -> Self {
        let display_ids: Vec<DisplayId> = display_ids.into_iter().collect();
        let count = display_ids.len();
        let mut layouts = BTreeMap::new();
        let mut order = Vec::new();

        for h in (1..=count).filter(|h| count % h == 0) {
            let v = count / h;
            // Grids with a side longer than the one-byte wire field are skipped.
            let (Ok(horizontal), Ok(vertical)) = (u8::try_from(h), u8::try_from(v)) else {
                continue;
            };
            let Some(positions) = display_ids
                .iter()
                .enumerate()
                .map(|(i, id)| grid_position(i, horizontal).map(|pos| (*id, pos)))
                .collect::<Option<Vec<_>>>()
            else {
                continue;
            };
            let name = format!("{h}x{v}");
            let layout = VideoWallLayout {
                name: name.clone(),
                horizontal,
                vertical,
                total_displays: count,
                aspect_ratio: h as f64 / v as f64,
                positions,
            };
            order.push(name.clone());
            layouts.insert(name, layout);
        }

        Self {
            display_ids,
            layouts,
            order,
        }
    }

    /// Displays this planner was built for, in order.
    pub fn display_ids(&self) -> &[DisplayId] {
        &self.display_ids
    }

    /// All layouts, ordered by ascending horizontal count.
    pub fn layouts(&self) -> impl Iterator<Item = &VideoWallLayout> {
        self.order.iter().filter_map(|name| self.layouts.get(name))
    }

    /// Layout names, ordered by ascending horizontal count.
    pub fn layout_names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    /// Looks up a layout by name.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::NotFound`] for names this planner did not produce.
    pub fn layout(&self, name: &str) -> Result<&VideoWallLayout, LayoutError> {
        self.layouts
            .get(name)
            .ok_or_else(|| LayoutError::NotFound(name.to_string()))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
