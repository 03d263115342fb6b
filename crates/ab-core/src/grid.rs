//! Grid overlay settings and coarse grid snapping.
//!
//! Independent of the alignment snap detector: grid snapping rounds a
//! position to the nearest cell boundary, where cell size is derived from
//! the canvas dimensions and the configured row/column counts.

use crate::bounds::Canvas;
use crate::model::Color;
use serde::{Deserialize, Serialize};

/// Minimum rows/columns — below this cells degenerate.
pub const MIN_GRID_DIVISIONS: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSettings {
    /// Whether the grid overlay is drawn.
    pub enabled: bool,
    /// Whether positions snap to cell boundaries.
    pub snap_enabled: bool,
    pub rows: u32,
    pub columns: u32,
    pub color: Color,
    /// 0.0 .. 1.0.
    pub opacity: f32,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            snap_enabled: false,
            rows: 9,
            columns: 16,
            color: Color::rgb(0x94, 0xA3, 0xB8),
            opacity: 0.35,
        }
    }
}

impl GridSettings {
    pub fn new(rows: u32, columns: u32) -> Self {
        Self {
            rows: rows.max(MIN_GRID_DIVISIONS),
            columns: columns.max(MIN_GRID_DIVISIONS),
            ..Default::default()
        }
    }

    /// Clamp rows/columns and opacity into their valid ranges. Called after
    /// deserializing untrusted settings.
    pub fn normalize(&mut self) {
        self.rows = self.rows.max(MIN_GRID_DIVISIONS);
        self.columns = self.columns.max(MIN_GRID_DIVISIONS);
        self.opacity = self.opacity.clamp(0.0, 1.0);
    }

    pub fn cell_size(&self, canvas: &Canvas) -> (f32, f32) {
        (
            canvas.width / self.columns.max(MIN_GRID_DIVISIONS) as f32,
            canvas.height / self.rows.max(MIN_GRID_DIVISIONS) as f32,
        )
    }

    /// Round a position to the nearest cell boundary. Identity when grid
    /// snapping is disabled.
    pub fn snap_position(&self, x: f32, y: f32, canvas: &Canvas) -> (f32, f32) {
        if !self.snap_enabled {
            return (x, y);
        }
        let (cw, ch) = self.cell_size(canvas);
        ((x / cw).round() * cw, (y / ch).round() * ch)
    }

    /// Round dimensions to the nearest multiple of the cell size, with a
    /// floor of one cell — a dimension never snaps to zero.
    pub fn snap_size(&self, width: f32, height: f32, canvas: &Canvas) -> (f32, f32) {
        if !self.snap_enabled {
            return (width, height);
        }
        let (cw, ch) = self.cell_size(canvas);
        (
            ((width / cw).round() * cw).max(cw),
            ((height / ch).round() * ch).max(ch),
        )
    }
}
