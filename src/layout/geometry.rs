use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::LayoutConfig;

use super::slots::slot_extent;
use super::{Anchor, GeometryMap, NodeGeometry, Rect, Side, SlotMap};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

/// What the host knows about the drawing surface for one render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportMetrics {
    pub width: f32,
    pub height: f32,
    /// Measured card sizes. `None` measures every slotted card at the full
    /// cell size; `Some` drops geometry for any node it does not list.
    pub measured: Option<BTreeMap<String, Size>>,
}

impl ViewportMetrics {
    pub fn unmeasured(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            measured: None,
        }
    }

    pub fn with_measurements(width: f32, height: f32, measured: BTreeMap<String, Size>) -> Self {
        Self {
            width,
            height,
            measured: Some(measured),
        }
    }
}

/// Pixel extent of the slot grid, independent of which cards were measured.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridBounds {
    pub origin_x: f32,
    pub origin_y: f32,
    pub width: f32,
    pub height: f32,
}

impl GridBounds {
    pub fn right(&self) -> f32 {
        self.origin_x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.origin_y + self.height
    }
}

pub fn grid_bounds(slots: &SlotMap, metrics: &ViewportMetrics, config: &LayoutConfig) -> GridBounds {
    let (rows, columns, bands) = slot_extent(slots);
    let width = span(columns, config.cell_width, config.gutter_x);
    let height = span(rows, config.cell_height, config.gutter_y)
        + bands.saturating_sub(1) as f32 * config.band_gap;
    let viewport_width = if metrics.width.is_finite() { metrics.width } else { 0.0 };
    let origin_x = ((viewport_width - width) / 2.0).floor().max(config.margin);
    let origin_y = config.margin + config.tab_bar_height;
    GridBounds {
        origin_x,
        origin_y,
        width,
        height,
    }
}

fn span(count: usize, cell: f32, gutter: f32) -> f32 {
    if count == 0 {
        return 0.0;
    }
    count as f32 * cell + (count - 1) as f32 * gutter
}

/// Resolves every slot to a card rectangle and its four side anchors.
///
/// Pure in its inputs: identical slots, metrics and config always produce
/// identical output, which lets callers skip re-routing by comparing maps.
pub fn resolve_anchors(slots: &SlotMap, metrics: &ViewportMetrics, config: &LayoutConfig) -> GeometryMap {
    let bounds = grid_bounds(slots, metrics, config);
    let mut geometry = GeometryMap::new();

    for (id, slot) in slots {
        let size = match &metrics.measured {
            None => Size {
                width: config.cell_width,
                height: config.cell_height,
            },
            Some(measured) => match measured.get(id) {
                Some(size) => *size,
                // Not in the measurement set yet; no guessing.
                None => continue,
            },
        };
        let width = size.width.min(config.cell_width).max(0.0);
        let height = size.height.min(config.cell_height).max(0.0);

        let cell_x = bounds.origin_x + slot.column as f32 * (config.cell_width + config.gutter_x);
        let cell_y = bounds.origin_y
            + slot.row as f32 * (config.cell_height + config.gutter_y)
            + slot.band as f32 * config.band_gap;
        let rect = Rect {
            x: cell_x + (config.cell_width - width) / 2.0,
            y: cell_y + (config.cell_height - height) / 2.0,
            width,
            height,
        };

        geometry.insert(
            id.clone(),
            NodeGeometry {
                rect,
                anchors: side_anchors(id, &rect),
            },
        );
    }

    geometry
}

fn side_anchors(id: &str, rect: &Rect) -> Vec<Anchor> {
    let (cx, cy) = rect.center();
    Side::ALL
        .iter()
        .map(|&side| {
            let (x, y) = match side {
                Side::Top => (cx, rect.y),
                Side::Bottom => (cx, rect.bottom()),
                Side::Left => (rect.x, cy),
                Side::Right => (rect.right(), cy),
            };
            Anchor {
                node_id: id.to_string(),
                x,
                y,
                side,
            }
        })
        .collect()
}
