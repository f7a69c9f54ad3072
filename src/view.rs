use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::config::{Config, InteractionConfig, LayoutConfig};
use crate::graph::{EdgeKey, Graph, LayerFilter};
use crate::layout::{
    ConnectorPath, GeometryMap, GridBounds, Rect, SlotMap, ViewportMetrics, apply_highlight,
    compute_slots, grid_bounds, resolve_anchors, route, visible_edges,
};
use crate::state::{Invalidation, SelectionError, SelectionState};

/// How often each stage has run since the view was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub layout_runs: usize,
    pub geometry_runs: usize,
    pub routing_runs: usize,
    pub highlight_runs: usize,
}

/// Everything an external renderer needs for one pass.
#[derive(Debug, Clone, Serialize)]
pub struct Frame<'a> {
    pub width: f32,
    pub height: f32,
    pub grid: GridBounds,
    pub active: LayerFilter,
    pub selected: Option<&'a str>,
    pub cards: BTreeMap<&'a str, Rect>,
    pub connectors: &'a [ConnectorPath],
}

/// Interactive diagram: owns the immutable graph, the selection state and
/// the cached output of each pipeline stage.
#[derive(Debug, Clone)]
pub struct DiagramView {
    graph: Graph,
    layout: LayoutConfig,
    interaction: InteractionConfig,
    state: SelectionState,
    metrics: ViewportMetrics,
    slots: SlotMap,
    edges: BTreeSet<EdgeKey>,
    geometry: GeometryMap,
    connectors: Vec<ConnectorPath>,
    stats: PipelineStats,
}

impl DiagramView {
    pub fn new(graph: Graph, config: &Config, metrics: ViewportMetrics) -> Self {
        let state = SelectionState::initial(&graph);
        let mut view = Self {
            graph,
            layout: config.layout.clone(),
            interaction: config.interaction.clone(),
            state,
            metrics,
            slots: SlotMap::new(),
            edges: BTreeSet::new(),
            geometry: GeometryMap::new(),
            connectors: Vec::new(),
            stats: PipelineStats::default(),
        };
        view.apply(Invalidation::ALL);
        view
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn metrics(&self) -> &ViewportMetrics {
        &self.metrics
    }

    pub fn slots(&self) -> &SlotMap {
        &self.slots
    }

    pub fn edges(&self) -> &BTreeSet<EdgeKey> {
        &self.edges
    }

    pub fn geometry(&self) -> &GeometryMap {
        &self.geometry
    }

    pub fn connectors(&self) -> &[ConnectorPath] {
        &self.connectors
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn select_node(&mut self, id: &str) -> Result<Invalidation, SelectionError> {
        let invalidation = self
            .state
            .select_node(&self.graph, id, self.interaction.reselect)?;
        self.apply(invalidation);
        Ok(invalidation)
    }

    pub fn clear_selection(&mut self) -> Invalidation {
        let invalidation = self.state.clear_selection();
        self.apply(invalidation);
        invalidation
    }

    pub fn set_layer(&mut self, key: &str) -> Result<Invalidation, SelectionError> {
        let invalidation = self.state.set_layer(&self.graph, key)?;
        self.apply(invalidation);
        Ok(invalidation)
    }

    pub fn resize(&mut self, metrics: ViewportMetrics) -> Invalidation {
        if metrics == self.metrics {
            return Invalidation::NONE;
        }
        self.metrics = metrics;
        self.apply(Invalidation::GEOMETRY)
    }

    /// Recomputes the invalidated stages in order and returns what actually
    /// ran. Geometry that comes out identical does not re-run routing.
    fn apply(&mut self, invalidation: Invalidation) -> Invalidation {
        let mut ran = Invalidation::NONE;
        if invalidation.is_empty() {
            return ran;
        }

        if invalidation.layout {
            self.slots = compute_slots(&self.graph, self.state.active_layer(), &self.layout);
            self.edges = visible_edges(&self.graph, &self.slots);
            self.stats.layout_runs += 1;
            ran.layout = true;
            tracing::debug!(
                slots = self.slots.len(),
                edges = self.edges.len(),
                "layout stage"
            );
        }

        if invalidation.layout || invalidation.geometry {
            let geometry = resolve_anchors(&self.slots, &self.metrics, &self.layout);
            self.stats.geometry_runs += 1;
            ran.geometry = true;
            let changed = geometry != self.geometry;
            tracing::debug!(nodes = geometry.len(), changed, "geometry stage");
            if changed {
                self.geometry = geometry;
                ran.routing = true;
            }
        }

        if ran.routing {
            self.connectors = route(&self.edges, &self.geometry, &self.state, &self.layout);
            self.stats.routing_runs += 1;
            tracing::debug!(connectors = self.connectors.len(), "routing stage");
        } else if invalidation.highlight {
            apply_highlight(&mut self.connectors, self.state.selected());
            self.stats.highlight_runs += 1;
            ran.highlight = true;
        }

        ran
    }

    pub fn frame(&self) -> Frame<'_> {
        let grid = grid_bounds(&self.slots, &self.metrics, &self.layout);
        let cards: BTreeMap<&str, Rect> = self
            .geometry
            .iter()
            .map(|(id, node)| (id.as_str(), node.rect))
            .collect();
        let content_right = cards
            .values()
            .map(Rect::right)
            .fold(grid.right(), f32::max);
        let content_bottom = cards
            .values()
            .map(Rect::bottom)
            .fold(grid.bottom(), f32::max);
        Frame {
            width: (content_right + self.layout.margin).max(self.metrics.width),
            height: content_bottom + self.layout.margin,
            grid,
            active: self.state.active_layer(),
            selected: self.state.selected(),
            cards,
            connectors: &self.connectors,
        }
    }
}
