pub mod geometry;
pub mod routing;
pub mod slots;
pub(crate) mod types;
pub use types::*;

pub use geometry::{GridBounds, Size, ViewportMetrics, grid_bounds, resolve_anchors};
pub use routing::{apply_highlight, route};
pub use slots::compute_slots;

use std::collections::BTreeSet;

use crate::config::LayoutConfig;
use crate::graph::{EdgeKey, Graph};
use crate::state::SelectionState;

/// Output of one full run of the layout, geometry and routing stages.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutPass {
    pub slots: SlotMap,
    pub edges: BTreeSet<EdgeKey>,
    pub geometry: GeometryMap,
    pub connectors: Vec<ConnectorPath>,
}

/// Runs the whole pipeline for one state, strictly in stage order.
pub fn compute_layout(
    graph: &Graph,
    state: &SelectionState,
    metrics: &ViewportMetrics,
    config: &LayoutConfig,
) -> LayoutPass {
    let slots = compute_slots(graph, state.active_layer(), config);
    let edges = visible_edges(graph, &slots);
    let geometry = resolve_anchors(&slots, metrics, config);
    let connectors = route(&edges, &geometry, state, config);
    LayoutPass {
        slots,
        edges,
        geometry,
        connectors,
    }
}

/// Canonical edges between slotted nodes.
pub fn visible_edges(graph: &Graph, slots: &SlotMap) -> BTreeSet<EdgeKey> {
    let ids: BTreeSet<&str> = slots.keys().map(String::as_str).collect();
    graph.edges_among(&ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReselectBehavior;
    use crate::graph::build;
    use crate::ir::{LayerDecl, NodeDecl};

    #[test]
    fn layout_pass_routes_only_visible_edges() {
        let layers = vec![LayerDecl::new("core", "Core", 0), LayerDecl::new("web", "Web", 1)];
        let nodes = vec![
            NodeDecl::new("numpy", "arrays", "core"),
            NodeDecl::new("pandas", "frames", "core").connect("numpy"),
            NodeDecl::new("django", "framework", "web").connect("numpy"),
        ];
        let graph = build(&layers, &nodes).unwrap();
        let mut state = SelectionState::initial(&graph);
        state.select_node(&graph, "pandas", ReselectBehavior::Keep).unwrap();
        let metrics = ViewportMetrics::unmeasured(800.0, 600.0);
        let config = LayoutConfig::default();

        let pass = compute_layout(&graph, &state, &metrics, &config);
        assert_eq!(pass.slots.len(), 2);
        assert_eq!(pass.edges.len(), 1);
        assert_eq!(pass.connectors.len(), 1);
        assert!(pass.connectors[0].highlighted);

        state.set_layer(&graph, "all").unwrap();
        let pass = compute_layout(&graph, &state, &metrics, &config);
        assert_eq!(pass.edges.len(), 2);
        assert_eq!(pass.connectors.len(), 2);
        let again = compute_layout(&graph, &state, &metrics, &config);
        assert_eq!(pass, again);
    }
}
