use std::collections::BTreeSet;
use std::path::Path;

use stackmap::config::{Config, LayoutConfig};
use stackmap::graph::{EdgeKey, Graph, LayerFilter, ValidationError, build};
use stackmap::ir::{DiagramSource, LayerDecl, NodeDecl};
use stackmap::layout::{
    ViewportMetrics, compute_layout, compute_slots, resolve_anchors, route, visible_edges,
};
use stackmap::state::SelectionState;
use stackmap::{DiagramView, ReselectBehavior, Theme, render_svg};

fn fixture(name: &str) -> DiagramSource {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    DiagramSource::from_path(&path).expect("fixture read failed")
}

fn python_stack() -> Graph {
    Graph::from_source(&fixture("python_stack.json5")).expect("fixture should validate")
}

fn metrics() -> ViewportMetrics {
    ViewportMetrics::unmeasured(1200.0, 800.0)
}

fn scenario_graph() -> Graph {
    let layers = vec![LayerDecl::new("core", "Core", 0), LayerDecl::new("web", "Web", 1)];
    let nodes = vec![
        NodeDecl::new("numpy", "arrays", "core"),
        NodeDecl::new("pandas", "frames", "core").connect("numpy"),
        NodeDecl::new("django", "framework", "web"),
    ];
    build(&layers, &nodes).expect("scenario graph should validate")
}

#[test]
fn slots_are_deterministic() {
    let graph = python_stack();
    let config = LayoutConfig::default();
    for filter in [LayerFilter::All, graph.filter_for_key("data").unwrap()] {
        let first = compute_slots(&graph, filter, &config);
        let second = compute_slots(&graph, filter, &config);
        assert_eq!(first, second);
    }

    let mut state = SelectionState::initial(&graph);
    state.set_layer(&graph, "all").unwrap();
    let first = compute_layout(&graph, &state, &metrics(), &config);
    let second = compute_layout(&graph, &state, &metrics(), &config);
    assert_eq!(first, second);
}

#[test]
fn dangling_connection_fails_validation() {
    let err = Graph::from_source(&fixture("dangling.json5")).unwrap_err();
    assert_eq!(
        err,
        ValidationError::DanglingConnection {
            node: "pandas".to_string(),
            target: "numpy".to_string(),
        }
    );
    assert!(Graph::from_source(&fixture("python_stack.json5")).is_ok());
}

#[test]
fn mutual_connections_yield_one_edge() {
    let graph = python_stack();
    let ids: BTreeSet<&str> = ["fastapi", "pydantic"].into_iter().collect();
    let edges = graph.edges_among(&ids);
    assert_eq!(
        edges.into_iter().collect::<Vec<_>>(),
        vec![EdgeKey::new("pydantic", "fastapi")]
    );
}

#[test]
fn layer_filter_slots_only_that_layer() {
    let graph = python_stack();
    let config = LayoutConfig::default();
    for layer in graph.layer_ids() {
        let slots = compute_slots(&graph, LayerFilter::Only(layer), &config);
        let expected = graph.nodes_by_layer(layer);
        assert_eq!(slots.len(), expected.len());
        for node in expected {
            assert!(slots.contains_key(&node.id), "{} missing", node.id);
        }
        for id in slots.keys() {
            assert_eq!(graph.node(id).unwrap().layer, layer);
        }
    }
    assert_eq!(compute_slots(&graph, LayerFilter::All, &config).len(), graph.len());
}

#[test]
fn layer_switch_clears_hidden_selection() {
    let graph = python_stack();
    let mut state = SelectionState::initial(&graph);
    state.select_node(&graph, "numpy", ReselectBehavior::Keep).unwrap();
    state.set_layer(&graph, "all").unwrap();
    assert_eq!(state.selected(), Some("numpy"));
    state.set_layer(&graph, "web").unwrap();
    assert_eq!(state.selected(), None);
}

#[test]
fn core_and_web_scenario() {
    let graph = scenario_graph();
    let config = LayoutConfig::default();
    let mut state = SelectionState::initial(&graph);
    state.set_layer(&graph, "core").unwrap();
    state.select_node(&graph, "numpy", ReselectBehavior::Keep).unwrap();

    let slots = compute_slots(&graph, state.active_layer(), &config);
    assert_eq!(slots.keys().collect::<Vec<_>>(), vec!["numpy", "pandas"]);
    let geometry = resolve_anchors(&slots, &metrics(), &config);
    let paths = route(&visible_edges(&graph, &slots), &geometry, &state, &config);
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].key, EdgeKey::new("numpy", "pandas"));
    assert!(paths[0].highlighted);

    state.set_layer(&graph, "web").unwrap();
    assert_eq!(state.selected(), None);
    let slots = compute_slots(&graph, state.active_layer(), &config);
    assert_eq!(slots.keys().collect::<Vec<_>>(), vec!["django"]);
    let geometry = resolve_anchors(&slots, &metrics(), &config);
    assert!(route(&visible_edges(&graph, &slots), &geometry, &state, &config).is_empty());
}

#[test]
fn connectors_start_and_end_on_card_edges() {
    let graph = python_stack();
    let mut config = Config::default();
    config.layout.fast_text_metrics = true;
    let mut view = DiagramView::new(graph, &config, metrics());
    view.set_layer("all").unwrap();
    assert!(!view.connectors().is_empty());

    for connector in view.connectors() {
        for (anchor, id) in [(&connector.start, &connector.key.a), (&connector.end, &connector.key.b)] {
            assert_eq!(&anchor.node_id, id);
            let rect = view.geometry()[id].rect;
            let on_vertical = (anchor.x - rect.x).abs() < 0.01 || (anchor.x - rect.right()).abs() < 0.01;
            let on_horizontal = (anchor.y - rect.y).abs() < 0.01 || (anchor.y - rect.bottom()).abs() < 0.01;
            assert!(on_vertical || on_horizontal, "{id} anchor off the card edge");
        }
        let first = connector.points.first().unwrap();
        let last = connector.points.last().unwrap();
        assert_eq!(*first, connector.start.point());
        assert_eq!(*last, connector.end.point());
    }
}

#[test]
fn interactive_session_renders_every_state() {
    let graph = python_stack();
    let mut config = Config::default();
    config.layout.fast_text_metrics = true;
    let theme = Theme::modern();
    let mut view = DiagramView::new(graph, &config, metrics());

    let svg = render_svg(&view.frame(), view.graph(), &theme, &config);
    assert!(svg.contains("NumPy"));
    assert!(!svg.contains("Django"));

    view.select_node("sklearn").unwrap_err();
    view.set_layer("ml").unwrap();
    view.select_node("sklearn").unwrap();
    let svg = render_svg(&view.frame(), view.graph(), &theme, &config);
    assert!(svg.contains("detail-panel"));
    assert!(svg.contains("scikit-learn"));

    view.set_layer("all").unwrap();
    assert_eq!(view.state().selected(), Some("sklearn"));
    let highlighted = view.connectors().iter().filter(|c| c.highlighted).count();
    assert_eq!(highlighted, 3);

    view.clear_selection();
    assert!(view.connectors().iter().all(|c| !c.highlighted));
    let svg = render_svg(&view.frame(), view.graph(), &theme, &config);
    assert!(svg.contains("Django"));
    assert!(svg.contains(">Machine Learning</text>"));
}
