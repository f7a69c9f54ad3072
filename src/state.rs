use serde::Serialize;
use thiserror::Error;

use crate::config::ReselectBehavior;
use crate::graph::{Graph, LayerFilter};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("unknown node `{0}`")]
    UnknownNode(String),
    #[error("node `{0}` is not visible under the active layer")]
    NotVisible(String),
    #[error("unknown layer `{0}`")]
    UnknownLayer(String),
}

/// Pipeline stages a transition made stale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Invalidation {
    pub layout: bool,
    pub geometry: bool,
    pub routing: bool,
    pub highlight: bool,
}

impl Invalidation {
    pub const NONE: Invalidation = Invalidation {
        layout: false,
        geometry: false,
        routing: false,
        highlight: false,
    };
    pub const HIGHLIGHT: Invalidation = Invalidation {
        highlight: true,
        ..Invalidation::NONE
    };
    pub const GEOMETRY: Invalidation = Invalidation {
        geometry: true,
        ..Invalidation::NONE
    };
    pub const ALL: Invalidation = Invalidation {
        layout: true,
        geometry: true,
        routing: true,
        highlight: true,
    };

    pub fn is_empty(&self) -> bool {
        *self == Invalidation::NONE
    }
}

/// Current selection and layer filter. Invariant: `selected` is `None` or
/// a node visible under `active`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionState {
    selected: Option<String>,
    active: LayerFilter,
}

impl Default for SelectionState {
    /// Placeholder state for computations that need no graph; views start
    /// from [`SelectionState::initial`].
    fn default() -> Self {
        Self {
            selected: None,
            active: LayerFilter::All,
        }
    }
}

impl SelectionState {
    pub fn initial(graph: &Graph) -> Self {
        Self {
            selected: None,
            active: LayerFilter::Only(graph.default_layer()),
        }
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn active_layer(&self) -> LayerFilter {
        self.active
    }

    pub fn select_node(
        &mut self,
        graph: &Graph,
        id: &str,
        reselect: ReselectBehavior,
    ) -> Result<Invalidation, SelectionError> {
        let Some(node) = graph.node(id) else {
            return Err(SelectionError::UnknownNode(id.to_string()));
        };
        if !self.active.admits(node.layer) {
            return Err(SelectionError::NotVisible(id.to_string()));
        }
        if self.selected.as_deref() == Some(id) {
            return Ok(match reselect {
                ReselectBehavior::Keep => Invalidation::NONE,
                ReselectBehavior::Toggle => {
                    self.selected = None;
                    Invalidation::HIGHLIGHT
                }
            });
        }
        self.selected = Some(id.to_string());
        Ok(Invalidation::HIGHLIGHT)
    }

    pub fn clear_selection(&mut self) -> Invalidation {
        if self.selected.take().is_some() {
            Invalidation::HIGHLIGHT
        } else {
            Invalidation::NONE
        }
    }

    pub fn set_layer(&mut self, graph: &Graph, key: &str) -> Result<Invalidation, SelectionError> {
        let filter = graph
            .filter_for_key(key)
            .ok_or_else(|| SelectionError::UnknownLayer(key.to_string()))?;
        Ok(self.set_filter(graph, filter))
    }

    pub fn set_filter(&mut self, graph: &Graph, filter: LayerFilter) -> Invalidation {
        if self.active == filter {
            return Invalidation::NONE;
        }
        self.active = filter;
        if let Some(id) = self.selected.as_deref()
            && !graph.is_visible(id, filter)
        {
            self.selected = None;
        }
        Invalidation::ALL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build;
    use crate::ir::{LayerDecl, NodeDecl};

    fn graph() -> Graph {
        let layers = vec![LayerDecl::new("core", "Core", 0), LayerDecl::new("web", "Web", 1)];
        let nodes = vec![
            NodeDecl::new("numpy", "arrays", "core"),
            NodeDecl::new("pandas", "frames", "core").connect("numpy"),
            NodeDecl::new("django", "framework", "web"),
        ];
        build(&layers, &nodes).unwrap()
    }

    #[test]
    fn starts_on_default_layer_without_selection() {
        let graph = graph();
        let state = SelectionState::initial(&graph);
        assert_eq!(state.selected(), None);
        assert_eq!(state.active_layer(), graph.filter_for_key("core").unwrap());
    }

    #[test]
    fn reselect_keep_is_idempotent() {
        let graph = graph();
        let mut state = SelectionState::initial(&graph);
        assert_eq!(
            state.select_node(&graph, "numpy", ReselectBehavior::Keep),
            Ok(Invalidation::HIGHLIGHT)
        );
        assert_eq!(
            state.select_node(&graph, "numpy", ReselectBehavior::Keep),
            Ok(Invalidation::NONE)
        );
        assert_eq!(state.selected(), Some("numpy"));
    }

    #[test]
    fn reselect_toggle_closes() {
        let graph = graph();
        let mut state = SelectionState::initial(&graph);
        state.select_node(&graph, "numpy", ReselectBehavior::Toggle).unwrap();
        state.select_node(&graph, "numpy", ReselectBehavior::Toggle).unwrap();
        assert_eq!(state.selected(), None);
    }

    #[test]
    fn rejects_unknown_and_hidden_nodes() {
        let graph = graph();
        let mut state = SelectionState::initial(&graph);
        state.select_node(&graph, "numpy", ReselectBehavior::Keep).unwrap();
        assert_eq!(
            state.select_node(&graph, "rails", ReselectBehavior::Keep),
            Err(SelectionError::UnknownNode("rails".to_string()))
        );
        assert_eq!(
            state.select_node(&graph, "django", ReselectBehavior::Keep),
            Err(SelectionError::NotVisible("django".to_string()))
        );
        assert_eq!(state.selected(), Some("numpy"));
    }

    #[test]
    fn switching_layers_clears_hidden_selection() {
        let graph = graph();
        let mut state = SelectionState::initial(&graph);
        state.select_node(&graph, "numpy", ReselectBehavior::Keep).unwrap();
        assert_eq!(state.set_layer(&graph, "web"), Ok(Invalidation::ALL));
        assert_eq!(state.selected(), None);
        assert_eq!(state.set_layer(&graph, "web"), Ok(Invalidation::NONE));
        assert_eq!(
            state.set_layer(&graph, "mobile"),
            Err(SelectionError::UnknownLayer("mobile".to_string()))
        );
    }

    #[test]
    fn switching_to_all_keeps_selection() {
        let graph = graph();
        let mut state = SelectionState::initial(&graph);
        state.select_node(&graph, "pandas", ReselectBehavior::Keep).unwrap();
        state.set_layer(&graph, "all").unwrap();
        assert_eq!(state.selected(), Some("pandas"));
        state.select_node(&graph, "django", ReselectBehavior::Keep).unwrap();
        state.set_layer(&graph, "core").unwrap();
        assert_eq!(state.selected(), None);
    }

    #[test]
    fn clearing_reports_whether_anything_changed() {
        let graph = graph();
        let mut state = SelectionState::initial(&graph);
        assert_eq!(state.clear_selection(), Invalidation::NONE);
        state.select_node(&graph, "numpy", ReselectBehavior::Keep).unwrap();
        assert_eq!(state.clear_selection(), Invalidation::HIGHLIGHT);
    }
}
