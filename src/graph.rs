use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;
use thiserror::Error;

use crate::ir::{DiagramSource, LayerDecl, LinkDecl, NodeDecl};

/// Layer key reserved for the all-layers view.
pub const ALL_LAYERS_KEY: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no layers declared")]
    NoLayers,
    #[error("empty {0} id")]
    EmptyId(&'static str),
    #[error("duplicate node id `{0}`")]
    DuplicateNode(String),
    #[error("duplicate layer key `{0}`")]
    DuplicateLayer(String),
    #[error("layers `{first}` and `{second}` share order {order}")]
    DuplicateLayerOrder {
        first: String,
        second: String,
        order: i32,
    },
    #[error("layer key `{0}` is reserved")]
    ReservedLayerKey(String),
    #[error("node `{node}` references unknown layer `{layer}`")]
    UnknownLayer { node: String, layer: String },
    #[error("default layer `{0}` is not declared")]
    UnknownDefaultLayer(String),
    #[error("node `{node}` connects to unknown node `{target}`")]
    DanglingConnection { node: String, target: String },
    #[error("node `{0}` connects to itself")]
    SelfConnection(String),
}

/// Index into [`Graph::layers`], which is sorted by layer order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct LayerId(pub(crate) usize);

impl LayerId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LayerFilter {
    All,
    Only(LayerId),
}

impl LayerFilter {
    pub fn admits(self, layer: LayerId) -> bool {
        match self {
            LayerFilter::All => true,
            LayerFilter::Only(active) => active == layer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Layer {
    pub key: String,
    pub label: String,
    pub order: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub kind: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    pub id: String,
    pub name: String,
    pub category: String,
    pub layer: LayerId,
    pub description: String,
    pub links: Vec<Link>,
    /// Declared outgoing connections, deduplicated, in declaration order.
    pub connections: Vec<String>,
}

/// Undirected edge with `a < b` lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EdgeKey {
    pub a: String,
    pub b: String,
}

impl EdgeKey {
    pub fn new(x: &str, y: &str) -> Self {
        if x <= y {
            Self {
                a: x.to_string(),
                b: y.to_string(),
            }
        } else {
            Self {
                a: y.to_string(),
                b: x.to_string(),
            }
        }
    }

    pub fn touches(&self, id: &str) -> bool {
        self.a == id || self.b == id
    }
}

#[derive(Debug, Clone)]
pub struct Graph {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    layers: Vec<Layer>,
    adjacency: Vec<BTreeSet<usize>>,
    categories: Vec<String>,
    default_layer: LayerId,
}

pub fn build(layers: &[LayerDecl], nodes: &[NodeDecl]) -> Result<Graph, ValidationError> {
    build_with_default(layers, nodes, None)
}

pub fn build_with_default(
    layer_decls: &[LayerDecl],
    node_decls: &[NodeDecl],
    default_layer: Option<&str>,
) -> Result<Graph, ValidationError> {
    if layer_decls.is_empty() {
        return Err(ValidationError::NoLayers);
    }

    let mut seen_keys = HashSet::new();
    for decl in layer_decls {
        if decl.key.trim().is_empty() {
            return Err(ValidationError::EmptyId("layer"));
        }
        if decl.key == ALL_LAYERS_KEY {
            return Err(ValidationError::ReservedLayerKey(decl.key.clone()));
        }
        if !seen_keys.insert(decl.key.as_str()) {
            return Err(ValidationError::DuplicateLayer(decl.key.clone()));
        }
    }

    let mut sorted: Vec<&LayerDecl> = layer_decls.iter().collect();
    sorted.sort_by_key(|decl| decl.order);
    for pair in sorted.windows(2) {
        if pair[0].order == pair[1].order {
            return Err(ValidationError::DuplicateLayerOrder {
                first: pair[0].key.clone(),
                second: pair[1].key.clone(),
                order: pair[0].order,
            });
        }
    }
    let layers: Vec<Layer> = sorted
        .iter()
        .map(|decl| Layer {
            key: decl.key.clone(),
            label: decl.label.clone(),
            order: decl.order,
        })
        .collect();
    let layer_ids: HashMap<&str, LayerId> = layers
        .iter()
        .enumerate()
        .map(|(idx, layer)| (layer.key.as_str(), LayerId(idx)))
        .collect();

    let default_layer = match default_layer {
        Some(key) => *layer_ids
            .get(key)
            .ok_or_else(|| ValidationError::UnknownDefaultLayer(key.to_string()))?,
        None => LayerId(0),
    };

    let mut index = HashMap::with_capacity(node_decls.len());
    for (idx, decl) in node_decls.iter().enumerate() {
        if decl.id.trim().is_empty() {
            return Err(ValidationError::EmptyId("node"));
        }
        if index.insert(decl.id.clone(), idx).is_some() {
            return Err(ValidationError::DuplicateNode(decl.id.clone()));
        }
    }

    let mut nodes = Vec::with_capacity(node_decls.len());
    let mut adjacency = vec![BTreeSet::new(); node_decls.len()];
    for (idx, decl) in node_decls.iter().enumerate() {
        let layer = *layer_ids
            .get(decl.layer.as_str())
            .ok_or_else(|| ValidationError::UnknownLayer {
                node: decl.id.clone(),
                layer: decl.layer.clone(),
            })?;

        let mut connections: Vec<String> = Vec::with_capacity(decl.connections.len());
        for target in &decl.connections {
            if target == &decl.id {
                return Err(ValidationError::SelfConnection(decl.id.clone()));
            }
            let Some(&other) = index.get(target) else {
                return Err(ValidationError::DanglingConnection {
                    node: decl.id.clone(),
                    target: target.clone(),
                });
            };
            if connections.contains(target) {
                continue;
            }
            connections.push(target.clone());
            adjacency[idx].insert(other);
            adjacency[other].insert(idx);
        }

        nodes.push(Node {
            id: decl.id.clone(),
            name: decl.name.clone(),
            category: decl.category.clone(),
            layer,
            description: decl.description.clone(),
            links: decl.links.iter().map(Link::from).collect(),
            connections,
        });
    }

    let mut categories: Vec<String> = Vec::new();
    for node in &nodes {
        if !categories.contains(&node.category) {
            categories.push(node.category.clone());
        }
    }

    tracing::debug!(
        nodes = nodes.len(),
        layers = layers.len(),
        "graph model built"
    );

    Ok(Graph {
        nodes,
        index,
        layers,
        adjacency,
        categories,
        default_layer,
    })
}

impl From<&LinkDecl> for Link {
    fn from(decl: &LinkDecl) -> Self {
        Self {
            kind: decl.kind.clone(),
            url: decl.url.clone(),
        }
    }
}

impl Graph {
    pub fn from_source(source: &DiagramSource) -> Result<Self, ValidationError> {
        build_with_default(
            &source.layers,
            &source.nodes,
            source.default_layer.as_deref(),
        )
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&idx| &self.nodes[idx])
    }

    /// Layers sorted by `order`.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, id: LayerId) -> &Layer {
        &self.layers[id.index()]
    }

    pub fn layer_ids(&self) -> impl Iterator<Item = LayerId> + '_ {
        (0..self.layers.len()).map(LayerId)
    }

    pub fn layer_by_key(&self, key: &str) -> Option<LayerId> {
        self.layers
            .iter()
            .position(|layer| layer.key == key)
            .map(LayerId)
    }

    /// Categories in order of first appearance across all layers.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn category_index(&self, category: &str) -> Option<usize> {
        self.categories.iter().position(|c| c == category)
    }

    pub fn default_layer(&self) -> LayerId {
        self.default_layer
    }

    pub fn filter_for_key(&self, key: &str) -> Option<LayerFilter> {
        if key == ALL_LAYERS_KEY {
            return Some(LayerFilter::All);
        }
        self.layer_by_key(key).map(LayerFilter::Only)
    }

    pub fn is_visible(&self, id: &str, filter: LayerFilter) -> bool {
        self.node(id).is_some_and(|node| filter.admits(node.layer))
    }

    pub fn nodes_by_layer(&self, layer: LayerId) -> Vec<&Node> {
        self.nodes.iter().filter(|node| node.layer == layer).collect()
    }

    pub fn nodes_in(&self, filter: LayerFilter) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|node| filter.admits(node.layer))
            .collect()
    }

    /// Undirected neighbors, sorted by id.
    pub fn neighbors(&self, id: &str) -> Vec<&str> {
        let Some(&idx) = self.index.get(id) else {
            return Vec::new();
        };
        let mut out: Vec<&str> = self.adjacency[idx]
            .iter()
            .map(|&other| self.nodes[other].id.as_str())
            .collect();
        out.sort_unstable();
        out
    }

    /// Canonical edges with both endpoints in `ids`.
    pub fn edges_among<S: AsRef<str>>(&self, ids: &BTreeSet<S>) -> BTreeSet<EdgeKey> {
        let members: HashSet<&str> = ids.iter().map(|id| id.as_ref()).collect();
        let mut edges = BTreeSet::new();
        for id in &members {
            let Some(&idx) = self.index.get(*id) else {
                continue;
            };
            for &other in &self.adjacency[idx] {
                let other_id = self.nodes[other].id.as_str();
                if members.contains(other_id) {
                    edges.insert(EdgeKey::new(id, other_id));
                }
            }
        }
        edges
    }
}
