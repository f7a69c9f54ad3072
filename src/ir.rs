use serde::{Deserialize, Serialize};
use std::path::Path;

/// Raw diagram document as authored by hand. Nothing here is validated;
/// see [`crate::graph::build`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramSource {
    #[serde(default)]
    pub default_layer: Option<String>,
    pub layers: Vec<LayerDecl>,
    pub nodes: Vec<NodeDecl>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerDecl {
    pub key: String,
    pub label: String,
    pub order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDecl {
    pub id: String,
    pub name: String,
    pub category: String,
    pub layer: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub links: Vec<LinkDecl>,
    #[serde(default)]
    pub connections: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkDecl {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

impl DiagramSource {
    /// Parses JSON5 (and therefore plain JSON).
    pub fn parse(input: &str) -> anyhow::Result<Self> {
        let source: DiagramSource = json5::from_str(input)?;
        Ok(source)
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }
}

impl NodeDecl {
    pub fn new(id: &str, category: &str, layer: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            category: category.to_string(),
            layer: layer.to_string(),
            description: String::new(),
            links: Vec::new(),
            connections: Vec::new(),
        }
    }

    pub fn connect(mut self, other: &str) -> Self {
        self.connections.push(other.to_string());
        self
    }
}

impl LayerDecl {
    pub fn new(key: &str, label: &str, order: i32) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            order,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json5_with_defaults() {
        let input = r#"
        // comments are allowed
        {
          layers: [{ key: "core", label: "Core", order: 0 }],
          nodes: [
            { id: "numpy", name: "NumPy", category: "arrays", layer: "core",
              links: [{ type: "docs", url: "https://numpy.org" }] },
            { id: "pandas", name: "pandas", category: "frames", layer: "core",
              connections: ["numpy"], },
          ],
        }"#;
        let source = DiagramSource::parse(input).unwrap();
        assert_eq!(source.default_layer, None);
        assert_eq!(source.nodes.len(), 2);
        assert_eq!(source.nodes[0].links[0].kind, "docs");
        assert!(source.nodes[0].connections.is_empty());
        assert_eq!(source.nodes[1].connections, vec!["numpy".to_string()]);
        assert_eq!(source.nodes[1].description, "");
    }

    #[test]
    fn rejects_missing_required_fields() {
        let input = r#"{ layers: [], nodes: [{ id: "x" }] }"#;
        assert!(DiagramSource::parse(input).is_err());
    }
}
