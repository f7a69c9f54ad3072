use crate::graph::{ALL_LAYERS_KEY, EdgeKey, LayerFilter};
use crate::layout::{Anchor, PathCommand, RouteKind};
use crate::view::{DiagramView, PipelineStats};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub active_layer: String,
    pub selected: Option<String>,
    pub width: f32,
    pub height: f32,
    pub nodes: Vec<NodeDump>,
    pub connectors: Vec<ConnectorDump>,
    pub stats: PipelineStats,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub layer: String,
    pub category: String,
    pub row: usize,
    pub column: usize,
    pub band: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub anchors: Vec<Anchor>,
}

#[derive(Debug, Serialize)]
pub struct ConnectorDump {
    pub key: EdgeKey,
    pub kind: RouteKind,
    pub highlighted: bool,
    pub points: Vec<[f32; 2]>,
    pub commands: Vec<PathCommand>,
    pub d: String,
}

impl LayoutDump {
    pub fn from_view(view: &DiagramView) -> Self {
        let graph = view.graph();
        let frame = view.frame();
        let active_layer = match view.state().active_layer() {
            LayerFilter::All => ALL_LAYERS_KEY.to_string(),
            LayerFilter::Only(id) => graph.layer(id).key.clone(),
        };

        let nodes = view
            .slots()
            .values()
            .filter_map(|slot| {
                let node = graph.node(&slot.node_id)?;
                let geometry = view.geometry().get(&slot.node_id)?;
                Some(NodeDump {
                    id: node.id.clone(),
                    layer: graph.layer(node.layer).key.clone(),
                    category: node.category.clone(),
                    row: slot.row,
                    column: slot.column,
                    band: slot.band,
                    x: geometry.rect.x,
                    y: geometry.rect.y,
                    width: geometry.rect.width,
                    height: geometry.rect.height,
                    anchors: geometry.anchors.clone(),
                })
            })
            .collect();

        let connectors = view
            .connectors()
            .iter()
            .map(|connector| ConnectorDump {
                key: connector.key.clone(),
                kind: connector.kind,
                highlighted: connector.highlighted,
                points: connector.points.iter().map(|p| [p.0, p.1]).collect(),
                commands: connector.commands.clone(),
                d: connector.svg_path_data(),
            })
            .collect();

        LayoutDump {
            active_layer,
            selected: frame.selected.map(str::to_string),
            width: frame.width,
            height: frame.height,
            nodes,
            connectors,
            stats: view.stats(),
        }
    }
}

pub fn write_layout_dump(path: &Path, view: &DiagramView) -> anyhow::Result<()> {
    let dump = LayoutDump::from_view(view);
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
