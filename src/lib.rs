#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod graph;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod render;
pub mod state;
pub mod text_metrics;
pub mod theme;
pub mod view;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, ConnectorStyle, ReselectBehavior};
pub use graph::{EdgeKey, Graph, LayerFilter, LayerId, ValidationError};
pub use ir::DiagramSource;
pub use layout::{ConnectorPath, ViewportMetrics};
pub use render::render_svg;
pub use state::{Invalidation, SelectionError, SelectionState};
pub use theme::Theme;
pub use view::{DiagramView, Frame};

/// Inputs for a one-shot render of a diagram source.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub config: Config,
    /// Layer key to show; the default layer when absent.
    pub layer: Option<String>,
    pub selected: Option<String>,
}

impl RenderOptions {
    pub fn modern() -> Self {
        Self::default()
    }

    pub fn dark() -> Self {
        let mut options = Self::default();
        options.config.theme = Theme::dark();
        options
    }
}

/// Builds the interactive view for `source` with the requested layer and
/// selection already applied.
pub fn build_view(source: &str, options: &RenderOptions) -> anyhow::Result<DiagramView> {
    let parsed = DiagramSource::parse(source)?;
    let graph = Graph::from_source(&parsed)?;
    let metrics = ViewportMetrics::unmeasured(options.config.render.width, options.config.render.height);
    let mut view = DiagramView::new(graph, &options.config, metrics);
    if let Some(layer) = options.layer.as_deref() {
        view.set_layer(layer)?;
    }
    if let Some(id) = options.selected.as_deref() {
        view.select_node(id)?;
    }
    Ok(view)
}

pub fn render_diagram(source: &str, options: &RenderOptions) -> anyhow::Result<String> {
    let view = build_view(source, options)?;
    Ok(render_svg(
        &view.frame(),
        view.graph(),
        &options.config.theme,
        &options.config,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"{
        layers: [
            { key: "core", label: "Core", order: 0 },
            { key: "web", label: "Web", order: 1 },
        ],
        nodes: [
            { id: "numpy", name: "NumPy", category: "arrays", layer: "core" },
            { id: "pandas", name: "pandas", category: "frames", layer: "core", connections: ["numpy"] },
            { id: "django", name: "Django", category: "framework", layer: "web" },
        ],
    }"#;

    #[test]
    fn render_diagram_applies_layer_and_selection() {
        let mut options = RenderOptions::modern();
        options.config.layout.fast_text_metrics = true;
        options.layer = Some("all".to_string());
        options.selected = Some("django".to_string());
        let svg = render_diagram(SOURCE, &options).unwrap();
        assert!(svg.contains("Django"));
        assert!(svg.contains("NumPy"));
        assert!(svg.contains("detail-panel"));
    }

    #[test]
    fn render_diagram_reports_bad_input() {
        let options = RenderOptions::modern();
        assert!(render_diagram("{ layers: [], nodes: [] }", &options).is_err());
        let mut hidden = RenderOptions::modern();
        hidden.selected = Some("django".to_string());
        let err = render_diagram(SOURCE, &hidden).unwrap_err();
        assert!(err.downcast_ref::<SelectionError>().is_some());
    }
}
