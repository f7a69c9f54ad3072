use crate::config::{Config, RenderConfig};
use crate::graph::{Graph, LayerFilter, Node};
use crate::layout::{ConnectorPath, Rect};
use crate::text_metrics::{fit_text, text_width, wrap_text};
use crate::theme::Theme;
use crate::view::Frame;
use anyhow::Result;
use std::collections::HashSet;
use std::path::Path;

const TAB_PAD_X: f32 = 14.0;
const TAB_GAP: f32 = 6.0;
const CARD_PAD_X: f32 = 14.0;
const ACCENT_WIDTH: f32 = 4.0;
const PANEL_MAX_DESCRIPTION_LINES: usize = 3;
const PANEL_MAX_LINKS: usize = 3;

pub fn render_svg(frame: &Frame<'_>, graph: &Graph, theme: &Theme, config: &Config) -> String {
    let panel_node = frame
        .selected
        .filter(|_| config.render.show_detail_panel)
        .and_then(|id| graph.node(id));
    let width = frame.width.max(200.0);
    let mut height = frame.height.max(120.0);
    if panel_node.is_some() {
        height += config.render.detail_panel_height + config.layout.margin;
    }

    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));

    render_tabs(&mut svg, frame.active, graph, theme, config);

    // Highlighted connectors go last so they sit on top.
    svg.push_str("<g class=\"connectors\">");
    for connector in frame.connectors.iter().filter(|c| !c.highlighted) {
        render_connector(&mut svg, connector, theme);
    }
    for connector in frame.connectors.iter().filter(|c| c.highlighted) {
        render_connector(&mut svg, connector, theme);
    }
    svg.push_str("</g>");

    let emphasized: Option<HashSet<&str>> = frame.selected.map(|id| {
        let mut set: HashSet<&str> = graph.neighbors(id).into_iter().collect();
        set.insert(id);
        set
    });

    svg.push_str("<g class=\"cards\">");
    for (id, rect) in &frame.cards {
        let Some(node) = graph.node(id) else {
            continue;
        };
        let dimmed = emphasized.as_ref().is_some_and(|set| !set.contains(id));
        let selected = frame.selected == Some(*id);
        render_card(&mut svg, node, rect, graph, theme, config, selected, dimmed);
    }
    svg.push_str("</g>");

    if let Some(node) = panel_node {
        let y = frame.height;
        let rect = Rect {
            x: config.layout.margin,
            y,
            width: (width - config.layout.margin * 2.0).max(0.0),
            height: config.render.detail_panel_height,
        };
        render_detail_panel(&mut svg, node, &rect, graph, theme, config);
    }

    svg.push_str("</svg>");
    svg
}

fn render_tabs(svg: &mut String, active: LayerFilter, graph: &Graph, theme: &Theme, config: &Config) {
    let mut tabs: Vec<(String, bool)> = graph
        .layer_ids()
        .map(|id| (graph.layer(id).label.clone(), active == LayerFilter::Only(id)))
        .collect();
    if config.render.show_all_tab {
        tabs.push(("All".to_string(), active == LayerFilter::All));
    }
    let height = (config.layout.tab_bar_height - 10.0).max(0.0);
    if height <= 0.0 {
        return;
    }
    let fast = config.layout.fast_text_metrics;
    let y = config.layout.margin;
    let mut x = config.layout.margin;
    svg.push_str("<g class=\"tabs\">");
    for (label, is_active) in tabs {
        let label_width = text_width(&label, theme.font_size, &theme.font_family, fast);
        let tab_width = label_width + TAB_PAD_X * 2.0;
        let (fill, text) = if is_active {
            (&theme.tab_active_fill, &theme.tab_active_text)
        } else {
            (&theme.tab_fill, &theme.tab_text)
        };
        svg.push_str(&format!(
            "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{tab_width:.2}\" height=\"{height:.2}\" rx=\"{:.2}\" ry=\"{:.2}\" fill=\"{fill}\"/>",
            height / 2.0,
            height / 2.0,
        ));
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" dominant-baseline=\"central\" font-family=\"{}\" font-size=\"{}\" font-weight=\"{}\" fill=\"{text}\">{}</text>",
            x + tab_width / 2.0,
            y + height / 2.0,
            theme.font_family,
            theme.font_size,
            if is_active { 600 } else { 400 },
            escape_xml(&label)
        ));
        x += tab_width + TAB_GAP;
    }
    svg.push_str("</g>");
}

fn render_connector(svg: &mut String, connector: &ConnectorPath, theme: &Theme) {
    let (stroke, stroke_width) = if connector.highlighted {
        (&theme.highlight_color, 2.4)
    } else {
        (&theme.line_color, 1.4)
    };
    svg.push_str(&format!(
        "<path d=\"{}\" fill=\"none\" stroke=\"{stroke}\" stroke-width=\"{stroke_width}\" stroke-linecap=\"round\" data-from=\"{}\" data-to=\"{}\"/>",
        connector.svg_path_data(),
        escape_xml(&connector.key.a),
        escape_xml(&connector.key.b),
    ));
}

#[allow(clippy::too_many_arguments)]
fn render_card(
    svg: &mut String,
    node: &Node,
    rect: &Rect,
    graph: &Graph,
    theme: &Theme,
    config: &Config,
    selected: bool,
    dimmed: bool,
) {
    let fast = config.layout.fast_text_metrics;
    let accent = theme.category_color(graph.category_index(&node.category).unwrap_or(0));
    let opacity = if dimmed { theme.dimmed_opacity } else { 1.0 };
    let (border, border_width) = if selected {
        (theme.selected_border.as_str(), 2.4)
    } else {
        (theme.card_border.as_str(), 1.2)
    };

    svg.push_str(&format!(
        "<g data-id=\"{}\" opacity=\"{opacity}\">",
        escape_xml(&node.id)
    ));
    svg.push_str(&format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"8\" ry=\"8\" fill=\"{}\" stroke=\"{border}\" stroke-width=\"{border_width}\"/>",
        rect.x, rect.y, rect.width, rect.height, theme.card_fill
    ));
    svg.push_str(&format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{ACCENT_WIDTH}\" height=\"{:.2}\" fill=\"{accent}\"/>",
        rect.x,
        rect.y + 8.0,
        (rect.height - 16.0).max(0.0)
    ));

    let text_x = rect.x + CARD_PAD_X;
    let max_text = (rect.width - CARD_PAD_X * 2.0).max(0.0);
    let name_size = theme.font_size + 2.0;
    let caption_size = (theme.font_size - 2.0).max(1.0);
    let (_, cy) = rect.center();
    let name = fit_text(&node.name, max_text, name_size, &theme.font_family, fast);
    let caption = fit_text(&node.category, max_text, caption_size, &theme.font_family, fast);
    svg.push_str(&format!(
        "<text x=\"{text_x:.2}\" y=\"{:.2}\" font-family=\"{}\" font-size=\"{name_size}\" font-weight=\"600\" fill=\"{}\">{}</text>",
        cy - 2.0,
        theme.font_family,
        theme.card_text,
        escape_xml(&name)
    ));
    svg.push_str(&format!(
        "<text x=\"{text_x:.2}\" y=\"{:.2}\" font-family=\"{}\" font-size=\"{caption_size}\" fill=\"{accent}\">{}</text>",
        cy + caption_size + 2.0,
        theme.font_family,
        escape_xml(&caption)
    ));
    svg.push_str("</g>");
}

fn render_detail_panel(svg: &mut String, node: &Node, rect: &Rect, graph: &Graph, theme: &Theme, config: &Config) {
    let fast = config.layout.fast_text_metrics;
    let pad = 16.0;
    let max_text = (rect.width - pad * 2.0).max(0.0);
    let line_height = theme.font_size * 1.4;

    svg.push_str("<g class=\"detail-panel\">");
    svg.push_str(&format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"10\" ry=\"10\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1\"/>",
        rect.x, rect.y, rect.width, rect.height, theme.panel_fill, theme.panel_border
    ));

    let x = rect.x + pad;
    let mut y = rect.y + pad + theme.font_size;
    svg.push_str(&format!(
        "<text x=\"{x:.2}\" y=\"{y:.2}\" font-family=\"{}\" font-size=\"{}\" font-weight=\"600\" fill=\"{}\">{}</text>",
        theme.font_family,
        theme.font_size + 3.0,
        theme.card_text,
        escape_xml(&node.name)
    ));
    y += line_height;
    let subtitle = format!("{} \u{00b7} {}", graph.layer(node.layer).label, node.category);
    svg.push_str(&format!(
        "<text x=\"{x:.2}\" y=\"{y:.2}\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
        theme.font_family,
        theme.font_size,
        theme.muted_text,
        escape_xml(&subtitle)
    ));

    if !node.description.trim().is_empty() {
        for line in wrap_text(&node.description, max_text, theme.font_size, &theme.font_family, fast)
            .into_iter()
            .take(PANEL_MAX_DESCRIPTION_LINES)
        {
            y += line_height;
            svg.push_str(&format!(
                "<text x=\"{x:.2}\" y=\"{y:.2}\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
                theme.font_family,
                theme.font_size,
                theme.card_text,
                escape_xml(&line)
            ));
        }
    }

    let mut link_x = x;
    let link_y = rect.bottom() - pad;
    for link in node.links.iter().take(PANEL_MAX_LINKS) {
        let label = format!("{} \u{2197}", link.kind);
        svg.push_str(&format!(
            "<a href=\"{}\"><text x=\"{link_x:.2}\" y=\"{link_y:.2}\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text></a>",
            escape_xml(&link.url),
            theme.font_family,
            theme.font_size,
            theme.highlight_color,
            escape_xml(&label)
        ));
        link_x += text_width(&label, theme.font_size, &theme.font_family, fast) + 18.0;
    }
    svg.push_str("</g>");
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig, theme: &Theme) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = theme
        .font_family
        .split(',')
        .next()
        .map(|family| family.trim().trim_matches('"').to_string())
        .unwrap_or_else(|| "sans-serif".to_string());
    opt.fontdb_mut().load_system_fonts();
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .ok_or_else(|| anyhow::anyhow!("Invalid render size {}x{}", render_cfg.width, render_cfg.height))?;

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

#[cfg(not(feature = "png"))]
pub fn write_output_png(_svg: &str, _output: &Path, _render_cfg: &RenderConfig, _theme: &Theme) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build;
    use crate::ir::{LayerDecl, LinkDecl, NodeDecl};
    use crate::layout::ViewportMetrics;
    use crate::view::DiagramView;

    fn view() -> DiagramView {
        let layers = vec![LayerDecl::new("core", "Core & Data", 0), LayerDecl::new("web", "Web", 1)];
        let mut numpy = NodeDecl::new("numpy", "arrays", "core");
        numpy.name = "NumPy".to_string();
        numpy.description = "Fundamental package for array computing.".to_string();
        numpy.links.push(LinkDecl {
            kind: "docs".to_string(),
            url: "https://numpy.org/doc/?a=1&b=2".to_string(),
        });
        let nodes = vec![
            numpy,
            NodeDecl::new("pandas", "frames", "core").connect("numpy"),
            NodeDecl::new("polars", "frames", "core"),
            NodeDecl::new("django", "framework", "web"),
        ];
        let graph = build(&layers, &nodes).unwrap();
        let mut config = Config::default();
        config.layout.fast_text_metrics = true;
        DiagramView::new(graph, &config, ViewportMetrics::unmeasured(800.0, 600.0))
    }

    fn render(view: &DiagramView) -> String {
        let mut config = Config::default();
        config.layout.fast_text_metrics = true;
        render_svg(&view.frame(), view.graph(), &Theme::modern(), &config)
    }

    #[test]
    fn render_svg_basic() {
        let view = view();
        let svg = render(&view);
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("NumPy"));
        assert!(svg.contains("Core &amp; Data"));
        assert!(svg.contains(">All</text>"));
        assert!(!svg.contains("django"));
        assert_eq!(svg.matches("<path ").count(), 1);
        assert!(!svg.contains("detail-panel"));
    }

    #[test]
    fn selection_adds_panel_and_dims_unrelated_cards() {
        let mut view = view();
        view.select_node("numpy").unwrap();
        let svg = render(&view);
        assert!(svg.contains("detail-panel"));
        assert!(svg.contains("Fundamental package"));
        assert!(svg.contains("https://numpy.org/doc/?a=1&amp;b=2"));
        assert!(svg.contains(&format!("data-id=\"polars\" opacity=\"{}\"", Theme::modern().dimmed_opacity)));
        assert!(svg.contains("data-id=\"pandas\" opacity=\"1\""));
        assert!(svg.contains(&Theme::modern().highlight_color));
    }

    #[test]
    fn escape_xml_handles_markup() {
        assert_eq!(escape_xml("<a & 'b'>"), "&lt;a &amp; &apos;b&apos;&gt;");
    }
}
