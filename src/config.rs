use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectorStyle {
    Orthogonal,
    Curved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReselectBehavior {
    /// Clicking the selected node again leaves it selected.
    Keep,
    /// Clicking the selected node again clears the selection.
    Toggle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub cell_width: f32,
    pub cell_height: f32,
    pub gutter_x: f32,
    pub gutter_y: f32,
    pub margin: f32,
    pub tab_bar_height: f32,
    /// Vertical gap between layer bands in the all-layers view.
    pub band_gap: f32,
    /// Category columns per wrap block.
    pub max_columns: usize,
    pub connector_style: ConnectorStyle,
    pub bend_radius: f32,
    pub curve_offset: f32,
    /// Length of the straight run leaving an anchor before the first bend.
    pub port_stub: f32,
    pub fast_text_metrics: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            cell_width: 180.0,
            cell_height: 72.0,
            gutter_x: 56.0,
            gutter_y: 40.0,
            margin: 24.0,
            tab_bar_height: 44.0,
            band_gap: 32.0,
            max_columns: 5,
            connector_style: ConnectorStyle::Orthogonal,
            bend_radius: 10.0,
            curve_offset: 48.0,
            port_stub: 14.0,
            fast_text_metrics: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub show_all_tab: bool,
    pub show_detail_panel: bool,
    pub detail_panel_height: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            show_all_tab: true,
            show_detail_panel: true,
            detail_panel_height: 132.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionConfig {
    pub reselect: ReselectBehavior,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            reselect: ReselectBehavior::Keep,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
    pub interaction: InteractionConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutSection>,
    render: Option<RenderSection>,
    interaction: Option<InteractionSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    background: Option<String>,
    card_fill: Option<String>,
    card_border: Option<String>,
    card_text: Option<String>,
    muted_text: Option<String>,
    line_color: Option<String>,
    highlight_color: Option<String>,
    selected_border: Option<String>,
    tab_active_fill: Option<String>,
    tab_active_text: Option<String>,
    category_colors: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutSection {
    cell_width: Option<f32>,
    cell_height: Option<f32>,
    gutter_x: Option<f32>,
    gutter_y: Option<f32>,
    margin: Option<f32>,
    tab_bar_height: Option<f32>,
    band_gap: Option<f32>,
    max_columns: Option<usize>,
    connector_style: Option<ConnectorStyle>,
    bend_radius: Option<f32>,
    curve_offset: Option<f32>,
    port_stub: Option<f32>,
    fast_text_metrics: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderSection {
    width: Option<f32>,
    height: Option<f32>,
    show_all_tab: Option<bool>,
    show_detail_panel: Option<bool>,
    detail_panel_height: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InteractionSection {
    reselect: Option<ReselectBehavior>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = serde_json::from_str(contents)?;
    let mut config = Config::default();

    if let Some(theme_name) = parsed.theme.as_deref() {
        config.theme = match theme_name {
            "modern" | "default" | "light" => Theme::modern(),
            "dark" => Theme::dark(),
            other => return Err(anyhow::anyhow!("Unknown theme `{other}`")),
        };
    }

    if let Some(vars) = parsed.theme_variables {
        let theme = &mut config.theme;
        if let Some(v) = vars.font_family {
            theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            theme.font_size = v;
        }
        if let Some(v) = vars.background {
            theme.background = v;
        }
        if let Some(v) = vars.card_fill {
            theme.card_fill = v;
        }
        if let Some(v) = vars.card_border {
            theme.card_border = v;
        }
        if let Some(v) = vars.card_text {
            theme.card_text = v;
        }
        if let Some(v) = vars.muted_text {
            theme.muted_text = v;
        }
        if let Some(v) = vars.line_color {
            theme.line_color = v;
        }
        if let Some(v) = vars.highlight_color {
            theme.highlight_color = v;
        }
        if let Some(v) = vars.selected_border {
            theme.selected_border = v;
        }
        if let Some(v) = vars.tab_active_fill {
            theme.tab_active_fill = v;
        }
        if let Some(v) = vars.tab_active_text {
            theme.tab_active_text = v;
        }
        if let Some(v) = vars.category_colors
            && !v.is_empty()
        {
            theme.category_colors = v;
        }
    }

    if let Some(layout) = parsed.layout {
        let target = &mut config.layout;
        if let Some(v) = layout.cell_width {
            target.cell_width = v.max(1.0);
        }
        if let Some(v) = layout.cell_height {
            target.cell_height = v.max(1.0);
        }
        if let Some(v) = layout.gutter_x {
            target.gutter_x = v.max(0.0);
        }
        if let Some(v) = layout.gutter_y {
            target.gutter_y = v.max(0.0);
        }
        if let Some(v) = layout.margin {
            target.margin = v.max(0.0);
        }
        if let Some(v) = layout.tab_bar_height {
            target.tab_bar_height = v.max(0.0);
        }
        if let Some(v) = layout.band_gap {
            target.band_gap = v.max(0.0);
        }
        if let Some(v) = layout.max_columns {
            target.max_columns = v.max(1);
        }
        if let Some(v) = layout.connector_style {
            target.connector_style = v;
        }
        if let Some(v) = layout.bend_radius {
            target.bend_radius = v.max(0.0);
        }
        if let Some(v) = layout.curve_offset {
            target.curve_offset = v.max(0.0);
        }
        if let Some(v) = layout.port_stub {
            target.port_stub = v.max(0.0);
        }
        if let Some(v) = layout.fast_text_metrics {
            target.fast_text_metrics = v;
        }
    }

    if let Some(render) = parsed.render {
        let target = &mut config.render;
        if let Some(v) = render.width {
            target.width = v;
        }
        if let Some(v) = render.height {
            target.height = v;
        }
        if let Some(v) = render.show_all_tab {
            target.show_all_tab = v;
        }
        if let Some(v) = render.show_detail_panel {
            target.show_detail_panel = v;
        }
        if let Some(v) = render.detail_panel_height {
            target.detail_panel_height = v.max(0.0);
        }
    }

    if let Some(interaction) = parsed.interaction
        && let Some(v) = interaction.reselect
    {
        config.interaction.reselect = v;
    }

    Ok(config)
}
