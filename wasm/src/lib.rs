use serde::Deserialize;
use stackmap::layout::Size;
use stackmap::{Config, DiagramView, RenderOptions, ReselectBehavior, Theme, ViewportMetrics, build_view, render_svg};
use std::collections::BTreeMap;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StackmapOptions {
    theme: Option<String>,
    font_family: Option<String>,
    font_size: Option<f32>,
    fast_text: Option<bool>,
    width: Option<f32>,
    height: Option<f32>,
    layer: Option<String>,
    selected: Option<String>,
    toggle_reselect: Option<bool>,
}

fn parse_options(options_json: Option<String>) -> Result<StackmapOptions, String> {
    match options_json {
        Some(raw) => serde_json::from_str(&raw).map_err(|error| error.to_string()),
        None => Ok(StackmapOptions::default()),
    }
}

fn build_render_options(options: StackmapOptions) -> RenderOptions {
    let mut render_options = if options.theme.as_deref() == Some("dark") {
        RenderOptions::dark()
    } else {
        RenderOptions::modern()
    };
    let config = &mut render_options.config;

    if let Some(font_family) = options.font_family {
        config.theme.font_family = font_family;
    }
    if let Some(font_size) = options.font_size {
        config.theme.font_size = font_size;
    }
    // No system fonts inside the browser sandbox.
    config.layout.fast_text_metrics = options.fast_text.unwrap_or(true);
    if let Some(width) = options.width {
        config.render.width = width;
    }
    if let Some(height) = options.height {
        config.render.height = height;
    }
    if options.toggle_reselect == Some(true) {
        config.interaction.reselect = ReselectBehavior::Toggle;
    }
    render_options.layer = options.layer;
    render_options.selected = options.selected;
    render_options
}

fn js_error(error: impl ToString) -> JsValue {
    JsValue::from_str(&error.to_string())
}

#[wasm_bindgen]
pub struct StackmapDiagram {
    view: DiagramView,
    config: Config,
}

impl StackmapDiagram {
    fn create(source: &str, options: StackmapOptions) -> Result<Self, String> {
        let render_options = build_render_options(options);
        let view = build_view(source, &render_options).map_err(|error| error.to_string())?;
        Ok(Self {
            view,
            config: render_options.config,
        })
    }

    fn theme(&self) -> &Theme {
        &self.config.theme
    }

    fn resize_to(&mut self, metrics: ViewportMetrics) {
        self.config.render.width = metrics.width;
        self.config.render.height = metrics.height;
        self.view.resize(metrics);
    }

    fn resize_measured_from_json(&mut self, width: f32, height: f32, sizes_json: &str) -> Result<(), String> {
        let sizes: BTreeMap<String, Size> = serde_json::from_str(sizes_json).map_err(|error| error.to_string())?;
        self.resize_to(ViewportMetrics::with_measurements(width, height, sizes));
        Ok(())
    }
}

#[wasm_bindgen]
impl StackmapDiagram {
    #[wasm_bindgen(constructor)]
    pub fn new(source: &str, options_json: Option<String>) -> Result<StackmapDiagram, JsValue> {
        let options = parse_options(options_json).map_err(js_error)?;
        Self::create(source, options).map_err(js_error)
    }

    #[wasm_bindgen(js_name = selectNode)]
    pub fn select_node(&mut self, id: &str) -> Result<(), JsValue> {
        self.view.select_node(id).map(|_| ()).map_err(js_error)
    }

    #[wasm_bindgen(js_name = clearSelection)]
    pub fn clear_selection(&mut self) {
        self.view.clear_selection();
    }

    #[wasm_bindgen(js_name = setLayer)]
    pub fn set_layer(&mut self, key: &str) -> Result<(), JsValue> {
        self.view.set_layer(key).map(|_| ()).map_err(js_error)
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.resize_to(ViewportMetrics::unmeasured(width, height));
    }

    /// `sizes_json` maps node id to `{ "width", "height" }` as laid out by
    /// the host; cards missing from it are left out until measured.
    #[wasm_bindgen(js_name = resizeMeasured)]
    pub fn resize_measured(&mut self, width: f32, height: f32, sizes_json: &str) -> Result<(), JsValue> {
        self.resize_measured_from_json(width, height, sizes_json).map_err(js_error)
    }

    #[wasm_bindgen(js_name = selectedNode)]
    pub fn selected_node(&self) -> Option<String> {
        self.view.state().selected().map(str::to_string)
    }

    #[wasm_bindgen(js_name = renderSvg)]
    pub fn render_svg(&self) -> String {
        render_svg(&self.view.frame(), self.view.graph(), self.theme(), &self.config)
    }

    #[wasm_bindgen(js_name = frameJson)]
    pub fn frame_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.view.frame()).map_err(js_error)
    }
}
