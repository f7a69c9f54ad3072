use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub background: String,
    pub card_fill: String,
    pub card_border: String,
    pub card_text: String,
    pub muted_text: String,
    pub line_color: String,
    pub highlight_color: String,
    pub selected_border: String,
    pub dimmed_opacity: f32,
    pub tab_fill: String,
    pub tab_text: String,
    pub tab_active_fill: String,
    pub tab_active_text: String,
    pub panel_fill: String,
    pub panel_border: String,
    /// Category accents, cycled by first-appearance category index.
    pub category_colors: Vec<String>,
}

impl Theme {
    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            background: "#FFFFFF".to_string(),
            card_fill: "#F8FAFF".to_string(),
            card_border: "#C7D2E5".to_string(),
            card_text: "#1C2430".to_string(),
            muted_text: "#5B6B85".to_string(),
            line_color: "#7A8AA6".to_string(),
            highlight_color: "#2F6FEB".to_string(),
            selected_border: "#2F6FEB".to_string(),
            dimmed_opacity: 0.35,
            tab_fill: "#EEF2F8".to_string(),
            tab_text: "#1C2430".to_string(),
            tab_active_fill: "#2F6FEB".to_string(),
            tab_active_text: "#FFFFFF".to_string(),
            panel_fill: "#F7FAFF".to_string(),
            panel_border: "#D7E0F0".to_string(),
            category_colors: vec![
                "#4C78A8".to_string(),
                "#F58518".to_string(),
                "#54A24B".to_string(),
                "#B279A2".to_string(),
                "#E45756".to_string(),
                "#72B7B2".to_string(),
            ],
        }
    }

    pub fn dark() -> Self {
        Self {
            background: "#111722".to_string(),
            card_fill: "#1B2433".to_string(),
            card_border: "#33425C".to_string(),
            card_text: "#E6ECF5".to_string(),
            muted_text: "#93A3BD".to_string(),
            line_color: "#5F7191".to_string(),
            highlight_color: "#6EA8FE".to_string(),
            selected_border: "#6EA8FE".to_string(),
            dimmed_opacity: 0.3,
            tab_fill: "#1B2433".to_string(),
            tab_text: "#E6ECF5".to_string(),
            tab_active_fill: "#6EA8FE".to_string(),
            tab_active_text: "#111722".to_string(),
            panel_fill: "#1B2433".to_string(),
            panel_border: "#33425C".to_string(),
            ..Self::modern()
        }
    }

    pub fn category_color(&self, index: usize) -> &str {
        if self.category_colors.is_empty() {
            return self.card_border.as_str();
        }
        self.category_colors[index % self.category_colors.len()].as_str()
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::modern()
    }
}
