use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const BUILTIN_THEMES: &[(&str, &str)] = &[
    ("classic", include_str!("../themes/classic.toml")),
    ("slate", include_str!("../themes/slate.toml")),
];

const OFFSET_TOP: f32 = 32.0;
const OFFSET_LEFT: f32 = 8.0;
const BLOCK_RADIUS: f32 = 3.0;
const BLOCK_TITLE_HEIGHT: f32 = 24.0;
const CELL_WIDTH: f32 = 16.0;
const CELL_HEIGHT: f32 = 16.0;
const CELL_PADDING: f32 = 2.0;
const USE_WIDTH: f32 = 5.0;
const ARROW_WIDTH: f32 = 5.0;
const LISTING_FONT_SIZE: f32 = 12.0;
const LISTING_LINE_HEIGHT: f32 = 16.0;

/// Colors, keyed by what they paint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub default: String,
    pub text: String,
    pub background: Option<String>,
    pub arrow: String,
    pub highlight_interval: String,
    pub highlight_output: String,
    pub highlight_input: String,
    pub highlight_tmp: String,
    pub block_fill: String,
    pub block_title: String,
    pub interval_empty: String,
    pub interval_normal: String,
    pub interval_physical: String,
    pub use_any: String,
    pub use_register: String,
    pub use_fixed: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            default: "black".to_string(),
            text: "black".to_string(),
            background: None,
            arrow: "rgba(0,0,0,0.6)".to_string(),
            highlight_interval: "#16DDD7".to_string(),
            highlight_output: "#A40B04".to_string(),
            highlight_input: "#0CF471".to_string(),
            highlight_tmp: "#601D61".to_string(),
            block_fill: "#4CBFCB".to_string(),
            block_title: "black".to_string(),
            interval_empty: "#A4EEE8".to_string(),
            interval_normal: "#FBA42B".to_string(),
            interval_physical: "#FD6218".to_string(),
            use_any: "#F6E575".to_string(),
            use_register: "#BCDD70".to_string(),
            use_fixed: "#FD6218".to_string(),
        }
    }
}

/// Spacing constants of the diagram, in SVG user units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Spacing {
    pub offset_top: f32,
    pub offset_left: f32,
    pub block_radius: f32,
    pub block_title_height: f32,
    pub cell_width: f32,
    pub cell_height: f32,
    /// Gap reserved at the right edge of the last cell in a run
    pub cell_padding_x: f32,
    pub cell_padding_y: f32,
    pub use_width: f32,
    pub arrow_width: f32,
    pub listing_font_size: f32,
    pub listing_line_height: f32,
    pub font_family: String,
}

impl Default for Spacing {
    fn default() -> Self {
        Self {
            offset_top: OFFSET_TOP,
            offset_left: OFFSET_LEFT,
            block_radius: BLOCK_RADIUS,
            block_title_height: BLOCK_TITLE_HEIGHT,
            cell_width: CELL_WIDTH,
            cell_height: CELL_HEIGHT,
            cell_padding_x: CELL_PADDING,
            cell_padding_y: CELL_PADDING,
            use_width: USE_WIDTH,
            arrow_width: ARROW_WIDTH,
            listing_font_size: LISTING_FONT_SIZE,
            listing_line_height: LISTING_LINE_HEIGHT,
            font_family: "Raleway, sans-serif".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub palette: Palette,
    pub spacing: Spacing,
}

impl Theme {
    pub fn from_builtin(name: &str) -> Result<Self> {
        let normalized = name.trim().to_ascii_lowercase().replace('-', "_");
        let content = BUILTIN_THEMES
            .iter()
            .find(|(n, _)| *n == normalized)
            .map(|(_, c)| *c)
            .ok_or_else(|| {
                Error::Theme(format!(
                    "Unknown built-in theme '{}'. Available: {}",
                    name,
                    Self::list_builtins().join(", ")
                ))
            })?;
        Self::from_toml(content)
    }

    pub fn list_builtins() -> Vec<&'static str> {
        BUILTIN_THEMES.iter().map(|(n, _)| *n).collect()
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let theme: Theme = serde_yaml::from_str(content)
            .map_err(|e| Error::Theme(format!("Failed to parse theme YAML: {}", e)))?;
        theme.checked()
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let theme: Theme = toml::from_str(content)
            .map_err(|e| Error::Theme(format!("Failed to parse theme TOML: {}", e)))?;
        theme.checked()
    }

    /// Try TOML first, then YAML.
    pub fn from_config(content: &str) -> Result<Self> {
        Self::from_toml(content).or_else(|toml_err| {
            Self::from_yaml(content).map_err(|_| toml_err)
        })
    }

    /// Color of a named category, falling back to the palette default.
    pub fn color(&self, name: &str) -> &str {
        let p = &self.palette;
        match name {
            "arrow" => &p.arrow,
            "text" => &p.text,
            "highlight:interval" => &p.highlight_interval,
            "highlight:output" => &p.highlight_output,
            "highlight:input" => &p.highlight_input,
            "highlight:tmp" => &p.highlight_tmp,
            "block:fill" => &p.block_fill,
            "block:title" => &p.block_title,
            "interval:empty" => &p.interval_empty,
            "interval:normal" => &p.interval_normal,
            "interval:physical" => &p.interval_physical,
            "use:any" => &p.use_any,
            "use:register" => &p.use_register,
            "use:fixed" => &p.use_fixed,
            _ => &p.default,
        }
    }

    fn checked(self) -> Result<Self> {
        let s = &self.spacing;
        let lengths = [
            ("cell_width", s.cell_width),
            ("cell_height", s.cell_height),
            ("block_title_height", s.block_title_height),
            ("listing_line_height", s.listing_line_height),
            ("listing_font_size", s.listing_font_size),
        ];
        for (name, value) in lengths {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::Theme(format!("{} must be positive, got {}", name, value)));
            }
        }
        if s.cell_padding_x < 0.0 || s.cell_padding_x >= s.cell_width {
            return Err(Error::Theme(format!(
                "cell_padding_x must lie in [0, cell_width), got {}",
                s.cell_padding_x
            )));
        }
        if s.cell_padding_y < 0.0 || s.cell_padding_y >= s.cell_height {
            return Err(Error::Theme(format!(
                "cell_padding_y must lie in [0, cell_height), got {}",
                s.cell_padding_y
            )));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::Theme;

    #[test]
    fn from_builtin_accepts_hyphenated_and_case_insensitive_names() {
        let classic = Theme::from_builtin("classic").expect("classic");
        let upper = Theme::from_builtin("Classic").expect("case-insensitive");
        assert_eq!(classic, upper);
        assert!(Theme::from_builtin("no-such-theme").is_err());
    }

    #[test]
    fn classic_matches_defaults() {
        assert_eq!(Theme::from_builtin("classic").unwrap(), Theme::default());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let theme = Theme::from_config("spacing:\n  cell_width: 20.0\n").unwrap();
        assert_eq!(theme.spacing.cell_width, 20.0);
        assert_eq!(theme.spacing.cell_height, 16.0);
        assert_eq!(theme.palette.block_fill, "#4CBFCB");
    }

    #[test]
    fn rejects_padding_wider_than_cell() {
        let err = Theme::from_toml("[spacing]\ncell_width = 4.0\ncell_padding_x = 4.0\n");
        assert!(err.is_err());
    }

    #[test]
    fn unknown_color_falls_back_to_default() {
        let theme = Theme::default();
        assert_eq!(theme.color("use:fixed"), "#FD6218");
        assert_eq!(theme.color("nonsense"), "black");
    }
}
