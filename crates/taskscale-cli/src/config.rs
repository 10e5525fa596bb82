use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use serde::Deserialize;
use taskscale_core::{DataType, Directory, Palette};

static CONFIG: OnceLock<TaskscaleConfig> = OnceLock::new();

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskscaleConfig {
    #[serde(default)]
    pub top_n: Option<usize>,
    #[serde(default)]
    pub colors: ColorsConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColorsConfig {
    #[serde(default)]
    pub markets: HashMap<String, String>,
    #[serde(default)]
    pub products: HashMap<String, String>,
    #[serde(default)]
    pub users: HashMap<String, String>,
}

impl TaskscaleConfig {
    fn config_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os("TASKSCALE_CONFIG") {
            return Some(PathBuf::from(path));
        }
        dirs::home_dir().map(|h| h.join(".taskscale"))
    }

    pub fn load() -> &'static TaskscaleConfig {
        CONFIG.get_or_init(|| {
            Self::config_path()
                .and_then(|path| fs::read_to_string(path).ok())
                .map(|content| Self::parse(&content))
                .unwrap_or_default()
        })
    }

    pub fn parse(content: &str) -> TaskscaleConfig {
        match toml::from_str(content) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("ignoring invalid config: {}", err);
                TaskscaleConfig::default()
            }
        }
    }

    /// Palette seeded from the directory's listing order, with the configured
    /// colors laid over it. Entries with an invalid hex color are skipped.
    pub fn palette(&self, directory: &Directory) -> Palette {
        let mut palette = Palette::for_directory(directory);
        let groups = [
            (DataType::Market, &self.colors.markets),
            (DataType::Product, &self.colors.products),
            (DataType::User, &self.colors.users),
        ];
        for (data_type, colors) in groups {
            for (name, hex) in colors {
                match parse_hex_color(hex) {
                    Some(color) => palette.set(data_type, name, &color),
                    None => tracing::warn!(name = %name, "invalid color '{}' ignored", hex),
                }
            }
        }
        palette
    }
}

/// Canonical `#rrggbb` for a six-digit hex color, with or without `#`.
pub fn parse_hex_color(hex: &str) -> Option<String> {
    let hex = hex.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(format!("#{}", hex.to_lowercase()))
}

/// `(r, g, b)` of a `#rrggbb` color.
pub fn rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = parse_hex_color(hex)?;
    let r = u8::from_str_radix(&hex[1..3], 16).ok()?;
    let g = u8::from_str_radix(&hex[3..5], 16).ok()?;
    let b = u8::from_str_radix(&hex[5..7], 16).ok()?;
    Some((r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskscale_core::color_for;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#FF7F0E"), Some("#ff7f0e".to_string()));
        assert_eq!(parse_hex_color(" 1f77b4 "), Some("#1f77b4".to_string()));
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color("#gggggg"), None);
    }

    #[test]
    fn test_rgb() {
        assert_eq!(rgb("#1f77b4"), Some((0x1f, 0x77, 0xb4)));
        assert_eq!(rgb("nope"), None);
    }

    #[test]
    fn test_parse_config_and_palette() {
        let config = TaskscaleConfig::parse(
            r##"
top_n = 5

[colors.markets]
ro = "#000000"
bg = "not-a-color"

[colors.products]
"marketing casino" = "ABCDEF"
"##,
        );
        assert_eq!(config.top_n, Some(5));

        let palette = config.palette(&Directory::default());
        assert_eq!(palette.color("RO", DataType::Market), "#000000");
        assert_eq!(
            palette.color("BG", DataType::Market),
            color_for("BG", DataType::Market)
        );
        assert_eq!(palette.color("marketing casino", DataType::Product), "#abcdef");
    }

    #[test]
    fn test_invalid_config_falls_back_to_default() {
        let config = TaskscaleConfig::parse("top_n = [");
        assert_eq!(config.top_n, None);
        assert!(config.colors.markets.is_empty());
    }
}
