//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use crate::Palette;
use crate::board::Token;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// One Dark gem colours: green, yellow, red, blue, magenta, cyan.
const ONEDARK_GEMS: [Color; 6] = [
    Color::Rgb(0x98, 0xC3, 0x79),
    Color::Rgb(0xE5, 0xC0, 0x7B),
    Color::Rgb(0xE0, 0x6C, 0x75),
    Color::Rgb(0x61, 0xAF, 0xEF),
    Color::Rgb(0xC6, 0x78, 0xDD),
    Color::Rgb(0x56, 0xB6, 0xC2),
];

const HIGH_CONTRAST_GEMS: [Color; 6] = [
    Color::Rgb(0x00, 0xFF, 0x00),
    Color::Rgb(0xFF, 0xFF, 0x00),
    Color::Rgb(0xFF, 0x00, 0x00),
    Color::Rgb(0x00, 0x88, 0xFF),
    Color::Rgb(0xFF, 0x00, 0xFF),
    Color::Rgb(0x00, 0xFF, 0xFF),
];

/// Avoids telling gems apart by red/green alone; the glyphs differ as well.
const COLORBLIND_GEMS: [Color; 6] = [
    Color::Rgb(0x00, 0x77, 0xBB),
    Color::Rgb(0xEE, 0x77, 0x33),
    Color::Rgb(0x00, 0x99, 0x88),
    Color::Rgb(0xCC, 0x33, 0x11),
    Color::Rgb(0xEE, 0x33, 0x77),
    Color::Rgb(0xBB, 0xBB, 0x00),
];

const ONEDARK_BG: Color = Color::Rgb(0x31, 0x35, 0x3F);
const ONEDARK_DIV_LINE: Color = Color::Rgb(0x3F, 0x44, 0x4F);
const ONEDARK_MAIN_FG: Color = Color::Rgb(0xAB, 0xB2, 0xBF);
const ONEDARK_TITLE: Color = Color::Rgb(0xE5, 0xC0, 0x7B);
const ONEDARK_INACTIVE_FG: Color = Color::Rgb(0x5C, 0x63, 0x70);

/// Gem palette and UI colours loaded from a theme file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    /// Gem colours, cycled when the alphabet is longer.
    pub gems: [Color; 6],
    /// Board background.
    pub bg: Color,
    /// Borders.
    pub div_line: Color,
    /// Text (score, legend).
    pub main_fg: Color,
    /// Titles, the tutorial hand and the score flash.
    pub title: Color,
    /// Secondary text (controls, phase status).
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark()
    }
}

impl Theme {
    pub const fn onedark() -> Self {
        Self {
            gems: ONEDARK_GEMS,
            bg: ONEDARK_BG,
            div_line: ONEDARK_DIV_LINE,
            main_fg: ONEDARK_MAIN_FG,
            title: ONEDARK_TITLE,
            inactive_fg: ONEDARK_INACTIVE_FG,
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to One Dark if `path` is None or missing; `palette` then
    /// overrides the gem colours.
    pub fn load(path: Option<&Path>, palette: Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) if p.exists() => Self::from_map(&parse_theme_file(&std::fs::read_to_string(p)?)),
            _ => Self::onedark(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    pub fn apply_palette(&mut self, palette: Palette) {
        match palette {
            Palette::Normal => {}
            Palette::HighContrast => self.gems = HIGH_CONTRAST_GEMS,
            Palette::Colorblind => self.gems = COLORBLIND_GEMS,
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).and_then(|v| parse_hex(v).ok());
        // Same keys as onedark.theme.
        Self {
            gems: [
                get("mem_box").or_else(|| get("cpu_start")).unwrap_or(ONEDARK_GEMS[0]),
                get("title").or_else(|| get("cpu_mid")).unwrap_or(ONEDARK_GEMS[1]),
                get("cpu_end").or_else(|| get("temp_end")).unwrap_or(ONEDARK_GEMS[2]),
                get("cpu_box").unwrap_or(ONEDARK_GEMS[3]),
                get("net_box").unwrap_or(ONEDARK_GEMS[4]),
                get("hi_fg").or_else(|| get("proc_misc")).unwrap_or(ONEDARK_GEMS[5]),
            ],
            bg: get("meter_bg").unwrap_or(ONEDARK_BG),
            div_line: get("div_line").unwrap_or(ONEDARK_DIV_LINE),
            main_fg: get("main_fg").unwrap_or(ONEDARK_MAIN_FG),
            title: get("title").unwrap_or(ONEDARK_TITLE),
            inactive_fg: get("inactive_fg").unwrap_or(ONEDARK_INACTIVE_FG),
        }
    }

    #[inline]
    pub fn gem_color(&self, token: Token) -> Color {
        self.gems[token.index() % self.gems.len()]
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines().map(str::trim) {
        if line.starts_with('#') {
            continue;
        }
        let Some((key, rest)) = line.strip_prefix("theme[").and_then(|l| l.split_once(']')) else {
            continue;
        };
        let Some((_, value)) = rest.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').trim_matches('\'');
        if !value.is_empty() {
            map.insert(key.trim().to_string(), value.to_string());
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    if !s.is_ascii() {
        return Err(invalid());
    }
    let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());
    match s.len() {
        6 => Ok(Color::Rgb(channel(&s[0..2])?, channel(&s[2..4])?, channel(&s[4..6])?)),
        3 => Ok(Color::Rgb(
            channel(&s[0..1])? * 17,
            channel(&s[1..2])? * 17,
            channel(&s[2..3])? * 17,
        )),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#98C379").unwrap();
        assert!(matches!(c, Color::Rgb(0x98, 0xC3, 0x79)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
        assert!(parse_hex("#12").is_err());
        assert!(parse_hex("#GG0000").is_err());
    }

    #[test]
    fn test_parse_hex_rejects_non_ascii() {
        // Three bytes each, so byte slicing would split a character.
        assert!(matches!(parse_hex("#€"), Err(ThemeError::InvalidHex(_))));
        assert!(matches!(parse_hex("é12"), Err(ThemeError::InvalidHex(_))));
        assert!(parse_hex("#12345€").is_err());
    }

    #[test]
    fn test_non_ascii_theme_value_falls_back() {
        let map = parse_theme_file("theme[main_fg]=\"€\"");
        assert_eq!(Theme::from_map(&map).main_fg, ONEDARK_MAIN_FG);
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file(r##"theme[meter_bg]="#31353F""##);
        assert_eq!(map.get("meter_bg"), Some(&"#31353F".to_string()));
        let map = parse_theme_file("# theme[bg]=\"#000\"\ntheme[ title ] = '#FFF'");
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("title"), Some(&"#FFF".to_string()));
    }

    #[test]
    fn test_theme_map_overrides_gems() {
        let map = parse_theme_file("theme[cpu_box]=\"#010203\"\ntheme[main_fg]=\"#FFFFFF\"");
        let theme = Theme::from_map(&map);
        assert_eq!(theme.gems[3], Color::Rgb(1, 2, 3));
        assert_eq!(theme.main_fg, Color::Rgb(255, 255, 255));
        assert_eq!(theme.gems[0], ONEDARK_GEMS[0]);
    }

    #[test]
    fn test_missing_file_uses_palette() {
        let theme = Theme::load(Some(Path::new("/nonexistent/gemfall.theme")), Palette::Colorblind)
            .unwrap();
        assert_eq!(theme.gems, COLORBLIND_GEMS);
        assert_eq!(theme.bg, ONEDARK_BG);
    }

    #[test]
    fn test_gem_colors_cycle() {
        let theme = Theme::default();
        assert_eq!(theme.gem_color(Token::new(1)), theme.gem_color(Token::new(7)));
        assert_ne!(theme.gem_color(Token::new(0)), theme.gem_color(Token::new(1)));
    }
}
