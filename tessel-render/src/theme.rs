//! Parsed theme colors.

use tessel_grid::ThemeSpec;

use crate::error::{ConfigError, RenderError};
use crate::primitives::Color;

/// Alpha applied to the selection color for the edited cell's highlight.
pub const HIGHLIGHT_ALPHA: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
    pub border: Color,
    pub header_bg: Color,
    pub header_text: Color,
    pub cell_bg: Color,
    pub alt_row_bg: Color,
    pub text: Color,
    pub selection: Color,
    pub cursor: Color,
}

impl Default for Theme {
    fn default() -> Self {
        let text = Color::rgb8(0x33, 0x33, 0x33);
        Self {
            border: Color::rgb8(0x33, 0x33, 0x33),
            header_bg: Color::rgb8(0x4a, 0x90, 0xe2),
            header_text: Color::WHITE,
            cell_bg: Color::WHITE,
            alt_row_bg: Color::rgb8(0xf8, 0xf9, 0xfa),
            text,
            selection: Color::rgb8(0x00, 0x7b, 0xff),
            cursor: text,
        }
    }
}

impl Theme {
    /// Resolve a built-in theme by name.
    pub fn preset(name: &str) -> Result<Self, RenderError> {
        let spec = ThemeSpec::preset(name)?;
        let mut theme = Self::default();
        if let Some(err) = theme.apply_spec(&spec).into_iter().next() {
            return Err(err.into());
        }
        Ok(theme)
    }

    /// Build from a spec over the default theme, failing on the first bad
    /// color.
    pub fn from_spec(spec: &ThemeSpec) -> Result<Self, ConfigError> {
        let mut theme = Self::default();
        match theme.apply_spec(spec).into_iter().next() {
            Some(err) => Err(err),
            None => Ok(theme),
        }
    }

    /// Apply every field `spec` sets. Fields that fail to parse are left
    /// unchanged and reported; the others still apply.
    pub fn apply_spec(&mut self, spec: &ThemeSpec) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let fields: [(&'static str, &Option<String>, &mut Color); 8] = [
            ("border", &spec.border, &mut self.border),
            ("header_bg", &spec.header_bg, &mut self.header_bg),
            ("header_text", &spec.header_text, &mut self.header_text),
            ("cell_bg", &spec.cell_bg, &mut self.cell_bg),
            ("alt_row_bg", &spec.alt_row_bg, &mut self.alt_row_bg),
            ("text", &spec.text, &mut self.text),
            ("selection", &spec.selection, &mut self.selection),
            ("cursor", &spec.cursor, &mut self.cursor),
        ];
        for (field, value, slot) in fields {
            let Some(value) = value else { continue };
            match Color::parse(value) {
                Some(color) => *slot = color,
                None => {
                    tracing::warn!("rejected theme field {}: {:?}", field, value);
                    errors.push(ConfigError::InvalidColor {
                        field,
                        value: value.clone(),
                    });
                }
            }
        }
        errors
    }

    /// Fill for data row `row`, alternating from the first row.
    #[inline]
    pub fn row_fill(&self, row: usize) -> Color {
        if row % 2 == 0 { self.cell_bg } else { self.alt_row_bg }
    }

    #[inline]
    pub fn highlight(&self) -> Color {
        self.selection.with_alpha(HIGHLIGHT_ALPHA)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_preset_matches_default() {
        assert_eq!(Theme::preset("default").unwrap(), Theme::default());
    }

    #[test]
    fn dark_preset() {
        let dark = Theme::preset("dark").unwrap();
        assert_eq!(dark.cell_bg.to_rgba8(), [0x34, 0x49, 0x5e, 255]);
        assert_eq!(dark.cursor, dark.text);
    }

    #[test]
    fn unknown_preset_is_grid_error() {
        assert!(matches!(Theme::preset("neon"), Err(RenderError::Grid(_))));
    }

    #[test]
    fn bad_fields_are_rejected_individually() {
        let mut theme = Theme::default();
        let spec = ThemeSpec {
            border: Some("#000".into()),
            text: Some("not-a-color".into()),
            ..ThemeSpec::default()
        };
        let errors = theme.apply_spec(&spec);
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], ConfigError::InvalidColor { field: "text", .. }));
        assert_eq!(theme.border, Color::BLACK);
        assert_eq!(theme.text, Theme::default().text);
    }

    #[test]
    fn highlight_and_rows() {
        let theme = Theme::default();
        assert_eq!(theme.highlight().to_rgba8(), [0, 123, 255, 26]);
        assert_eq!(theme.row_fill(0), theme.cell_bg);
        assert_eq!(theme.row_fill(3), theme.alt_row_bg);
    }
}
