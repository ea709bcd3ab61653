//! Engine configuration.
//!
//! Everything has a default, so an empty JSON object is a valid config and
//! a file only needs to name what it overrides.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tessel_grid::{SizePreset, ThemeSpec};

use crate::atlas::{AtlasConfig, MAX_ATLAS_BYTES, MAX_FONT_SIZE};
use crate::error::ConfigError;
use crate::scheduler::SchedulerConfig;
use crate::theme::Theme;

/// Optional behaviours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    /// Shift+Enter inserts a newline and pasted newlines are kept.
    pub multiline_edit: bool,
    /// Clicks start an expanding ripple on the edit layer.
    pub click_effect: bool,
    /// Characters outside the static charset are added to the atlas.
    pub dynamic_glyph_growth: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            multiline_edit: true,
            click_effect: false,
            dynamic_glyph_growth: true,
        }
    }
}

/// Host-side picker a column is routed to instead of in-cell editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickerKind {
    Date,
    Number,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub viewport_width: f32,
    pub viewport_height: f32,
    pub rows: usize,
    pub cols: usize,
    pub size: SizePreset,
    pub theme: ThemeSpec,
    /// TTF/OTF file for glyphs. Without one, box glyphs are drawn.
    pub font_path: Option<PathBuf>,
    pub capabilities: Capabilities,
    pub scheduler: SchedulerConfig,
    pub atlas: AtlasConfig,
    /// Draw ops per batch.
    pub render_batch_size: usize,
    /// Batches executed per composite call before yielding.
    pub batches_per_frame: usize,
    pub picker_columns: BTreeMap<usize, PickerKind>,
    /// Derive row height and font size from the viewport height.
    pub fit_to_viewport: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            viewport_width: 1600.0,
            viewport_height: 900.0,
            rows: tessel_grid::DEFAULT_ROWS,
            cols: tessel_grid::DEFAULT_COLS,
            size: SizePreset::default(),
            theme: ThemeSpec::default(),
            font_path: None,
            capabilities: Capabilities::default(),
            scheduler: SchedulerConfig::default(),
            atlas: AtlasConfig::default(),
            render_batch_size: 50,
            batches_per_frame: 20,
            picker_columns: BTreeMap::from([(2, PickerKind::Number), (6, PickerKind::Date)]),
            fit_to_viewport: false,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Ops a single composite call may execute.
    pub fn op_budget(&self) -> usize {
        self.render_batch_size.saturating_mul(self.batches_per_frame).max(1)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |field: &'static str, value: f32| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("must be a positive number, got {value}"),
                })
            }
        };
        let nonzero = |field: &'static str, value: usize| {
            if value > 0 {
                Ok(())
            } else {
                Err(ConfigError::InvalidValue {
                    field,
                    reason: "must be at least 1".into(),
                })
            }
        };

        positive("viewport_width", self.viewport_width)?;
        positive("viewport_height", self.viewport_height)?;
        positive("size.cell_width", self.size.cell_width)?;
        positive("size.cell_height", self.size.cell_height)?;
        positive("size.font_size", self.size.font_size)?;
        if !(self.size.header_height.is_finite() && self.size.header_height >= 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "size.header_height",
                reason: "must not be negative".into(),
            });
        }
        nonzero("rows", self.rows)?;
        nonzero("cols", self.cols)?;
        nonzero("atlas.chars_per_row", self.atlas.chars_per_row as usize)?;
        // Fitting to the viewport can raise the font size up to the cap.
        let atlas_bytes = self.atlas.surface_bytes(MAX_FONT_SIZE);
        if atlas_bytes > MAX_ATLAS_BYTES {
            return Err(ConfigError::InvalidValue {
                field: "atlas",
                reason: format!("needs {atlas_bytes} bytes at font size {MAX_FONT_SIZE}, limit is {MAX_ATLAS_BYTES}"),
            });
        }
        nonzero("render_batch_size", self.render_batch_size)?;
        nonzero("batches_per_frame", self.batches_per_frame)?;
        self.scheduler.validate()?;
        Theme::from_spec(&self.theme)?;
        Ok(())
    }
}
