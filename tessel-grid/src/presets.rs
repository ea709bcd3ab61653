//! Preset tables: themes, sizes and sample datasets.
//!
//! These are plain data. Colors stay as CSS-style strings here; the render
//! crate parses and validates them when a theme is applied.

use serde::{Deserialize, Serialize};

use crate::error::GridError;

/// A theme as the host hands it over. Every field is optional so a partial
/// theme only overrides what it names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeSpec {
    pub border: Option<String>,
    pub header_bg: Option<String>,
    pub header_text: Option<String>,
    pub cell_bg: Option<String>,
    pub alt_row_bg: Option<String>,
    pub text: Option<String>,
    pub selection: Option<String>,
    pub cursor: Option<String>,
}

impl ThemeSpec {
    pub const NAMES: [&'static str; 3] = ["default", "dark", "green"];

    /// Look up a built-in theme by name.
    pub fn preset(name: &str) -> Result<Self, GridError> {
        let colors = match name {
            "default" => ["#333", "#4a90e2", "#fff", "#fff", "#f8f9fa", "#333", "#007bff"],
            "dark" => ["#555", "#2c3e50", "#ecf0f1", "#34495e", "#2c3e50", "#ecf0f1", "#3498db"],
            "green" => ["#27ae60", "#27ae60", "#fff", "#fff", "#d5f4e6", "#2c3e50", "#27ae60"],
            other => return Err(GridError::UnknownPreset(other.to_string())),
        };
        let [border, header_bg, header_text, cell_bg, alt_row_bg, text, selection] =
            colors.map(|c| Some(c.to_string()));
        Ok(Self {
            border,
            header_bg,
            header_text,
            cell_bg,
            alt_row_bg,
            // The caret follows the text color.
            cursor: text.clone(),
            text,
            selection,
        })
    }
}

/// Cell geometry and font size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizePreset {
    pub cell_width: f32,
    pub cell_height: f32,
    pub header_height: f32,
    pub font_size: f32,
}

impl Default for SizePreset {
    fn default() -> Self {
        Self {
            cell_width: 150.0,
            cell_height: 40.0,
            header_height: 50.0,
            font_size: 14.0,
        }
    }
}

impl SizePreset {
    pub const NAMES: [&'static str; 3] = ["small", "medium", "large"];

    pub fn preset(name: &str) -> Result<Self, GridError> {
        let (cell_width, cell_height, header_height, font_size) = match name {
            "small" => (120.0, 35.0, 45.0, 12.0),
            "medium" => (150.0, 40.0, 50.0, 14.0),
            "large" => (180.0, 50.0, 60.0, 16.0),
            other => return Err(GridError::UnknownPreset(other.to_string())),
        };
        Ok(Self { cell_width, cell_height, header_height, font_size })
    }

    /// Derive row geometry from the viewport height: the header takes 5% of
    /// the height and the rows share the rest. Cell width is kept.
    pub fn fit_viewport(&self, _width: f32, height: f32, rows: usize) -> Self {
        let header_height = height * 0.05;
        let cell_height = (height - header_height) / rows.max(1) as f32;
        let font_size = (cell_height * 0.3).floor().max(10.0);
        Self {
            cell_width: self.cell_width,
            cell_height,
            header_height,
            font_size,
        }
    }
}

/// Headers plus rows of cell text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Dataset {
    pub const NAMES: [&'static str; 3] = ["employees", "products", "sales"];

    pub fn preset(name: &str) -> Result<Self, GridError> {
        let (headers, rows): (&[&str], &[&[&str]]) = match name {
            "employees" => (
                &["ID", "姓名", "年龄", "职位", "部门"],
                &[
                    &["001", "张三", "28", "前端工程师", "技术部"],
                    &["002", "李四", "32", "后端工程师", "技术部"],
                    &["003", "王五", "26", "产品经理", "产品部"],
                    &["004", "赵六", "30", "设计师", "设计部"],
                    &["005", "钱七", "25", "UI设计师", "设计部"],
                    &["006", "孙八", "29", "测试工程师", "技术部"],
                ],
            ),
            "products" => (
                &["产品ID", "产品名称", "价格", "库存", "分类"],
                &[
                    &["P001", "iPhone 15", "¥7999", "50", "手机"],
                    &["P002", "MacBook Pro", "¥12999", "20", "电脑"],
                    &["P003", "iPad Air", "¥4599", "35", "平板"],
                    &["P004", "AirPods Pro", "¥1899", "100", "耳机"],
                    &["P005", "Apple Watch", "¥2999", "60", "手表"],
                ],
            ),
            "sales" => (
                &["日期", "销售额", "订单数", "客户数", "转化率"],
                &[
                    &["2024-01-01", "¥125,000", "45", "38", "84.4%"],
                    &["2024-01-02", "¥98,500", "32", "29", "90.6%"],
                    &["2024-01-03", "¥156,200", "58", "52", "89.7%"],
                    &["2024-01-04", "¥203,800", "71", "65", "91.5%"],
                    &["2024-01-05", "¥187,300", "63", "58", "92.1%"],
                ],
            ),
            other => return Err(GridError::UnknownPreset(other.to_string())),
        };
        Ok(Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|c| c.to_string()).collect())
                .collect(),
        })
    }
}
