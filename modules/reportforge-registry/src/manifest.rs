//! Serde types for the three manifest files.
//!
//! Field names mirror the JSON manifests (camelCase, `VIEWS`/`FILTERS`
//! sections). The manifests are immutable at runtime.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use reportforge_common::ValueFormat;

/// `usecase-mapping.json` entry: which workbook on which site backs a use case.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UseCaseMeta {
    pub workbook_name: String,
    pub site_name: String,
}

/// `tableau-views.json` entry for one use case.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewCatalog {
    /// Ordered list of views; catalog order drives fetch and output order.
    #[serde(rename = "VIEWS")]
    pub views: Vec<CatalogView>,
    /// Filter bindings: logical filter key → remote parameter name.
    #[serde(rename = "FILTERS")]
    pub filters: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogView {
    #[serde(rename = "viewKey")]
    pub key: String,
    #[serde(flatten)]
    pub config: ViewConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewConfig {
    /// View name as it appears on the remote server.
    pub name: String,
    pub view_type: ViewType,
    #[serde(default)]
    pub filter_keys: Vec<String>,
    /// Ordered column schema.
    pub columns: Vec<ColumnSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ViewType {
    #[serde(rename = "FLAG_CARD")]
    FlagCard,
    #[serde(rename = "TABLE")]
    Table,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSpec {
    pub field_key: String,
    /// Header exactly as it appears in the fetched CSV.
    pub column_name: String,
    pub display_name: String,
    pub format: ValueFormat,
    pub is_needed_for_view: bool,
}

/// `slide-view-mapping.json` entry for one use case.
#[derive(Debug, Clone, Deserialize)]
pub struct SlideSet {
    pub title: String,
    #[serde(default = "default_layout")]
    pub layout: String,
    pub slides: Vec<SlideDescriptor>,
}

fn default_layout() -> String {
    "LAYOUT_WIDE".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlideDescriptor {
    pub name: String,
    #[serde(default)]
    pub background: Option<Background>,
    #[serde(default)]
    pub elements: Vec<ElementDescriptor>,
}

impl SlideDescriptor {
    /// Every view key this slide binds data from, for startup validation.
    pub fn referenced_view_keys(&self) -> Vec<&str> {
        let mut keys = Vec::new();
        for element in &self.elements {
            match element {
                ElementDescriptor::Table { data_key, .. }
                | ElementDescriptor::Chart { data_key, .. } => keys.push(data_key.as_str()),
                ElementDescriptor::Text { segments, .. } => {
                    for segment in segments {
                        if let Some(key) = &segment.value_key {
                            keys.push(key.as_str());
                        }
                    }
                }
                _ => {}
            }
        }
        keys
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Background {
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Declarative slide element. Positions are in centimetres; the assembly
/// engine converts to inches.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ElementDescriptor {
    #[serde(rename = "IMAGE")]
    Image { path: String, position: Position },

    #[serde(rename = "SHAPE", rename_all = "camelCase")]
    Shape {
        shape: ShapeKind,
        position: Position,
        #[serde(default)]
        options: ShapeOptions,
    },

    #[serde(rename = "TEXT", rename_all = "camelCase")]
    Text {
        position: Position,
        /// Either a single literal string…
        #[serde(default)]
        text: Option<String>,
        /// …or a sequence of segments, possibly data-bound.
        #[serde(default)]
        segments: Vec<TextSegment>,
        #[serde(default)]
        options: TextOptions,
    },

    #[serde(rename = "TABLE", rename_all = "camelCase")]
    Table {
        data_key: String,
        position: Position,
        #[serde(default)]
        options: TableOptions,
    },

    #[serde(rename = "CHART", rename_all = "camelCase")]
    Chart {
        chart_type: ChartKind,
        data_key: String,
        position: Position,
        #[serde(default)]
        options: ChartOptions,
    },
}

/// Rectangle in centimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShapeKind {
    Line,
    Rectangle,
    Circle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartKind {
    #[serde(rename = "BAR")]
    Bar,
    #[serde(rename = "LINE")]
    Line,
    #[serde(rename = "PIE")]
    Pie,
    #[serde(rename = "BAR_LINE")]
    BarLine,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSegment {
    #[serde(default)]
    pub text: Option<String>,
    /// Resolve the segment text from `view_data[value_key]`.
    #[serde(default)]
    pub value_key: Option<String>,
    /// Literal used when the bound view data is missing.
    #[serde(default)]
    pub fallback: Option<String>,
    #[serde(default)]
    pub options: TextOptions,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextOptions {
    #[serde(default)]
    pub font_size: Option<f64>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub align: Option<String>,
    #[serde(default)]
    pub bold: Option<bool>,
    #[serde(default)]
    pub italic: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeOptions {
    #[serde(default)]
    pub fill: Option<String>,
    #[serde(default)]
    pub line: Option<String>,
    #[serde(default)]
    pub line_width: Option<f64>,
    #[serde(default)]
    pub shadow: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableOptions {
    /// Explicit column widths in centimetres. When absent, widths are
    /// computed from content and scaled to the element width.
    #[serde(default)]
    pub col_widths: Option<Vec<f64>>,
    #[serde(default)]
    pub font_size: Option<f64>,
    #[serde(default)]
    pub header_fill: Option<String>,
    #[serde(default)]
    pub borders: BorderRules,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorderRules {
    #[serde(default = "default_true")]
    pub outer: bool,
    #[serde(default = "default_true")]
    pub header_separator: bool,
    #[serde(default)]
    pub first_column_separator: bool,
    #[serde(default)]
    pub inner: bool,
}

impl Default for BorderRules {
    fn default() -> Self {
        Self {
            outer: true,
            header_separator: true,
            first_column_separator: false,
            inner: false,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartOptions {
    /// For BAR_LINE: field keys rendered as the line series.
    #[serde(default)]
    pub line_fields: Vec<String>,
    /// For BAR_LINE: put the line series on a secondary value axis.
    #[serde(default)]
    pub secondary_axis: bool,
    #[serde(default)]
    pub series_colors: Vec<String>,
    #[serde(default = "default_true")]
    pub show_legend: bool,
    #[serde(default)]
    pub title: Option<String>,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            line_fields: Vec::new(),
            secondary_axis: false,
            series_colors: Vec::new(),
            show_legend: true,
            title: None,
        }
    }
}
