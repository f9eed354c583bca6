//! The produced presentation manifest: purely data, no render state.
//! Serialized as JSON for the external presentation writer.

use serde::Serialize;

use reportforge_registry::{ChartKind, ShapeKind};

#[derive(Debug, Clone, Serialize)]
pub struct PresentationManifest {
    pub title: String,
    pub layout: String,
    pub slides: Vec<Slide>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Slide {
    pub name: String,
    pub background: Option<BackgroundSpec>,
    pub images: Vec<ImageSpec>,
    pub shapes: Vec<ShapeSpec>,
    pub text: Vec<TextSpec>,
    pub tables: Vec<TableSpec>,
    pub charts: Vec<ChartSpec>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackgroundSpec {
    pub color: Option<String>,
    pub image: Option<String>,
}

/// Rectangle in inches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageSpec {
    pub path: String,
    pub rect: Rect,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShapeSpec {
    pub kind: ShapeKind,
    pub rect: Rect,
    pub fill: Option<String>,
    pub line: Option<String>,
    pub line_width: Option<f64>,
    pub shadow: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextSpec {
    pub rect: Rect,
    pub runs: Vec<TextRun>,
    pub align: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextRun {
    pub text: String,
    pub font_size: Option<f64>,
    pub color: Option<String>,
    pub bold: bool,
    pub italic: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableSpec {
    pub rect: Rect,
    /// One width per column, in inches; sums to the element width when
    /// computed dynamically.
    pub col_widths: Vec<f64>,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub borders: BorderSpec,
    pub font_size: Option<f64>,
    pub header_fill: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BorderSpec {
    pub outer: bool,
    pub header_separator: bool,
    pub first_column_separator: bool,
    pub inner: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub rect: Rect,
    pub categories: Vec<String>,
    /// Bar/line/pie series; for BAR_LINE these are the bar series.
    pub series: Vec<Series>,
    /// BAR_LINE only: the series rendered as a line.
    pub line_series: Vec<Series>,
    pub secondary_axis: bool,
    pub colors: Vec<String>,
    pub show_legend: bool,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
}
