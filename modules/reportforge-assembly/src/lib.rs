//! Report-assembly engine.
//!
//! Walks a use case's slide manifest, binds view data into text, table, and
//! chart elements, and emits a [`PresentationManifest`] — a declarative tree
//! the external presentation writer serializes to bytes. Missing bindings
//! degrade per element: the slide still emits, the element is dropped with a
//! warning.

mod chart;
pub mod format;
pub mod manifest;
pub mod palette;
mod table;

use std::collections::HashMap;

use reportforge_common::ViewData;
use reportforge_registry::{
    ElementDescriptor, Position, SlideDescriptor, SlideSet, TextOptions, TextSegment,
};

pub use format::format_value;
pub use manifest::{
    BackgroundSpec, BorderSpec, ChartSpec, ImageSpec, PresentationManifest, Rect, Series,
    ShapeSpec, Slide, TableSpec, TextRun, TextSpec,
};

const CM_PER_INCH: f64 = 2.54;

/// Convert manifest centimetres to presentation inches.
pub fn to_inches(cm: f64) -> f64 {
    cm / CM_PER_INCH
}

fn rect_from(position: &Position) -> Rect {
    Rect {
        x: to_inches(position.x),
        y: to_inches(position.y),
        w: to_inches(position.w),
        h: to_inches(position.h),
    }
}

/// Assemble the presentation manifest for one use case.
pub fn assemble(slide_set: &SlideSet, view_data: &HashMap<String, ViewData>) -> PresentationManifest {
    let slides = slide_set
        .slides
        .iter()
        .map(|descriptor| build_slide(descriptor, view_data))
        .collect();

    PresentationManifest {
        title: slide_set.title.clone(),
        layout: slide_set.layout.clone(),
        slides,
    }
}

fn build_slide(descriptor: &SlideDescriptor, view_data: &HashMap<String, ViewData>) -> Slide {
    let mut slide = Slide {
        name: descriptor.name.clone(),
        background: descriptor.background.as_ref().map(|b| BackgroundSpec {
            color: b.color.as_deref().map(palette::resolve_color),
            image: b.image.clone(),
        }),
        ..Default::default()
    };

    for element in &descriptor.elements {
        match element {
            ElementDescriptor::Image { path, position } => {
                slide.images.push(ImageSpec {
                    path: path.clone(),
                    rect: rect_from(position),
                });
            }

            ElementDescriptor::Shape {
                shape,
                position,
                options,
            } => {
                slide.shapes.push(ShapeSpec {
                    kind: *shape,
                    rect: rect_from(position),
                    fill: options.fill.as_deref().map(palette::resolve_color),
                    line: options.line.as_deref().map(palette::resolve_color),
                    line_width: options.line_width,
                    shadow: options.shadow,
                });
            }

            ElementDescriptor::Text {
                position,
                text,
                segments,
                options,
            } => {
                match build_text(position, text.as_deref(), segments, options, view_data) {
                    Some(spec) => slide.text.push(spec),
                    None => {
                        tracing::warn!(
                            slide = %descriptor.name,
                            "Dropping text element with unresolved binding"
                        );
                    }
                }
            }

            ElementDescriptor::Table {
                data_key,
                position,
                options,
            } => match view_data.get(data_key) {
                Some(ViewData::Table { headers, rows }) => {
                    slide.tables.push(table::build_table(
                        headers,
                        rows,
                        rect_from(position),
                        options,
                    ));
                }
                Some(_) => {
                    tracing::warn!(
                        slide = %descriptor.name,
                        data_key,
                        "Table element bound to non-table view data, skipping"
                    );
                }
                None => {
                    tracing::warn!(
                        slide = %descriptor.name,
                        data_key,
                        "No view data for table element, skipping"
                    );
                }
            },

            ElementDescriptor::Chart {
                chart_type,
                data_key,
                position,
                options,
            } => match view_data.get(data_key) {
                Some(ViewData::Table { headers, rows }) => {
                    slide.charts.push(chart::build_chart(
                        *chart_type,
                        headers,
                        rows,
                        rect_from(position),
                        options,
                    ));
                }
                Some(_) => {
                    tracing::warn!(
                        slide = %descriptor.name,
                        data_key,
                        "Chart element bound to non-table view data, skipping"
                    );
                }
                None => {
                    tracing::warn!(
                        slide = %descriptor.name,
                        data_key,
                        "No view data for chart element, skipping"
                    );
                }
            },
        }
    }

    slide
}

/// Build a text element from a literal or a segment sequence. Returns `None`
/// when a data-bound segment has no view data and no fallback.
fn build_text(
    position: &Position,
    literal: Option<&str>,
    segments: &[TextSegment],
    options: &TextOptions,
    view_data: &HashMap<String, ViewData>,
) -> Option<TextSpec> {
    let mut runs = Vec::new();

    if let Some(text) = literal {
        runs.push(make_run(text.to_string(), options, options));
    }

    for segment in segments {
        let text = if let Some(text) = &segment.text {
            text.clone()
        } else if let Some(key) = &segment.value_key {
            match view_data.get(key).and_then(|data| data.scalar_value()) {
                Some((value, format)) => format_value(value, format),
                None => match &segment.fallback {
                    Some(fallback) => fallback.clone(),
                    None => return None,
                },
            }
        } else {
            continue;
        };
        runs.push(make_run(text, &segment.options, options));
    }

    if runs.is_empty() {
        return None;
    }

    Some(TextSpec {
        rect: rect_from(position),
        runs,
        align: options.align.as_deref().map(|a| palette::resolve_align(a).to_string()),
    })
}

/// Segment options override element-level options per field.
fn make_run(text: String, own: &TextOptions, base: &TextOptions) -> TextRun {
    TextRun {
        text,
        font_size: own.font_size.or(base.font_size),
        color: own
            .color
            .as_deref()
            .or(base.color.as_deref())
            .map(palette::resolve_color),
        bold: own.bold.or(base.bold).unwrap_or(false),
        italic: own.italic.or(base.italic).unwrap_or(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reportforge_common::{Cell, TableHeader, ValueFormat};
    use reportforge_registry::SlideSet;

    fn slide_set(raw: &str) -> SlideSet {
        serde_json::from_str(raw).unwrap()
    }

    fn channel_table() -> ViewData {
        ViewData::Table {
            headers: vec![
                TableHeader {
                    field: "channel".to_string(),
                    display_name: "Channel".to_string(),
                    format: ValueFormat::String,
                },
                TableHeader {
                    field: "spend".to_string(),
                    display_name: "Spend ($)".to_string(),
                    format: ValueFormat::Currency,
                },
            ],
            rows: vec![
                vec![
                    Cell {
                        field: "channel".to_string(),
                        value: "CTV".to_string(),
                        format: ValueFormat::String,
                    },
                    Cell {
                        field: "spend".to_string(),
                        value: "1234567".to_string(),
                        format: ValueFormat::Currency,
                    },
                ],
            ],
        }
    }

    #[test]
    fn centimetres_convert_to_inches() {
        assert!((to_inches(2.54) - 1.0).abs() < 1e-12);
        assert!((to_inches(25.4) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn assemble_binds_table_and_formats_cells() {
        let set = slide_set(
            r#"{
              "title": "Political Snapshot",
              "layout": "LAYOUT_WIDE",
              "slides": [
                {
                  "name": "overview",
                  "background": { "color": "WHITE" },
                  "elements": [
                    { "type": "TABLE", "dataKey": "CHANNEL_DATA",
                      "position": { "x": 2.54, "y": 2.54, "w": 25.4, "h": 12.7 } }
                  ]
                }
              ]
            }"#,
        );
        let mut data = HashMap::new();
        data.insert("CHANNEL_DATA".to_string(), channel_table());

        let manifest = assemble(&set, &data);
        assert_eq!(manifest.title, "Political Snapshot");
        assert_eq!(manifest.slides.len(), 1);

        let table = &manifest.slides[0].tables[0];
        assert_eq!(table.header, vec!["Channel", "Spend ($)"]);
        // Every row matches the header width.
        for row in &table.rows {
            assert_eq!(row.len(), table.header.len());
        }
        // Normalized value is re-grouped for display.
        assert_eq!(table.rows[0][1], "$1,234,567");
        assert!((table.rect.w - 10.0).abs() < 1e-9);
    }

    #[test]
    fn missing_data_key_drops_element_but_keeps_slide() {
        let set = slide_set(
            r#"{
              "title": "T",
              "layout": "LAYOUT_WIDE",
              "slides": [
                {
                  "name": "s",
                  "background": { "color": "WHITE" },
                  "elements": [
                    { "type": "TABLE", "dataKey": "GHOST",
                      "position": { "x": 0, "y": 0, "w": 10, "h": 10 } }
                  ]
                }
              ]
            }"#,
        );
        let manifest = assemble(&set, &HashMap::new());
        assert_eq!(manifest.slides.len(), 1);
        assert!(manifest.slides[0].tables.is_empty());
        assert!(manifest.slides[0].background.is_some());
    }

    #[test]
    fn text_segment_resolves_value_key() {
        let set = slide_set(
            r#"{
              "title": "T",
              "layout": "LAYOUT_WIDE",
              "slides": [
                {
                  "name": "s",
                  "elements": [
                    { "type": "TEXT", "position": { "x": 0, "y": 0, "w": 10, "h": 2 },
                      "options": { "fontSize": 18, "bold": true },
                      "segments": [
                        { "text": "Total: " },
                        { "valueKey": "TOTAL_SPEND" }
                      ] }
                  ]
                }
              ]
            }"#,
        );
        let mut data = HashMap::new();
        data.insert(
            "TOTAL_SPEND".to_string(),
            ViewData::FlagCard {
                field: "total_spend".to_string(),
                value: "1234567".to_string(),
                format: ValueFormat::Currency,
            },
        );
        let manifest = assemble(&set, &data);
        let text = &manifest.slides[0].text[0];
        assert_eq!(text.runs.len(), 2);
        assert_eq!(text.runs[0].text, "Total: ");
        assert_eq!(text.runs[1].text, "$1,234,567");
        // Element options flow into both runs.
        assert!(text.runs[0].bold);
        assert_eq!(text.runs[1].font_size, Some(18.0));
    }

    #[test]
    fn text_segment_without_data_uses_fallback() {
        let set = slide_set(
            r#"{
              "title": "T",
              "layout": "LAYOUT_WIDE",
              "slides": [
                {
                  "name": "s",
                  "elements": [
                    { "type": "TEXT", "position": { "x": 0, "y": 0, "w": 10, "h": 2 },
                      "segments": [ { "valueKey": "GHOST", "fallback": "-" } ] }
                  ]
                }
              ]
            }"#,
        );
        let manifest = assemble(&set, &HashMap::new());
        assert_eq!(manifest.slides[0].text[0].runs[0].text, "-");
    }

    #[test]
    fn text_segment_without_data_or_fallback_drops_element() {
        let set = slide_set(
            r#"{
              "title": "T",
              "layout": "LAYOUT_WIDE",
              "slides": [
                {
                  "name": "s",
                  "elements": [
                    { "type": "TEXT", "position": { "x": 0, "y": 0, "w": 10, "h": 2 },
                      "segments": [ { "valueKey": "GHOST" } ] }
                  ]
                }
              ]
            }"#,
        );
        let manifest = assemble(&set, &HashMap::new());
        assert!(manifest.slides[0].text.is_empty());
    }

    #[test]
    fn chart_element_binds_table_rows() {
        let set = slide_set(
            r#"{
              "title": "T",
              "layout": "LAYOUT_WIDE",
              "slides": [
                {
                  "name": "s",
                  "elements": [
                    { "type": "CHART", "chartType": "BAR", "dataKey": "CHANNEL_DATA",
                      "position": { "x": 0, "y": 0, "w": 20, "h": 10 } }
                  ]
                }
              ]
            }"#,
        );
        let mut data = HashMap::new();
        data.insert("CHANNEL_DATA".to_string(), channel_table());
        let manifest = assemble(&set, &data);
        let chart = &manifest.slides[0].charts[0];
        assert_eq!(chart.categories, vec!["CTV"]);
        assert_eq!(chart.series[0].values, vec![1234567.0]);
    }
}
