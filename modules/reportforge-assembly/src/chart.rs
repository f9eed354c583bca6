//! Chart element construction: category axis + numeric series extraction.

use reportforge_common::{Cell, TableHeader};
use reportforge_registry::{ChartKind, ChartOptions};

use crate::format::parse_number;
use crate::manifest::{ChartSpec, Rect, Series};
use crate::palette::resolve_color;

/// Convert table rows into a chart. The first column is the category axis;
/// every numeric-format column after it becomes a series. For BAR_LINE the
/// series named in `line_fields` are rendered as the line, the rest as bars.
pub(crate) fn build_chart(
    kind: ChartKind,
    headers: &[TableHeader],
    rows: &[Vec<Cell>],
    rect: Rect,
    options: &ChartOptions,
) -> ChartSpec {
    let categories: Vec<String> = rows
        .iter()
        .filter_map(|row| row.first().map(|c| c.value.clone()))
        .collect();

    let mut all_series: Vec<(String, Series)> = Vec::new();
    for (idx, header) in headers.iter().enumerate().skip(1) {
        if !header.format.is_numeric() {
            continue;
        }
        let values: Vec<f64> = rows
            .iter()
            .map(|row| {
                row.get(idx)
                    .and_then(|c| parse_number(&c.value))
                    .unwrap_or(0.0)
            })
            .collect();
        all_series.push((
            header.field.clone(),
            Series {
                name: header.display_name.clone(),
                values,
            },
        ));
    }

    let (series, line_series) = match kind {
        ChartKind::BarLine => {
            let (line, bar): (Vec<_>, Vec<_>) = all_series
                .into_iter()
                .partition(|(field, _)| options.line_fields.contains(field));
            (
                bar.into_iter().map(|(_, s)| s).collect(),
                line.into_iter().map(|(_, s)| s).collect(),
            )
        }
        // Pie charts carry a single series.
        ChartKind::Pie => (
            all_series.into_iter().map(|(_, s)| s).take(1).collect(),
            Vec::new(),
        ),
        _ => (
            all_series.into_iter().map(|(_, s)| s).collect(),
            Vec::new(),
        ),
    };

    ChartSpec {
        kind,
        rect,
        categories,
        series,
        line_series,
        secondary_axis: options.secondary_axis,
        colors: options.series_colors.iter().map(|c| resolve_color(c)).collect(),
        show_legend: options.show_legend,
        title: options.title.clone(),
    }
}
