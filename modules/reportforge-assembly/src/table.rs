//! Table element construction: formatted cells and column sizing.

use reportforge_common::{Cell, TableHeader};
use reportforge_registry::TableOptions;

use crate::format::format_value;
use crate::manifest::{BorderSpec, Rect, TableSpec};
use crate::palette::resolve_color;
use crate::to_inches;

pub(crate) fn build_table(
    headers: &[TableHeader],
    rows: &[Vec<Cell>],
    rect: Rect,
    options: &TableOptions,
) -> TableSpec {
    let header: Vec<String> = headers.iter().map(|h| h.display_name.clone()).collect();
    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| format_value(&cell.value, cell.format))
                .collect()
        })
        .collect();

    let col_widths = match &options.col_widths {
        Some(explicit) => explicit.iter().map(|w| to_inches(*w)).collect(),
        None => fit_columns(&header, &body, rect.w),
    };

    TableSpec {
        rect,
        col_widths,
        header,
        rows: body,
        borders: BorderSpec {
            outer: options.borders.outer,
            header_separator: options.borders.header_separator,
            first_column_separator: options.borders.first_column_separator,
            inner: options.borders.inner,
        },
        font_size: options.font_size,
        header_fill: options.header_fill.as_deref().map(resolve_color),
    }
}

/// Size each column to its widest cell (header included), scaled so the
/// widths sum to the element width.
pub(crate) fn fit_columns(header: &[String], rows: &[Vec<String>], total_width: f64) -> Vec<f64> {
    if header.is_empty() {
        return Vec::new();
    }

    let mut max_len: Vec<usize> = header.iter().map(|h| h.chars().count().max(1)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < max_len.len() {
                max_len[i] = max_len[i].max(cell.chars().count().max(1));
            }
        }
    }

    let sum: usize = max_len.iter().sum();
    max_len
        .iter()
        .map(|len| total_width * (*len as f64) / (sum as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computed_widths_sum_to_total() {
        let header = vec!["Channel".to_string(), "Spend ($)".to_string()];
        let rows = vec![
            vec!["CTV".to_string(), "$10,000".to_string()],
            vec!["Display".to_string(), "$2,000".to_string()],
        ];
        let widths = fit_columns(&header, &rows, 8.0);
        assert_eq!(widths.len(), 2);
        let sum: f64 = widths.iter().sum();
        assert!((sum - 8.0).abs() < 1e-9);
    }

    #[test]
    fn wider_content_gets_wider_columns() {
        let header = vec!["A".to_string(), "B".to_string()];
        let rows = vec![vec!["x".to_string(), "a much longer cell".to_string()]];
        let widths = fit_columns(&header, &rows, 10.0);
        assert!(widths[1] > widths[0]);
    }

    #[test]
    fn empty_header_yields_no_widths() {
        assert!(fit_columns(&[], &[], 10.0).is_empty());
    }
}
