use serde::{Deserialize, Serialize};

/// Display format attached to a column or a resolved cell value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueFormat {
    Currency,
    Number,
    Decimal,
    Percentage,
    String,
}

impl ValueFormat {
    /// Numeric formats have thousands separators stripped during
    /// transformation so downstream parsing works.
    pub fn is_numeric(self) -> bool {
        !matches!(self, ValueFormat::String)
    }
}

/// One resolved value inside a table row or a flag card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub field: String,
    pub value: String,
    pub format: ValueFormat,
}

/// Header entry of a table view, in catalog order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableHeader {
    pub field: String,
    pub display_name: String,
    pub format: ValueFormat,
}

/// Shaped output of the transformer for one view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewData {
    FlagCard {
        field: String,
        value: String,
        format: ValueFormat,
    },
    /// Invariant: every row has exactly `headers.len()` cells.
    Table {
        headers: Vec<TableHeader>,
        rows: Vec<Vec<Cell>>,
    },
}

impl ViewData {
    /// The scalar value of a flag card, or the first cell of the first row
    /// for a table. Used by text elements binding a `value_key`.
    pub fn scalar_value(&self) -> Option<(&str, ValueFormat)> {
        match self {
            ViewData::FlagCard { value, format, .. } => Some((value.as_str(), *format)),
            ViewData::Table { rows, .. } => rows
                .first()
                .and_then(|r| r.first())
                .map(|c| (c.value.as_str(), c.format)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_format_serde_uses_screaming_snake_case() {
        let json = serde_json::to_string(&ValueFormat::Percentage).unwrap();
        assert_eq!(json, "\"PERCENTAGE\"");
        let back: ValueFormat = serde_json::from_str("\"CURRENCY\"").unwrap();
        assert_eq!(back, ValueFormat::Currency);
    }

    #[test]
    fn scalar_value_reads_flag_card() {
        let data = ViewData::FlagCard {
            field: "total_spend".to_string(),
            value: "1234567".to_string(),
            format: ValueFormat::Currency,
        };
        assert_eq!(data.scalar_value(), Some(("1234567", ValueFormat::Currency)));
    }

    #[test]
    fn scalar_value_reads_first_table_cell() {
        let data = ViewData::Table {
            headers: vec![TableHeader {
                field: "channel".to_string(),
                display_name: "Channel".to_string(),
                format: ValueFormat::String,
            }],
            rows: vec![vec![Cell {
                field: "channel".to_string(),
                value: "CTV".to_string(),
                format: ValueFormat::String,
            }]],
        };
        assert_eq!(data.scalar_value(), Some(("CTV", ValueFormat::String)));
    }
}
