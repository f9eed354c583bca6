//! Declarative CSV → view-data transformation.
//!
//! `build_view_requests` binds a use case's catalog to the filters of one
//! job; `transform` projects a fetched CSV payload through the view's column
//! schema into a [`ViewData`] value. Both follow catalog order and are
//! deterministic for identical inputs.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use reportforge_common::{Cell, TableHeader, ValueFormat, ViewData};
use reportforge_registry::{ColumnSpec, Registry, ViewType};
use tableau_client::ViewFetchSpec;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error(transparent)]
    Registry(#[from] reportforge_registry::RegistryError),

    #[error("View config missing for {0}")]
    ViewConfigMissing(String),

    #[error("CSV parse error in view {view_key}: {source}")]
    Csv {
        view_key: String,
        #[source]
        source: csv::Error,
    },
}

pub type Result<T> = std::result::Result<T, TransformError>;

#[derive(Clone)]
pub struct Transformer {
    registry: Arc<Registry>,
}

impl Transformer {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Enumerate the views of a use case with their filter parameters bound
    /// to the job's filter values, in catalog order. Filter keys without a
    /// value in `filters` are omitted; filters without a catalog binding are
    /// ignored with a warning.
    pub fn build_view_requests(
        &self,
        use_case: &str,
        filters: &HashMap<String, String>,
    ) -> Result<Vec<ViewFetchSpec>> {
        let catalog = self.registry.view_catalog(use_case)?;

        for key in filters.keys() {
            if !catalog.filters.contains_key(key) {
                tracing::warn!(use_case, filter = %key, "Ignoring filter with no binding");
            }
        }

        let specs = catalog
            .views
            .iter()
            .map(|view| {
                let filter_params = view
                    .config
                    .filter_keys
                    .iter()
                    .filter_map(|key| {
                        let param = catalog.filters.get(key)?;
                        let value = filters.get(key)?;
                        Some((param.clone(), value.clone()))
                    })
                    .collect();
                ViewFetchSpec {
                    view_key: view.key.clone(),
                    view_name: view.config.name.clone(),
                    filter_params,
                }
            })
            .collect();
        Ok(specs)
    }

    /// Shape one fetched CSV payload into the view's [`ViewData`]. Returns
    /// `None` when the payload has no usable rows.
    pub fn transform(&self, use_case: &str, view_key: &str, raw: &str) -> Result<Option<ViewData>> {
        let catalog = self.registry.view_catalog(use_case)?;
        let view = catalog
            .views
            .iter()
            .find(|v| v.key == view_key)
            .ok_or_else(|| TransformError::ViewConfigMissing(view_key.to_string()))?;

        let needed: Vec<&ColumnSpec> = view
            .config
            .columns
            .iter()
            .filter(|c| c.is_needed_for_view)
            .collect();

        let rows = project_rows(view_key, &needed, raw)?;
        if rows.is_empty() {
            return Ok(None);
        }

        match view.config.view_type {
            ViewType::FlagCard => {
                let first = &rows[0];
                let spec = needed[0];
                let value = first
                    .iter()
                    .find(|c| c.field == spec.field_key)
                    .map(|c| c.value.clone())
                    .unwrap_or_default();
                Ok(Some(ViewData::FlagCard {
                    field: spec.field_key.clone(),
                    value,
                    format: spec.format,
                }))
            }
            ViewType::Table => {
                let headers: Vec<TableHeader> = rows[0]
                    .iter()
                    .map(|cell| {
                        let spec = needed
                            .iter()
                            .find(|c| c.field_key == cell.field)
                            .expect("cell fields come from the needed schema");
                        TableHeader {
                            field: spec.field_key.clone(),
                            display_name: spec.display_name.clone(),
                            format: spec.format,
                        }
                    })
                    .collect();
                Ok(Some(ViewData::Table { headers, rows }))
            }
        }
    }

    /// Shape every fetched view; individual failures are logged and excluded.
    /// The result may be empty — the orchestrator treats empty-on-non-empty
    /// input as fatal.
    pub fn transform_all(
        &self,
        use_case: &str,
        raw_map: &HashMap<String, String>,
    ) -> HashMap<String, ViewData> {
        let mut shaped = HashMap::new();
        for (view_key, raw) in raw_map {
            match self.transform(use_case, view_key, raw) {
                Ok(Some(data)) => {
                    shaped.insert(view_key.clone(), data);
                }
                Ok(None) => {
                    tracing::warn!(use_case, view_key, "View payload had no usable rows");
                }
                Err(e) => {
                    tracing::warn!(use_case, view_key, error = %e, "Transform failed, skipping view");
                }
            }
        }
        shaped
    }
}

/// Parse the CSV and project each record through the needed columns, in
/// schema order. Columns missing from the payload are logged and skipped;
/// rows whose every cell is empty are dropped.
fn project_rows(
    view_key: &str,
    needed: &[&ColumnSpec],
    raw: &str,
) -> Result<Vec<Vec<Cell>>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(raw.as_bytes());

    let headers = reader
        .headers()
        .map_err(|source| TransformError::Csv {
            view_key: view_key.to_string(),
            source,
        })?
        .clone();

    // Schema-order projection: fieldKey → CSV column index.
    let mut projection: Vec<(&ColumnSpec, usize)> = Vec::with_capacity(needed.len());
    for spec in needed {
        match headers.iter().position(|h| h.trim() == spec.column_name) {
            Some(idx) => projection.push((spec, idx)),
            None => {
                tracing::warn!(
                    view_key,
                    column = %spec.column_name,
                    "Column missing from CSV, skipping"
                );
            }
        }
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| TransformError::Csv {
            view_key: view_key.to_string(),
            source,
        })?;

        let cells: Vec<Cell> = projection
            .iter()
            .map(|(spec, idx)| Cell {
                field: spec.field_key.clone(),
                value: normalize(record.get(*idx).unwrap_or(""), spec.format),
                format: spec.format,
            })
            .collect();

        if cells.iter().all(|c| c.value.is_empty()) {
            continue;
        }
        rows.push(cells);
    }
    Ok(rows)
}

/// Trim whitespace; numeric formats additionally strip thousands separators
/// so downstream parsing works.
fn normalize(value: &str, format: ValueFormat) -> String {
    let trimmed = value.trim();
    if format.is_numeric() {
        trimmed.replace(',', "")
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reportforge_registry::{SlideSet, UseCaseMeta, ViewCatalog};
    use std::collections::HashMap;

    fn sample_transformer() -> Transformer {
        let metas: HashMap<String, UseCaseMeta> = serde_json_from(
            r#"{ "POLITICAL_SNAPSHOT": { "workbookName": "PoliticalSnapshot", "siteName": "media-analytics" } }"#,
        );
        let catalogs: HashMap<String, ViewCatalog> = serde_json_from(
            r#"{
              "POLITICAL_SNAPSHOT": {
                "VIEWS": [
                  {
                    "viewKey": "TOTAL_SPEND",
                    "name": "Total Spend",
                    "viewType": "FLAG_CARD",
                    "filterKeys": ["CHANNEL"],
                    "columns": [
                      { "fieldKey": "total_spend", "columnName": "Total Spend", "displayName": "Total Spend", "format": "CURRENCY", "isNeededForView": true }
                    ]
                  },
                  {
                    "viewKey": "CHANNEL_DATA",
                    "name": "Channel Performance",
                    "viewType": "TABLE",
                    "filterKeys": ["CHANNEL", "DATE_RANGE"],
                    "columns": [
                      { "fieldKey": "channel", "columnName": "Channel", "displayName": "Channel", "format": "STRING", "isNeededForView": true },
                      { "fieldKey": "impressions", "columnName": "Impressions", "displayName": "Impressions", "format": "NUMBER", "isNeededForView": true },
                      { "fieldKey": "spend", "columnName": "Spend", "displayName": "Spend ($)", "format": "CURRENCY", "isNeededForView": true },
                      { "fieldKey": "internal_id", "columnName": "Internal Id", "displayName": "Internal Id", "format": "STRING", "isNeededForView": false }
                    ]
                  }
                ],
                "FILTERS": { "CHANNEL": "Channel", "DATE_RANGE": "Date Range" }
              }
            }"#,
        );
        let slides: HashMap<String, SlideSet> = serde_json_from(
            r#"{ "POLITICAL_SNAPSHOT": { "title": "T", "layout": "LAYOUT_WIDE", "slides": [] } }"#,
        );
        Transformer::new(Arc::new(
            Registry::from_parts(metas, catalogs, slides).unwrap(),
        ))
    }

    fn serde_json_from<T: serde::de::DeserializeOwned>(raw: &str) -> T {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn view_requests_follow_catalog_order_and_bind_filters() {
        let transformer = sample_transformer();
        let mut filters = HashMap::new();
        filters.insert("CHANNEL".to_string(), "CTV".to_string());

        let specs = transformer
            .build_view_requests("POLITICAL_SNAPSHOT", &filters)
            .unwrap();

        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].view_key, "TOTAL_SPEND");
        assert_eq!(specs[1].view_key, "CHANNEL_DATA");
        assert_eq!(
            specs[0].filter_params,
            vec![("Channel".to_string(), "CTV".to_string())]
        );
        // DATE_RANGE was not supplied, so only CHANNEL is bound.
        assert_eq!(
            specs[1].filter_params,
            vec![("Channel".to_string(), "CTV".to_string())]
        );
    }

    #[test]
    fn unbound_filters_are_ignored() {
        let transformer = sample_transformer();
        let mut filters = HashMap::new();
        filters.insert("NOT_CONFIGURED".to_string(), "x".to_string());
        let specs = transformer
            .build_view_requests("POLITICAL_SNAPSHOT", &filters)
            .unwrap();
        assert!(specs.iter().all(|s| s.filter_params.is_empty()));
    }

    #[test]
    fn flag_card_takes_the_first_row() {
        let transformer = sample_transformer();
        let csv = "Total Spend\n\"1,234,567\"\n999\n";
        let data = transformer
            .transform("POLITICAL_SNAPSHOT", "TOTAL_SPEND", csv)
            .unwrap()
            .unwrap();
        assert_eq!(
            data,
            ViewData::FlagCard {
                field: "total_spend".to_string(),
                value: "1234567".to_string(),
                format: ValueFormat::Currency,
            }
        );
    }

    #[test]
    fn table_preserves_schema_order_and_row_order() {
        let transformer = sample_transformer();
        // CSV column order differs from schema order; projection must follow
        // the schema.
        let csv = "Spend,Channel,Impressions\n\"10,000\",CTV,\"1,500\"\n2000,Display,800\n";
        let data = transformer
            .transform("POLITICAL_SNAPSHOT", "CHANNEL_DATA", csv)
            .unwrap()
            .unwrap();

        let ViewData::Table { headers, rows } = data else {
            panic!("expected table");
        };
        assert_eq!(
            headers.iter().map(|h| h.field.as_str()).collect::<Vec<_>>(),
            vec!["channel", "impressions", "spend"]
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), headers.len());
        assert_eq!(rows[0][0].value, "CTV");
        assert_eq!(rows[0][1].value, "1500");
        assert_eq!(rows[0][2].value, "10000");
        assert_eq!(rows[1][0].value, "Display");
    }

    #[test]
    fn quoted_fields_with_commas_and_escaped_quotes_parse() {
        let transformer = sample_transformer();
        let csv = "Channel,Impressions,Spend\n\"CTV, \"\"Premium\"\"\",100,5\n";
        let data = transformer
            .transform("POLITICAL_SNAPSHOT", "CHANNEL_DATA", csv)
            .unwrap()
            .unwrap();
        let ViewData::Table { rows, .. } = data else {
            panic!("expected table");
        };
        assert_eq!(rows[0][0].value, "CTV, \"Premium\"");
    }

    #[test]
    fn missing_columns_are_skipped_not_fatal() {
        let transformer = sample_transformer();
        // Spend column absent entirely.
        let csv = "Channel,Impressions\nCTV,100\n";
        let data = transformer
            .transform("POLITICAL_SNAPSHOT", "CHANNEL_DATA", csv)
            .unwrap()
            .unwrap();
        let ViewData::Table { headers, rows } = data else {
            panic!("expected table");
        };
        assert_eq!(headers.len(), 2);
        assert_eq!(rows[0].len(), 2);
    }

    #[test]
    fn all_empty_rows_are_dropped() {
        let transformer = sample_transformer();
        let csv = "Channel,Impressions,Spend\n,,\nCTV,100,5\n,,\n";
        let data = transformer
            .transform("POLITICAL_SNAPSHOT", "CHANNEL_DATA", csv)
            .unwrap()
            .unwrap();
        let ViewData::Table { rows, .. } = data else {
            panic!("expected table");
        };
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn payload_with_no_rows_yields_none() {
        let transformer = sample_transformer();
        let csv = "Channel,Impressions,Spend\n";
        let data = transformer
            .transform("POLITICAL_SNAPSHOT", "CHANNEL_DATA", csv)
            .unwrap();
        assert!(data.is_none());
    }

    #[test]
    fn transform_is_deterministic() {
        let transformer = sample_transformer();
        let csv = "Channel,Impressions,Spend\nCTV,\"1,000\",50\n";
        let a = transformer
            .transform("POLITICAL_SNAPSHOT", "CHANNEL_DATA", csv)
            .unwrap();
        let b = transformer
            .transform("POLITICAL_SNAPSHOT", "CHANNEL_DATA", csv)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn transform_all_excludes_failing_views() {
        let transformer = sample_transformer();
        let mut raw = HashMap::new();
        raw.insert(
            "CHANNEL_DATA".to_string(),
            "Channel,Impressions,Spend\nCTV,100,5\n".to_string(),
        );
        raw.insert("UNKNOWN_VIEW".to_string(), "A\n1\n".to_string());

        let shaped = transformer.transform_all("POLITICAL_SNAPSHOT", &raw);
        assert_eq!(shaped.len(), 1);
        assert!(shaped.contains_key("CHANNEL_DATA"));
    }
}
