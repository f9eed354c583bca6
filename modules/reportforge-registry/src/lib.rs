//! Use-case manifest registry.
//!
//! Three JSON manifest files are loaded once at startup and exposed through
//! read-only lookups: the use-case → workbook/site mapping, the view catalog
//! with filter bindings and column schemas, and the slide manifests. Invalid
//! manifest content fails startup.

pub mod manifest;

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

pub use manifest::{
    Background, BorderRules, CatalogView, ChartKind, ChartOptions, ColumnSpec, ElementDescriptor,
    Position, ShapeKind, ShapeOptions, SlideDescriptor, SlideSet, TableOptions, TextOptions,
    TextSegment, UseCaseMeta, ViewCatalog, ViewConfig, ViewType,
};

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Unknown use case: {0}")]
    UseCaseNotFound(String),

    #[error("Failed to read manifest {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid manifest {file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Manifest validation failed: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, RegistryError>;

/// Read-only registry of use-case manifests, shared via `Arc` after startup.
#[derive(Debug)]
pub struct Registry {
    metas: HashMap<String, UseCaseMeta>,
    catalogs: HashMap<String, ViewCatalog>,
    slides: HashMap<String, SlideSet>,
}

impl Registry {
    /// Load and cross-validate the three manifest files from a directory.
    pub fn load(dir: &Path) -> Result<Self> {
        let metas: HashMap<String, UseCaseMeta> = read_manifest(dir, "usecase-mapping.json")?;
        let catalogs: HashMap<String, ViewCatalog> = read_manifest(dir, "tableau-views.json")?;
        let slides: HashMap<String, SlideSet> = read_manifest(dir, "slide-view-mapping.json")?;

        let registry = Self {
            metas,
            catalogs,
            slides,
        };
        registry.validate()?;
        tracing::info!(
            use_cases = registry.metas.len(),
            "Loaded use-case manifests"
        );
        Ok(registry)
    }

    /// Construct a registry from already-parsed manifests. Used by tests and
    /// by callers that embed manifests.
    pub fn from_parts(
        metas: HashMap<String, UseCaseMeta>,
        catalogs: HashMap<String, ViewCatalog>,
        slides: HashMap<String, SlideSet>,
    ) -> Result<Self> {
        let registry = Self {
            metas,
            catalogs,
            slides,
        };
        registry.validate()?;
        Ok(registry)
    }

    pub fn use_case_meta(&self, use_case: &str) -> Result<&UseCaseMeta> {
        self.metas
            .get(use_case)
            .ok_or_else(|| RegistryError::UseCaseNotFound(use_case.to_string()))
    }

    pub fn view_catalog(&self, use_case: &str) -> Result<&ViewCatalog> {
        self.catalogs
            .get(use_case)
            .ok_or_else(|| RegistryError::UseCaseNotFound(use_case.to_string()))
    }

    pub fn slide_manifest(&self, use_case: &str) -> Result<&SlideSet> {
        self.slides
            .get(use_case)
            .ok_or_else(|| RegistryError::UseCaseNotFound(use_case.to_string()))
    }

    pub fn known_use_case(&self, use_case: &str) -> bool {
        self.metas.contains_key(use_case)
    }

    /// Cross-check the three manifests: every use case with a meta must have
    /// a catalog and a slide set, every view filter key must have a binding,
    /// and every data/value key referenced by a slide must exist in the
    /// catalog.
    fn validate(&self) -> Result<()> {
        for use_case in self.metas.keys() {
            let catalog = self.catalogs.get(use_case).ok_or_else(|| {
                RegistryError::Validation(format!("{use_case}: missing view catalog"))
            })?;
            let slide_set = self.slides.get(use_case).ok_or_else(|| {
                RegistryError::Validation(format!("{use_case}: missing slide manifest"))
            })?;

            for view in &catalog.views {
                for filter_key in &view.config.filter_keys {
                    if !catalog.filters.contains_key(filter_key) {
                        return Err(RegistryError::Validation(format!(
                            "{use_case}: view {} declares filter {filter_key} with no binding",
                            view.key
                        )));
                    }
                }
                if view.config.columns.is_empty() {
                    return Err(RegistryError::Validation(format!(
                        "{use_case}: view {} has an empty column schema",
                        view.key
                    )));
                }
            }

            for slide in &slide_set.slides {
                for key in slide.referenced_view_keys() {
                    if !catalog.views.iter().any(|v| v.key == key) {
                        return Err(RegistryError::Validation(format!(
                            "{use_case}: slide {} references unknown view key {key}",
                            slide.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

fn read_manifest<T: serde::de::DeserializeOwned>(dir: &Path, file: &str) -> Result<T> {
    let path = dir.join(file);
    let raw = std::fs::read_to_string(&path).map_err(|source| RegistryError::Io {
        file: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| RegistryError::Parse {
        file: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_registry() -> Registry {
        let metas: HashMap<String, UseCaseMeta> = serde_json::from_str(
            r#"{ "POLITICAL_SNAPSHOT": { "workbookName": "PoliticalSnapshot", "siteName": "media-analytics" } }"#,
        )
        .unwrap();
        let catalogs: HashMap<String, ViewCatalog> = serde_json::from_str(
            r#"{
              "POLITICAL_SNAPSHOT": {
                "VIEWS": [
                  {
                    "viewKey": "CHANNEL_DATA",
                    "name": "Channel Performance",
                    "viewType": "TABLE",
                    "filterKeys": ["CHANNEL"],
                    "columns": [
                      { "fieldKey": "channel", "columnName": "Channel", "displayName": "Channel", "format": "STRING", "isNeededForView": true },
                      { "fieldKey": "spend", "columnName": "Spend", "displayName": "Spend ($)", "format": "CURRENCY", "isNeededForView": true }
                    ]
                  }
                ],
                "FILTERS": { "CHANNEL": "Channel" }
              }
            }"#,
        )
        .unwrap();
        let slides: HashMap<String, SlideSet> = serde_json::from_str(
            r#"{
              "POLITICAL_SNAPSHOT": {
                "title": "Political Snapshot",
                "layout": "LAYOUT_WIDE",
                "slides": [
                  {
                    "name": "overview",
                    "background": { "color": "WHITE" },
                    "elements": [
                      { "type": "TABLE", "dataKey": "CHANNEL_DATA", "position": { "x": 1.0, "y": 3.0, "w": 20.0, "h": 10.0 } }
                    ]
                  }
                ]
              }
            }"#,
        )
        .unwrap();
        Registry::from_parts(metas, catalogs, slides).unwrap()
    }

    #[test]
    fn lookups_resolve_known_use_case() {
        let registry = sample_registry();
        let meta = registry.use_case_meta("POLITICAL_SNAPSHOT").unwrap();
        assert_eq!(meta.workbook_name, "PoliticalSnapshot");
        assert_eq!(meta.site_name, "media-analytics");

        let catalog = registry.view_catalog("POLITICAL_SNAPSHOT").unwrap();
        assert_eq!(catalog.views.len(), 1);
        assert_eq!(catalog.views[0].key, "CHANNEL_DATA");

        let slides = registry.slide_manifest("POLITICAL_SNAPSHOT").unwrap();
        assert_eq!(slides.layout, "LAYOUT_WIDE");
        assert_eq!(slides.slides.len(), 1);
    }

    #[test]
    fn unknown_use_case_is_an_error() {
        let registry = sample_registry();
        let err = registry.use_case_meta("NOPE").unwrap_err();
        assert!(matches!(err, RegistryError::UseCaseNotFound(_)));
    }

    #[test]
    fn validation_rejects_unbound_filter_key() {
        let metas: HashMap<String, UseCaseMeta> = serde_json::from_str(
            r#"{ "X": { "workbookName": "W", "siteName": "s" } }"#,
        )
        .unwrap();
        let catalogs: HashMap<String, ViewCatalog> = serde_json::from_str(
            r#"{
              "X": {
                "VIEWS": [
                  {
                    "viewKey": "V",
                    "name": "V",
                    "viewType": "FLAG_CARD",
                    "filterKeys": ["MISSING"],
                    "columns": [
                      { "fieldKey": "f", "columnName": "F", "displayName": "F", "format": "NUMBER", "isNeededForView": true }
                    ]
                  }
                ],
                "FILTERS": {}
              }
            }"#,
        )
        .unwrap();
        let slides: HashMap<String, SlideSet> = serde_json::from_str(
            r#"{ "X": { "title": "X", "layout": "LAYOUT_WIDE", "slides": [] } }"#,
        )
        .unwrap();
        let err = Registry::from_parts(metas, catalogs, slides).unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));
    }

    #[test]
    fn validation_rejects_slide_with_unknown_view_key() {
        let metas: HashMap<String, UseCaseMeta> = serde_json::from_str(
            r#"{ "X": { "workbookName": "W", "siteName": "s" } }"#,
        )
        .unwrap();
        let catalogs: HashMap<String, ViewCatalog> = serde_json::from_str(
            r#"{
              "X": {
                "VIEWS": [
                  {
                    "viewKey": "V",
                    "name": "V",
                    "viewType": "FLAG_CARD",
                    "filterKeys": [],
                    "columns": [
                      { "fieldKey": "f", "columnName": "F", "displayName": "F", "format": "NUMBER", "isNeededForView": true }
                    ]
                  }
                ],
                "FILTERS": {}
              }
            }"#,
        )
        .unwrap();
        let slides: HashMap<String, SlideSet> = serde_json::from_str(
            r#"{
              "X": {
                "title": "X",
                "layout": "LAYOUT_WIDE",
                "slides": [
                  {
                    "name": "s1",
                    "elements": [
                      { "type": "CHART", "chartType": "BAR", "dataKey": "GHOST", "position": { "x": 0, "y": 0, "w": 10, "h": 10 } }
                    ]
                  }
                ]
              }
            }"#,
        )
        .unwrap();
        let err = Registry::from_parts(metas, catalogs, slides).unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));
    }
}
