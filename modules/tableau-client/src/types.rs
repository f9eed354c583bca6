//! Wire payloads for the Tableau REST API.

use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub(crate) struct SignInRequest {
    pub credentials: PatCredentials,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PatCredentials {
    pub personal_access_token_name: String,
    pub personal_access_token_secret: String,
    pub site: SiteRef,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SiteRef {
    pub content_url: String,
}

#[derive(Deserialize)]
pub(crate) struct SignInResponse {
    pub credentials: SignInCredentials,
}

#[derive(Deserialize)]
pub(crate) struct SignInCredentials {
    pub token: String,
    pub site: SiteInfo,
}

#[derive(Deserialize)]
pub(crate) struct SiteInfo {
    pub id: String,
}

#[derive(Deserialize)]
pub(crate) struct WorkbooksResponse {
    pub workbooks: WorkbookList,
}

#[derive(Deserialize, Default)]
pub(crate) struct WorkbookList {
    #[serde(default)]
    pub workbook: Vec<Workbook>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Workbook {
    pub id: String,
    #[serde(default)]
    pub content_url: String,
}

#[derive(Deserialize)]
pub(crate) struct ViewsResponse {
    pub views: ViewList,
}

#[derive(Deserialize, Default)]
pub(crate) struct ViewList {
    #[serde(default)]
    pub view: Vec<ViewInfo>,
}

#[derive(Deserialize)]
pub(crate) struct ViewInfo {
    pub id: String,
    pub name: String,
}

/// One view to fetch: remote name, logical key, and bound filter parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewFetchSpec {
    pub view_key: String,
    pub view_name: String,
    /// Remote parameter name → value, applied as `vf_<name>=<value>`.
    pub filter_params: Vec<(String, String)>,
}
