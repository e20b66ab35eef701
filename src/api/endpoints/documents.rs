//! Document URL and client configuration endpoints.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::proxy::display_url as proxied_display_url;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub demo_pdf_url: Option<String>,
    pub demo_display_url: Option<String>,
    pub dev_mode: bool,
}

#[derive(Debug, Deserialize)]
pub struct DisplayUrlQuery {
    pub url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayUrlResponse {
    pub url: String,
    pub display_url: String,
}

/// `GET /api/config`
pub async fn config(State(ctx): State<ApiContext>) -> Json<ClientConfig> {
    let proxy = &ctx.config.proxy;
    let demo = ctx.config.demo_pdf_url.clone();
    Json(ClientConfig {
        demo_display_url: demo.as_deref().map(|u| proxied_display_url(u, proxy)),
        demo_pdf_url: demo,
        dev_mode: proxy.dev_mode,
    })
}

/// `GET /api/documents/display-url?url=`
pub async fn display_url(
    State(ctx): State<ApiContext>,
    Query(query): Query<DisplayUrlQuery>,
) -> Result<Json<DisplayUrlResponse>, ApiError> {
    if query.url.trim().is_empty() {
        return Err(ApiError::BadRequest("url must not be empty".into()));
    }
    let display_url = proxied_display_url(&query.url, &ctx.config.proxy);
    Ok(Json(DisplayUrlResponse {
        url: query.url,
        display_url,
    }))
}
