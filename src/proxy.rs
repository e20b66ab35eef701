//! Document display URLs.
//!
//! In development the viewer runs on a different origin than blob storage,
//! so blob URLs are rewritten under `/api/blob` where the dev-only route
//! forwards them. Outside development every URL passes through unchanged.

use crate::config::{ProxySettings, BLOB_HOST_SUFFIX, BLOB_PROXY_PREFIX};

/// URL the viewer should load for `url`.
pub fn display_url(url: &str, settings: &ProxySettings) -> String {
    if !settings.dev_mode {
        return url.to_string();
    }

    let Ok(parsed) = reqwest::Url::parse(url) else {
        // Relative paths are already same-origin.
        return url.to_string();
    };

    let is_blob_host = parsed
        .host_str()
        .is_some_and(|host| host.ends_with(BLOB_HOST_SUFFIX));
    if !is_blob_host {
        return parsed.to_string();
    }

    let mut proxied = format!("{BLOB_PROXY_PREFIX}{}", parsed.path());
    if let Some(query) = parsed.query() {
        proxied.push('?');
        proxied.push_str(query);
    }
    tracing::debug!(proxied = proxied.as_str(), "Rewrote blob URL for display");
    proxied
}

/// Upstream URL for a path requested under the blob proxy prefix, or
/// `None` when the configured target is not a valid URL.
///
/// `path` and `query` are raw, still percent-encoded, request components.
pub fn blob_upstream_url(
    settings: &ProxySettings,
    path: &str,
    query: Option<&str>,
) -> Option<reqwest::Url> {
    let base = settings.blob_target.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    let mut upstream = reqwest::Url::parse(&format!("{base}/{path}")).ok()?;
    upstream.set_query(query.filter(|q| !q.is_empty()));
    Some(upstream)
}
