//! Fetchers for the artifacts the dev server publishes under `/data/`.

use borderpaint_engine::{LocaleTable, PresetTable};

pub(crate) const TOPOLOGY_URL: &str = "/data/topology.json";
pub(crate) const LOCALES_URL: &str = "/data/locales.json";
pub(crate) const PRESETS_URL: &str = "/data/hierarchy.json";

async fn fetch_text(url: &str) -> Result<String, String> {
    let resp = gloo_net::http::Request::get(url)
        .send()
        .await
        .map_err(|e| format!("fetch error: {e}"))?;

    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }

    resp.text().await.map_err(|e| format!("read error: {e}"))
}

/// Raw topology document; the engine parses it so load errors stay in one place.
pub(crate) async fn fetch_topology() -> Result<String, String> {
    fetch_text(TOPOLOGY_URL).await
}

pub(crate) async fn fetch_locales() -> Result<LocaleTable, String> {
    let text = fetch_text(LOCALES_URL).await?;
    LocaleTable::from_json(&text).map_err(|e| format!("parse error: {e}"))
}

pub(crate) async fn fetch_presets() -> Result<PresetTable, String> {
    let text = fetch_text(PRESETS_URL).await?;
    PresetTable::from_json(&text).map_err(|e| format!("parse error: {e}"))
}

pub(crate) fn log_info(message: &str) {
    web_sys::console::info_1(&message.into());
}

pub(crate) fn log_warn(message: &str) {
    web_sys::console::warn_1(&message.into());
}
