//! Enumerates cores published by the upstream core buildbot and matches
//! them against the consoles this catalog knows about.

use serde::Deserialize;
use thiserror::Error;

pub const BUILDBOT_URL: &str = "https://buildbot.libretro.com/nightly/update_index.json";

#[derive(Debug, Error)]
pub enum BuildbotError {
    #[error("buildbot request failed: {0}")]
    Request(String),
    #[error("buildbot response was not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize)]
struct BuildbotIndex {
    items: Vec<BuildbotItem>,
}

#[derive(Debug, Clone, Deserialize)]
struct BuildbotItem {
    href: String,
}

/// Fetches the current buildbot index.
pub async fn fetch_index(client: &reqwest::Client) -> Result<Vec<String>, BuildbotError> {
    let response = client
        .get(BUILDBOT_URL)
        .send()
        .await
        .map_err(|e| BuildbotError::Request(e.to_string()))?;
    let body = response
        .text()
        .await
        .map_err(|e| BuildbotError::Request(e.to_string()))?;
    let index: BuildbotIndex = serde_json::from_str(&body)?;
    Ok(index.items.into_iter().map(|item| item.href).collect())
}

/// Finds the href in `hrefs` that publishes `core_location`'s archive,
/// i.e. the one ending in `<core_location>.<extension>.zip`.
pub fn find_core_href<'a>(hrefs: &'a [String], core_location: &str, extension: &str) -> Option<&'a str> {
    let suffix = format!("{core_location}.{extension}.zip");
    hrefs.iter().find(|href| href.ends_with(&suffix)).map(String::as_str)
}

/// Builds a download URL from the buildbot's own scheme and host plus
/// an `href` taken from its index — the index only ever carries paths,
/// never full URLs.
pub fn core_download_url(href: &str) -> Result<String, BuildbotError> {
    let mut url = reqwest::Url::parse(BUILDBOT_URL).map_err(|e| BuildbotError::Request(e.to_string()))?;
    url.set_path(href);
    url.set_query(None);
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_core_href_matches_on_exact_suffix() {
        let hrefs = vec![
            "/nightly/windows/x86_64/latest/nestopia_libretro.dll.zip".to_string(),
            "/nightly/windows/x86_64/latest/snes9x_libretro.dll.zip".to_string(),
        ];
        assert_eq!(
            find_core_href(&hrefs, "nestopia_libretro", "dll"),
            Some("/nightly/windows/x86_64/latest/nestopia_libretro.dll.zip")
        );
    }

    #[test]
    fn find_core_href_rejects_partial_suffix_match() {
        let hrefs = vec!["/nightly/windows/x86_64/latest/supernestopia_libretro.dll.zip".to_string()];
        assert_eq!(find_core_href(&hrefs, "nestopia_libretro", "dll"), None);
    }

    #[test]
    fn core_download_url_prepends_buildbot_scheme_and_host() {
        let url = core_download_url("/nightly/windows/x86_64/latest/nestopia_libretro.dll.zip").unwrap();
        assert_eq!(
            url,
            "https://buildbot.libretro.com/nightly/windows/x86_64/latest/nestopia_libretro.dll.zip"
        );
    }
}
