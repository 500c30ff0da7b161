//! API path normalization and backend pathname resolution

use ticketlens_core::{BackendConfig, PathResolution};

/// Reduce a labelled API value (path or full URL) to a `/`-rooted path
/// without query string or fragment.
pub fn normalize_api_path(raw: &str) -> Option<String> {
    let raw = raw.trim().trim_end_matches(['.', ',', '，', '。']);
    if raw.is_empty() {
        return None;
    }

    let path = if raw.starts_with("http://") || raw.starts_with("https://") {
        url::Url::parse(raw).ok()?.path().to_string()
    } else {
        raw.split(['?', '#']).next().unwrap_or(raw).to_string()
    };

    if path.is_empty() || path == "/" {
        return None;
    }

    if path.starts_with('/') {
        Some(path)
    } else {
        Some(format!("/{}", path))
    }
}

/// Map an API path to the pathname the backend records.
///
/// Order: exact entry in `api_pathname_mapping`, then the path component of
/// `base_url` as a prefix, then the path unchanged.
pub fn resolve_pathname(
    api_path: &str,
    backend: Option<&BackendConfig>,
) -> (String, PathResolution) {
    let Some(backend) = backend else {
        return (api_path.to_string(), PathResolution::AsIs);
    };

    let mapped = backend
        .api_pathname_mapping
        .get(api_path)
        .or_else(|| backend.api_pathname_mapping.get(api_path.trim_start_matches('/')));
    if let Some(pathname) = mapped {
        return (pathname.clone(), PathResolution::Mapping);
    }

    if let Some(prefix) = backend.base_url.as_deref().and_then(base_path) {
        let already_prefixed = api_path == prefix || api_path.starts_with(&format!("{}/", prefix));
        if !already_prefixed {
            return (format!("{}{}", prefix, api_path), PathResolution::BaseUrl);
        }
    }

    (api_path.to_string(), PathResolution::AsIs)
}

/// Path component of a base URL without trailing slash; `None` for the root
fn base_path(base_url: &str) -> Option<String> {
    let parsed = url::Url::parse(base_url).ok()?;
    let path = parsed.path().trim_end_matches('/');
    if path.is_empty() {
        None
    } else {
        Some(path.to_string())
    }
}
