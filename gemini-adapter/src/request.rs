/// API version path segment.
pub const API_VERSION: &str = "v1beta";

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// Builds the `generateContent` URL for `model`.
///
/// Accepts both bare model names and `models/`-prefixed resource names, and
/// tolerates a trailing slash on `base_url`.
#[must_use]
pub fn generate_content_url(base_url: &str, model: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let model = model.strip_prefix("models/").unwrap_or(model);
    format!("{base}/{API_VERSION}/models/{model}:generateContent")
}
