//! Discovery of the Gemini API key and endpoint.

use crate::error::GeminiError;

/// Primary environment variable holding the API key.
pub const GEMINI_API_KEY_ENV_VAR: &str = "GEMINI_API_KEY";

/// Fallback environment variable holding the API key.
pub const GOOGLE_API_KEY_ENV_VAR: &str = "GOOGLE_API_KEY";

/// Environment variable that overrides the API base URL.
pub const GEMINI_BASE_URL_ENV_VAR: &str = "GEMINI_BASE_URL";

/// Locates the API key.
///
/// Resolution order:
/// 1. `explicit` if provided and non-empty.
/// 2. The `GEMINI_API_KEY` environment variable.
/// 3. The `GOOGLE_API_KEY` environment variable.
///
/// # Errors
///
/// Returns `GeminiError::MissingApiKey` when none of them yields a key.
pub fn discover_api_key(explicit: Option<&str>) -> Result<String, GeminiError> {
    resolve_api_key(explicit, |name| std::env::var(name).ok())
}

fn resolve_api_key(
    explicit: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, GeminiError> {
    let non_empty = |s: String| {
        let s = s.trim().to_string();
        (!s.is_empty()).then_some(s)
    };

    explicit
        .map(str::to_string)
        .and_then(non_empty)
        .or_else(|| lookup(GEMINI_API_KEY_ENV_VAR).and_then(non_empty))
        .or_else(|| lookup(GOOGLE_API_KEY_ENV_VAR).and_then(non_empty))
        .ok_or(GeminiError::MissingApiKey)
}

/// Base URL override from `GEMINI_BASE_URL`, if set.
#[must_use]
pub fn base_url_override() -> Option<String> {
    std::env::var(GEMINI_BASE_URL_ENV_VAR)
        .ok()
        .filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn explicit_key_wins() {
        let key = resolve_api_key(Some("explicit"), env(&[(GEMINI_API_KEY_ENV_VAR, "env")])).unwrap();
        assert_eq!(key, "explicit");
    }

    #[test]
    fn gemini_var_before_google_var() {
        let lookup = env(&[(GEMINI_API_KEY_ENV_VAR, "gem"), (GOOGLE_API_KEY_ENV_VAR, "goog")]);
        assert_eq!(resolve_api_key(None, lookup).unwrap(), "gem");

        let lookup = env(&[(GEMINI_API_KEY_ENV_VAR, "  "), (GOOGLE_API_KEY_ENV_VAR, "goog")]);
        assert_eq!(resolve_api_key(Some(""), lookup).unwrap(), "goog");
    }

    #[test]
    fn missing_key_is_an_error() {
        assert!(matches!(
            resolve_api_key(None, env(&[])),
            Err(GeminiError::MissingApiKey)
        ));
    }
}
