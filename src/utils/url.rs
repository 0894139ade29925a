//! URL helpers for platform endpoints

/// Strip trailing slashes so endpoint joins never produce `//`.
///
/// ```
/// use monkeyking::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("https://api.example.com/v1///"), "https://api.example.com/v1");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Join a base URL and an endpoint path.
///
/// ```
/// use monkeyking::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("https://api.example.com/v1/", "/auth/sign-in"),
///     "https://api.example.com/v1/auth/sign-in"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{normalized_base}/{endpoint}")
}

/// Host portion of a base URL, used to key stored credentials per platform.
/// Falls back to the normalized URL when no scheme is present.
pub fn host_label(base_url: &str) -> String {
    let normalized = normalize_base_url(base_url);
    let without_scheme = normalized
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(normalized.as_str());
    without_scheme
        .split('/')
        .next()
        .filter(|host| !host.is_empty())
        .unwrap_or(without_scheme)
        .to_ascii_lowercase()
}
