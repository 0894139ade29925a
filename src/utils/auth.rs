//! Authentication utilities for platform requests

/// Attach the bearer token to a request when one is available.
///
/// Requests without a token are sent anonymously; the platform decides
/// whether the endpoint needs a signed-in user.
pub fn add_auth_headers(
    request: reqwest::RequestBuilder,
    token: Option<&str>,
) -> reqwest::RequestBuilder {
    match token {
        Some(token) if !token.is_empty() => {
            request.header("Authorization", format!("Bearer {token}"))
        }
        _ => request,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_header_is_added_for_tokens() {
        let client = reqwest::Client::new();
        let request = add_auth_headers(client.get("https://example.com"), Some("secret"))
            .build()
            .unwrap();
        assert_eq!(
            request.headers().get("Authorization").unwrap(),
            "Bearer secret"
        );
    }

    #[test]
    fn missing_or_empty_tokens_send_anonymously() {
        let client = reqwest::Client::new();
        for token in [None, Some("")] {
            let request = add_auth_headers(client.get("https://example.com"), token)
                .build()
                .unwrap();
            assert!(request.headers().get("Authorization").is_none());
        }
    }
}
