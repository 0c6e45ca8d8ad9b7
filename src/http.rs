//! Shared construction of outbound HTTP clients for model providers.

use reqwest::Client;
use std::time::Duration;

/// Build a `reqwest::Client` tagged with a per-provider user agent and a request timeout.
pub(crate) fn model_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(format!("ai-tutor/{user_agent}"))
        .timeout(timeout)
        .build()
}

/// Join a base URL and a path without doubling the separating slash.
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::endpoint;

    #[test]
    fn endpoint_normalizes_slashes() {
        assert_eq!(
            endpoint("http://localhost:11434/", "/api/generate"),
            "http://localhost:11434/api/generate"
        );
        assert_eq!(endpoint("http://h", "models/x"), "http://h/models/x");
    }
}
