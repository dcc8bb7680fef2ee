//! CORS layer built from gateway config.

use crate::domain::CorsConfig;
use axum::http::{header, HeaderValue, Method};
use std::time::Duration;
use tower_http::cors::CorsLayer;

/// Create CORS layer from gateway config.
///
/// With no configured origins the layer adds no CORS headers, so browsers
/// only allow same-origin use.
pub fn create_cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter(|o| o.as_str() != "*")
        .filter_map(|o| o.parse().ok())
        .collect();

    if origins.is_empty() {
        return CorsLayer::new();
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(600))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The layer is opaque, so only construction is checked.
    #[test]
    fn test_wildcard_and_garbage_origins_ignored() {
        let config = CorsConfig {
            allowed_origins: vec!["*".into(), "not a header\n".into()],
        };
        let _layer = create_cors_layer(&config);
    }
}
