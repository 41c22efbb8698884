use super::AppState;
use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use serde_json::{Value, json};
use tracing::{debug, error, instrument};

/// Landing page linking to the telemetry path.
pub async fn root(State(state): State<AppState>) -> Html<String> {
    let path = escape_html(&state.telemetry_path);

    Html(format!(
        r#"<html>
<head><title>MySQLd exporter</title></head>
<body>
<h1>MySQLd exporter</h1>
<p><a href="{path}">Metrics</a></p>
</body>
</html>
"#
    ))
}

#[instrument(skip(state), level = "info")]
pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.registry.collect_all(&state.source).await {
        Ok(body) => {
            debug!(bytes = body.len(), "encoded metrics");
            ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response()
        }
        Err(e) => {
            error!("failed to encode metrics: {e:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to encode metrics: {e}"),
            )
                .into_response()
        }
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "commit": crate::built_info::GIT_COMMIT_HASH_SHORT.unwrap_or("unknown"),
    }))
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("/metrics"), "/metrics");
        assert_eq!(
            escape_html("/a\"><script>&"),
            "/a&quot;&gt;&lt;script&gt;&amp;"
        );
    }

    #[tokio::test]
    async fn test_health_does_not_need_a_database() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }
}
