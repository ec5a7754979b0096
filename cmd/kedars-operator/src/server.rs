use axum::{Router, extract::State, http::header, response::IntoResponse, routing::get};
use pkg_metrics::ScalingMetrics;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub fn router(metrics: ScalingMetrics) -> Router {
    Router::new()
        .route("/metrics", get(render_metrics))
        .route("/healthz", get(healthz))
        .with_state(metrics)
}

async fn render_metrics(State(metrics): State<ScalingMetrics>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics.registry().render(),
    )
}

async fn healthz() -> &'static str {
    "ok"
}

/// Serve `/metrics` and `/healthz` until `shutdown` fires.
pub async fn serve(
    addr: SocketAddr,
    metrics: ScalingMetrics,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    info!("Serving metrics on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router(metrics))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn metrics_page_renders_registry() {
        let metrics = ScalingMetrics::default();
        metrics.jobs_created("batch/orders", 2);

        let body = render_metrics(State(metrics)).await.into_response().into_body();
        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("kedars_jobs_created_total"));
        assert!(text.contains("batch/orders"));
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        assert_eq!(healthz().await, "ok");
    }
}
