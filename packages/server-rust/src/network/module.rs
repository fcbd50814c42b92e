//! Network module with deferred startup lifecycle.
//!
//! `new()` creates resources, `start()` binds the TCP listener, and
//! `serve()` starts accepting connections. Handlers may still be added to
//! the shared mux between `start()` and `serve()`. Application routes are
//! supplied by the caller; the module only adds the liveness probe and the
//! middleware stack.

use std::future::Future;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use centra_core::ErrorMux;
use http::StatusCode;
use tokio::net::TcpListener;
use tracing::info;

use super::config::NetworkConfig;
use super::middleware::build_http_layers;

/// Manages the HTTP server lifecycle.
///
/// Follows the deferred startup pattern:
/// 1. `new()` -- takes the configuration and the shared error mux
/// 2. `start()` -- binds TCP listener to the configured address
/// 3. `serve()` -- begins accepting connections until shutdown is signalled
pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    mux: Arc<ErrorMux>,
}

impl NetworkModule {
    /// Creates a new network module without binding any port.
    #[must_use]
    pub fn new(config: NetworkConfig, mux: Arc<ErrorMux>) -> Self {
        Self {
            config,
            listener: None,
            mux,
        }
    }

    /// Returns the error mux bound to every request.
    #[must_use]
    pub fn mux(&self) -> Arc<ErrorMux> {
        Arc::clone(&self.mux)
    }

    /// Adds `GET /health/live` to `routes` and wraps everything in the
    /// middleware stack, so every route sees the bound mux.
    pub fn build_router(&self, routes: Router) -> Router {
        let layers = build_http_layers(&self.config, Arc::clone(&self.mux));

        routes
            .route("/health/live", get(liveness_handler))
            .layer(layers)
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the actual bound port, which may differ from the configured
    /// port when port 0 is used (OS-assigned ephemeral port).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (e.g., port in use).
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves connections until the shutdown future resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if the server encounters a fatal I/O error.
    ///
    /// # Panics
    ///
    /// Panics if `start()` was not called before `serve()`.
    pub async fn serve(
        mut self,
        routes: Router,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let router = self.build_router(routes);
        let listener = self
            .listener
            .take()
            .expect("start() must be called before serve()");

        info!(handlers = self.mux.len(), "Serving HTTP connections");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Server stopped");
        Ok(())
    }
}

/// Liveness probe -- always returns 200 OK.
async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::response::Response;
    use centra_core::{MuxOptions, Sentinel};
    use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
    use http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::demo::{build_demo_mux, routes};

    fn module() -> NetworkModule {
        NetworkModule::new(
            NetworkConfig::default(),
            Arc::new(build_demo_mux(MuxOptions { debug: true })),
        )
    }

    async fn get_path(router: Router, path: &str) -> Response {
        router
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn new_creates_module_without_binding() {
        let module = module();
        assert!(module.listener.is_none());
    }

    #[test]
    fn mux_returns_shared_arc() {
        let module = module();
        assert!(Arc::ptr_eq(&module.mux(), &module.mux()));
    }

    #[tokio::test]
    async fn liveness_returns_200_and_request_id() {
        let response = get_path(module().build_router(routes()), "/health/live").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn record_found() {
        let response = get_path(module().build_router(routes()), "/records/7").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "record 7");
    }

    #[tokio::test]
    async fn wrapped_not_found_maps_to_json_404() {
        let response = get_path(module().build_router(routes()), "/records/missing").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");

        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["error"], "not_found");
        assert_eq!(body["path"], "/records/missing");
        assert_eq!(body["detail"], "loading record missing");
    }

    #[tokio::test]
    async fn unauthorized_maps_to_401() {
        let response = get_path(module().build_router(routes()), "/legacy/records/secret").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()["www-authenticate"], "Bearer");
    }

    #[tokio::test]
    async fn unregistered_error_gets_default_page() {
        for path in ["/records/broken", "/legacy/records/broken"] {
            let response = get_path(module().build_router(routes()), path).await;
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(response.headers()[CONTENT_TYPE], "text/html");
            assert_eq!(response.headers()[CONTENT_LENGTH], "30");
            assert_eq!(body_string(response).await, "<h1>Internal Server Error</h1>");
        }
    }

    #[tokio::test]
    async fn handlers_added_after_build_are_visible() {
        let module = module();
        let router = module.build_router(routes());
        module.mux().handle(
            Sentinel::of_type::<std::io::Error>(),
            |sink, _req, _err| sink.write_header(StatusCode::SERVICE_UNAVAILABLE),
        );

        let response = get_path(router, "/records/broken").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn caller_routes_get_the_bound_mux() {
        #[derive(Debug, PartialEq, thiserror::Error)]
        #[error("quota exceeded")]
        struct Quota;

        let mux = Arc::new(ErrorMux::new());
        mux.handle(Sentinel::new(Quota), |sink, _req, _err| {
            sink.write_header(StatusCode::TOO_MANY_REQUESTS);
        });
        let module = NetworkModule::new(NetworkConfig::default(), mux);

        let routes = Router::new().route(
            "/upload",
            get(|dispatch: crate::extract::ErrorDispatch| async move {
                dispatch.respond(Some(&Quota))
            }),
        );
        let router = module.build_router(routes);

        let response = get_path(router.clone(), "/upload").await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let response = get_path(router, "/records/7").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn start_binds_to_os_assigned_port() {
        let mut module = NetworkModule::new(
            NetworkConfig {
                host: "127.0.0.1".to_string(),
                ..NetworkConfig::default()
            },
            Arc::new(ErrorMux::new()),
        );
        let port = module.start().await.expect("start should succeed");
        assert!(port > 0, "OS-assigned port should be > 0");
        assert!(module.listener.is_some());
    }

    #[tokio::test]
    #[should_panic(expected = "start() must be called before serve()")]
    async fn serve_panics_without_start() {
        let _ = module().serve(routes(), std::future::pending::<()>()).await;
    }
}
