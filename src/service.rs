//! High-level interface for running the server.

use std::convert::Infallible;
use std::future::Future;
use std::net::ToSocketAddrs;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use http::{Request, Response};
use hyper::service::make_service_fn;
use hyper::{Body, Server};
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::StartupError;
use crate::response::{compose, RequestContext};

/// The server: shared, immutable configuration plus the request pipeline.
///
/// Cloning is cheap and every clone serves the same root, so one value can
/// be handed to any number of connection tasks. It implements
/// `hyper::service::Service`, which simply wraps [`FileServer::serve`], and
/// [`FileServer::run`] drives the whole accept loop for the common case.
#[derive(Clone)]
pub struct FileServer {
    config: Arc<ServerConfig>,
}

impl FileServer {
    /// Create a server for the given settings.
    pub fn new(config: ServerConfig) -> Self {
        FileServer {
            config: Arc::new(config),
        }
    }

    /// The settings this server runs with.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serve one request.
    ///
    /// Deliberate rejections become their status and message; anything
    /// unexpected becomes the fixed 500 answer with the detail kept in the
    /// log. This never fails, so connections stay open.
    pub async fn serve<B>(&self, req: Request<B>) -> Response<Body> {
        let started = Instant::now();
        let ctx = RequestContext::from_request(&req);
        debug!(method = %ctx.method, path = %ctx.path, "request received");

        match compose(&self.config, &ctx).await {
            Ok(response) => {
                info!(
                    status = response.status().as_u16(),
                    path = %ctx.path,
                    elapsed_ms = elapsed_ms(started),
                    "request served"
                );
                response
            }
            Err(err) => {
                if let Some(detail) = err.detail() {
                    error!(path = %ctx.path, error = %detail, "unexpected error");
                }
                warn!(
                    status = err.status().as_u16(),
                    path = %ctx.path,
                    elapsed_ms = elapsed_ms(started),
                    "request rejected"
                );
                err.into_response()
            }
        }
    }

    /// Bind the configured address and serve until `shutdown` resolves,
    /// then drain in-flight requests before returning.
    pub async fn run<F>(self, shutdown: F) -> Result<(), StartupError>
    where
        F: Future<Output = ()>,
    {
        let config = Arc::clone(&self.config);
        let addr = (config.host.as_str(), config.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| StartupError::Address {
                host: config.host.clone(),
                port: config.port,
            })?;

        let make_service = make_service_fn(move |_conn| {
            let server = self.clone();
            async move { Ok::<_, Infallible>(server) }
        });

        let server = Server::try_bind(&addr)?.serve(make_service);
        info!(
            host = %config.host,
            port = config.port,
            root = %config.root.display(),
            "listening"
        );

        server.with_graceful_shutdown(shutdown).await?;
        info!("server stopped");
        Ok(())
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

impl<B: Send + 'static> hyper::service::Service<Request<B>> for FileServer {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response<Body>, Infallible>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let server = self.clone();
        Box::pin(async move { Ok(server.serve(req).await) })
    }
}
