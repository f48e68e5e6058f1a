//! HTTP listener with graceful shutdown

use axum::Router;
use offhours_core::ManagerHandle;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

use crate::{HttpError, HttpResult, router};

/// Bound HTTP listener serving the scheduler router
pub struct HttpServer {
    listener: TcpListener,
    addr: SocketAddr,
}

impl HttpServer {
    pub async fn bind(addr: SocketAddr) -> HttpResult<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| HttpError::Bind { addr, source })?;
        let addr = listener.local_addr()?;

        info!(%addr, "HTTP server bound");
        Ok(Self { listener, addr })
    }

    /// Actual bound address; differs from the requested one for port 0
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests
    pub async fn run(
        self,
        handle: ManagerHandle,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> HttpResult<()> {
        self.serve(router(handle), shutdown).await
    }

    async fn serve(
        self,
        app: Router,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> HttpResult<()> {
        info!(addr = %self.addr, "HTTP server listening");
        axum::serve(self.listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;
        info!("HTTP server stopped");
        Ok(())
    }
}
