use std::{future::Future, sync::Arc};

use axum::Router;
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto::Builder,
    service::TowerToHyperService,
};
use rustls::ServerConfig;
use statsbridge_error::{ErrorContext as _, GenericError};
use tokio::{net::TcpListener, select};
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info};

/// Serves `router` on `listener` until `shutdown` resolves.
///
/// Without a TLS configuration, connections are served as plain HTTP and in-flight requests are allowed to finish
/// before returning. With one, every accepted connection goes through a TLS handshake first, and shutdown stops
/// accepting new connections while existing ones finish in the background.
///
/// # Errors
///
/// If accepting a connection fails, an error is returned.
pub async fn serve<F>(
    listener: TcpListener, router: Router, tls_config: Option<ServerConfig>, shutdown: F,
) -> Result<(), GenericError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listen_addr = listener.local_addr().error_context("Failed to get listen address.")?;

    match tls_config {
        None => {
            info!(%listen_addr, "HTTP server started.");
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
                .error_context("Failed to serve HTTP connections.")?;
        }
        Some(tls_config) => {
            info!(%listen_addr, "HTTPS server started.");
            serve_tls(listener, router, tls_config, shutdown).await?;
        }
    }

    info!(%listen_addr, "HTTP server stopped.");
    Ok(())
}

async fn serve_tls<F>(
    listener: TcpListener, router: Router, tls_config: ServerConfig, shutdown: F,
) -> Result<(), GenericError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let acceptor = TlsAcceptor::from(Arc::new(tls_config));
    let service = TowerToHyperService::new(router);
    let conn_builder = Builder::new(TokioExecutor::new());

    tokio::pin!(shutdown);

    loop {
        select! {
            result = listener.accept() => {
                let (stream, peer_addr) = result.error_context("Failed to accept new connection.")?;
                let acceptor = acceptor.clone();
                let service = service.clone();
                let conn_builder = conn_builder.clone();

                tokio::spawn(async move {
                    let stream = match acceptor.accept(stream).await {
                        Ok(stream) => stream,
                        Err(e) => {
                            debug!(%peer_addr, error = %e, "TLS handshake failed.");
                            return;
                        }
                    };

                    if let Err(e) = conn_builder.serve_connection(TokioIo::new(stream), service).await {
                        debug!(%peer_addr, error = %e, "Failed to serve HTTPS connection.");
                    }
                });
            },

            _ = &mut shutdown => {
                debug!("Received shutdown signal.");
                break;
            }
        }
    }

    Ok(())
}

/// Resolves once the process receives Ctrl-C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal. Running until killed.");
        std::future::pending::<()>().await;
    }

    info!("Received shutdown signal. Stopping...");
}
