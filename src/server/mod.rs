// src/server/mod.rs

//! Local development server with live reload.
//!
//! Serves the working tree over loopback HTTP with `axum` + `tower-http`,
//! injects a small client script into HTML pages and pushes
//! [`ReloadEvent`]s to that script over Server-Sent Events.

pub mod reload;
pub mod routes;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::model::ServerSection;
use crate::errors::{Result, SitepipeError};

pub use reload::{ReloadEvent, ReloadHandle};
pub use routes::{CLIENT_PATH, EVENTS_PATH};

/// Dev server settings, resolved against the project root.
#[derive(Debug, Clone)]
pub struct DevServer {
    host: String,
    port: u16,
    base_dir: PathBuf,
    notify: bool,
}

impl DevServer {
    pub fn from_config(cfg: &ServerSection, root: &Path) -> Self {
        Self {
            host: cfg.host.clone(),
            port: cfg.port,
            base_dir: root.join(&cfg.base_dir),
            notify: cfg.notify,
        }
    }

    /// Override the port; `0` picks a free one.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Bind and start serving in a background task.
    pub async fn start(self, reload: ReloadHandle) -> Result<RunningServer> {
        let listener = TcpListener::bind((self.host.as_str(), self.port))
            .await
            .map_err(|e| {
                SitepipeError::Server(format!("binding {}:{}: {e}", self.host, self.port))
            })?;
        let addr = listener
            .local_addr()
            .map_err(|e| SitepipeError::Server(format!("reading bound address: {e}")))?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let state = routes::ServerState {
            base_dir: self.base_dir.clone(),
            reload,
            notify: self.notify,
            shutdown: shutdown_rx.clone(),
        };
        let app = routes::router(state);

        info!(addr = %addr, base_dir = %self.base_dir.display(), "dev server listening");

        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(wait_for_shutdown(shutdown_rx))
                .await
        });

        Ok(RunningServer {
            addr,
            shutdown: shutdown_tx,
            task: Some(task),
        })
    }
}

/// Handle to a started [`DevServer`].
///
/// Dropping it signals shutdown without waiting; use [`RunningServer::stop`]
/// to wait for the socket to close.
#[derive(Debug)]
pub struct RunningServer {
    addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<std::io::Result<()>>>,
}

impl RunningServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serve until the server stops on its own (it normally doesn't).
    pub async fn wait(&mut self) -> Result<()> {
        match self.task.take() {
            Some(task) => join_server(task).await,
            None => Ok(()),
        }
    }

    /// Stop accepting connections, close open event streams and wait for
    /// the server task to exit.
    pub async fn stop(mut self) -> Result<()> {
        let _ = self.shutdown.send(true);
        match self.task.take() {
            Some(task) => join_server(task).await,
            None => Ok(()),
        }
    }
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        if self.task.is_some() {
            debug!(addr = %self.addr, "dev server handle dropped; signalling shutdown");
            let _ = self.shutdown.send(true);
        }
    }
}

async fn join_server(task: JoinHandle<std::io::Result<()>>) -> Result<()> {
    match task.await {
        Ok(Ok(())) => {
            info!("dev server stopped");
            Ok(())
        }
        Ok(Err(e)) => Err(SitepipeError::Server(format!("serving: {e}"))),
        Err(e) if e.is_cancelled() => {
            warn!("dev server task cancelled");
            Ok(())
        }
        Err(e) => Err(SitepipeError::Server(format!("server task panicked: {e}"))),
    }
}

/// Resolve once the shutdown flag is set or its sender is gone.
pub(crate) async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    loop {
        let stop = *rx.borrow_and_update();
        if stop {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::ConfigFile;
    use std::fs;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let req = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(req.as_bytes()).await.unwrap();
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();
        String::from_utf8_lossy(&buf).into_owned()
    }

    #[tokio::test]
    async fn serves_pages_and_stops() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("app")).unwrap();
        fs::write(
            dir.path().join("app/index.html"),
            "<html><body><h1>hi</h1></body></html>",
        )
        .unwrap();

        let server = DevServer::from_config(&ConfigFile::default().server, dir.path())
            .with_port(0)
            .start(ReloadHandle::new())
            .await
            .unwrap();

        let body = get(server.addr(), "/").await;
        assert!(body.starts_with("HTTP/1.1 200"));
        assert!(body.contains(CLIENT_PATH));

        let addr = server.addr();
        server.stop().await.unwrap();
        assert!(TcpStream::connect(addr).await.is_err());
    }
}
