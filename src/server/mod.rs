//! HTTP Explorer: the collaborator that consumes the query engine and
//! facet computer over plain HTTP. Uses a `ServerState`/`ServerHandle`/
//! `start_server` shape (a fixed `tiny_http` worker pool with a
//! `recv_timeout` poll loop and `AtomicBool` shutdown) generalized to
//! the query/facet/thumbnail/detail routes below. No DLNA/SSDP/casting.

pub mod http;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Shared, read-only state handed to every request-handling thread. Each
/// request opens its own short-lived `Catalog` connection against
/// `catalogue_path` — the catalogue's WAL mode lets readers run
/// concurrently against a consistent snapshot without a
/// shared `Connection` serializing them behind a mutex.
pub struct ServerState {
    pub catalogue_path: PathBuf,
    pub shutdown: AtomicBool,
}

pub struct ServerHandle {
    state: Arc<ServerState>,
    http_thread: Option<JoinHandle<()>>,
}

impl ServerHandle {
    pub fn stop(mut self) {
        self.state.shutdown.store(true, Ordering::Relaxed);
        if let Some(t) = self.http_thread.take() {
            let _ = t.join();
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.state.shutdown.store(true, Ordering::Relaxed);
    }
}

/// Start the HTTP explorer bound to `bind_addr`. Returns the handle and
/// the base URL the caller should report to the user.
pub fn start_server(
    catalogue_path: PathBuf,
    bind_addr: SocketAddr,
) -> Result<(ServerHandle, String), Box<dyn std::error::Error + Send + Sync>> {
    let server = tiny_http::Server::http(bind_addr)?;
    let server_addr = server.server_addr().to_ip().unwrap_or(bind_addr);
    let url = format!("http://{server_addr}");

    let state = Arc::new(ServerState {
        catalogue_path,
        shutdown: AtomicBool::new(false),
    });

    let http_state = Arc::clone(&state);
    let http_thread = std::thread::Builder::new()
        .name("photodex-http".into())
        .spawn(move || http::run(server, http_state))?;

    Ok((
        ServerHandle { state, http_thread: Some(http_thread) },
        url,
    ))
}
