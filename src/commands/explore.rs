use std::net::SocketAddr;
use std::path::Path;

use anyhow::Result;
use photodex_core::server;

/// Serve the HTTP explorer until the process is killed. The worker pool
/// runs on its own threads; the main thread just parks, and
/// relies on the default SIGINT disposition to end the process.
pub fn run(catalog: &Path, bind: SocketAddr) -> Result<()> {
    let (_handle, url) = server::start_server(catalog.to_path_buf(), bind)
        .map_err(|e| anyhow::anyhow!("failed to start HTTP explorer: {e}"))?;

    println!("serving {} at {url}", catalog.display());
    println!("press Ctrl+C to stop");

    loop {
        std::thread::park();
    }
}
