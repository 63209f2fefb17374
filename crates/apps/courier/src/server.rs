//! Blocking HTTP server on a fixed pool of worker threads
//!
//! All workers share one tiny_http listener and pull requests from it
//! independently, so a slow aggregate call only occupies its own worker.

use anyhow::{Result, anyhow};
use log::{debug, error, info, warn};
use std::io::Read;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tiny_http::{Header, Request, Response, Server};

use crate::http::{HttpRequest, HttpResponse};
use crate::routes;
use crate::settings::ServerConfig;
use crate::state::AppState;

/// Request bodies beyond this are truncated; the API only takes tiny JSON
const MAX_BODY_BYTES: u64 = 64 * 1024;

/// Bind the listener and serve until every worker exits
pub fn run(config: &ServerConfig, state: AppState) -> Result<()> {
    let addr = config.bind_addr();
    let server = Server::http(&addr).map_err(|e| anyhow!("Failed to bind {}: {}", addr, e))?;
    let server = Arc::new(server);
    let state = Arc::new(state);

    info!("Courier listening on http://{} with {} workers", addr, config.workers);

    let workers = (0..config.workers)
        .map(|i| {
            let server = Arc::clone(&server);
            let state = Arc::clone(&state);
            thread::Builder::new()
                .name(format!("http-{}", i))
                .spawn(move || serve(&server, &state))
        })
        .collect::<std::io::Result<Vec<_>>>()?;

    for worker in workers {
        if worker.join().is_err() {
            error!("HTTP worker exited with a panic");
        }
    }
    Ok(())
}

fn serve(server: &Server, state: &AppState) {
    loop {
        match server.recv() {
            Ok(request) => respond(state, request),
            Err(e) => {
                error!("Listener failed, stopping worker: {}", e);
                return;
            }
        }
    }
}

fn respond(state: &AppState, mut request: Request) {
    let started = Instant::now();
    let incoming = into_http_request(&mut request);

    let response = panic::catch_unwind(AssertUnwindSafe(|| routes::handle(state, &incoming)))
        .unwrap_or_else(|_| {
            error!("Handler for {} {} panicked", incoming.method, incoming.path);
            HttpResponse::json(500, &serde_json::json!({ "error": "Internal server error" }))
        });

    info!(
        "{} {} -> {} ({}ms)",
        incoming.method,
        incoming.path,
        response.status,
        started.elapsed().as_millis()
    );

    if let Err(e) = request.respond(into_tiny_response(response)) {
        warn!("Failed to write response: {}", e);
    }
}

fn into_http_request(request: &mut Request) -> HttpRequest {
    let mut body = Vec::new();
    if let Err(e) = request
        .as_reader()
        .take(MAX_BODY_BYTES)
        .read_to_end(&mut body)
    {
        debug!("Failed to read request body: {}", e);
    }

    request
        .headers()
        .iter()
        .fold(
            HttpRequest::new(request.method().as_str(), request.url()),
            |req, header| req.with_header(header.field.as_str().as_str(), header.value.as_str()),
        )
        .with_body(body)
}

fn into_tiny_response(response: HttpResponse) -> Response<std::io::Cursor<Vec<u8>>> {
    let mut tiny = Response::from_data(response.body).with_status_code(response.status);
    for (name, value) in &response.headers {
        match Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            Ok(header) => tiny.add_header(header),
            Err(()) => warn!("Dropping invalid response header {}", name),
        }
    }
    tiny
}
