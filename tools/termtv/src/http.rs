//! Plain HTTP byte-serving for registered recordings.
//!
//! Paths look like `/builds/<build_id>/<url_name>[/...]`. Anything after the
//! viewer segment is accepted and ignored because each build carries exactly
//! one recording. A known build whose recording cannot be found answers with
//! an empty 200 body.

use crate::errors::TermtvError;
use crate::lifecycle::RecordingHandle;
use crate::logging::{log_event, JsonlLogger};
use crate::resolver::Resolution;
use crate::types::RecordingSource;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct BuildRegistry {
    builds: Mutex<BTreeMap<String, RecordingHandle>>,
}

impl BuildRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any handle already registered for the same build id.
    pub fn register(&self, handle: RecordingHandle) {
        let id = handle.build().build_id.clone();
        self.builds
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id, handle);
    }

    pub fn get(&self, build_id: &str) -> Option<RecordingHandle> {
        self.builds
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(build_id)
            .cloned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: Vec<u8>,
    pub source: Option<RecordingSource>,
}

impl HttpReply {
    fn empty(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
            source: None,
        }
    }
}

pub fn route(registry: &BuildRegistry, url: &str) -> HttpReply {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let segments = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>();

    let [prefix, build_id, viewer, ..] = segments.as_slice() else {
        return HttpReply::empty(404);
    };
    if *prefix != "builds" {
        return HttpReply::empty(404);
    }
    let Some(handle) = registry.get(build_id) else {
        return HttpReply::empty(404);
    };
    if *viewer != handle.viewer().url_name {
        return HttpReply::empty(404);
    }

    match handle.fetch() {
        Resolution::Found { source, bytes } => HttpReply {
            status: 200,
            body: bytes,
            source: Some(source),
        },
        Resolution::NotFound => HttpReply::empty(200),
    }
}

pub fn bind(addr: &str) -> Result<tiny_http::Server, TermtvError> {
    tiny_http::Server::http(addr).map_err(|e| TermtvError::Http(format!("bind {addr}: {e}")))
}

/// Answers requests one at a time until the server is unblocked.
pub fn serve(
    server: &tiny_http::Server,
    registry: &BuildRegistry,
    logger: Option<&JsonlLogger>,
) {
    for request in server.incoming_requests() {
        let url = request.url().to_string();
        let reply = route(registry, &url);
        log_event(
            logger,
            "info",
            "http_request",
            json!({
                "method": request.method().to_string(),
                "url": url,
                "status": reply.status,
                "bytes": reply.body.len(),
                "source": reply.source.map(RecordingSource::as_str),
            }),
        );

        let response = tiny_http::Response::from_data(reply.body).with_status_code(reply.status);
        if let Err(err) = request.respond(response) {
            log_event(
                logger,
                "warn",
                "http_respond_failed",
                json!({ "url": url, "error": err.to_string() }),
            );
        }
    }
}
