use std::io::{self, Write};
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use hyper::Body;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, trace, warn};

use crate::bundle::archive::{build_archive, ArchiveError};
use crate::bundle::inventory::{BundleInventory, BundleView};
use crate::config::{ConfigHandle, RepoConfig};
use crate::maven::pom::{render_dependency_fragment, render_parent_pom};
use crate::maven::repository::{serve, RepositoryError, RepositoryResponse};
use crate::maven::resolver::{resolve, ResolvedArtifacts};

const XML_CONTENT_TYPE: &str = "text/xml;charset=UTF-8";
const JAR_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub inventory: Arc<dyn BundleInventory>,
    pub config: Arc<ConfigHandle>,
}

/// `repository_path` and `dependencies_path` are absolute and have no trailing '/'
pub fn router(state: AppState, repository_path: &str, dependencies_path: &str) -> Router {
    Router::new()
        .route(dependencies_path, get(dependencies))
        .route(repository_path, get(repository_index))
        .route(&format!("{}/", repository_path), get(repository_index))
        .route(&format!("{}/*path", repository_path), get(repository))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PomQuery {
    group_id: Option<String>,
    artifact_id: Option<String>,
    version: Option<String>,
    dependencies_only: Option<String>,
}

async fn dependencies(State(state): State<AppState>, Query(query): Query<PomQuery>) -> Response {
    let dependencies_only = query.dependencies_only.as_deref() == Some("true");

    let rendered = with_resolved_artifacts(&state, move |artifacts, config| {
        if dependencies_only {
            return Ok(render_dependency_fragment(artifacts.iter(), config.scope_provided, ""));
        }
        Ok(render_parent_pom(
            query.group_id.as_deref().unwrap_or(""),
            query.artifact_id.as_deref().unwrap_or(""),
            query.version.as_deref().unwrap_or(""),
            &config.pom_defaults,
            artifacts.iter(),
            config.scope_provided,
            &config.dependency_output_prefix,
        ))
    }).await;

    match rendered {
        Ok(body) if dependencies_only => ([(CONTENT_TYPE, "text/plain;charset=UTF-8")], body).into_response(),
        Ok(body) => ([(CONTENT_TYPE, XML_CONTENT_TYPE)], body).into_response(),
        Err(e) => server_error(e),
    }
}

async fn repository(State(state): State<AppState>, uri: Uri, Path(path): Path<String>) -> Response {
    debug!("getting from repo: {}", path);

    match with_resolved_artifacts(&state, move |artifacts, _| serve(&path, artifacts)).await {
        Ok(RepositoryResponse::Pom(pom)) => ([(CONTENT_TYPE, XML_CONTENT_TYPE)], pom).into_response(),
        Ok(RepositoryResponse::Metadata(xml)) => ([(CONTENT_TYPE, XML_CONTENT_TYPE)], xml).into_response(),
        Ok(RepositoryResponse::Sha1(hex)) => ([(CONTENT_TYPE, "text/plain")], hex).into_response(),
        Ok(RepositoryResponse::Jar(bundle)) => {
            let mut response = hyper::Response::new(stream_archive(bundle));
            response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/java-archive"));
            response.into_response()
        }
        Err(e) if e.is_index_fallback() => {
            debug!("answering {} with the index page: {}", uri.path(), e);
            index_page(uri.path())
        }
        Err(e) => server_error(e),
    }
}

async fn repository_index(uri: Uri) -> Response {
    index_page(uri.path())
}

/// Resolves the current bundles with the current configuration and hands the result to `f`, all
///  on a blocking thread.
async fn with_resolved_artifacts<T, F>(state: &AppState, f: F) -> Result<T, RepositoryError>
where
    F: FnOnce(&ResolvedArtifacts, &RepoConfig) -> Result<T, RepositoryError> + Send + 'static,
    T: Send + 'static,
{
    // one snapshot per request, even if the configuration is reloaded meanwhile
    let config = state.config.current();
    let bundles = state.inventory.list_bundles().await
        .map_err(RepositoryError::Resolution)?;

    tokio::task::spawn_blocking(move || {
        let artifacts = resolve(&bundles, &config.mappings, &config.ignore_patterns)
            .map_err(RepositoryError::Resolution)?;
        f(&artifacts, &config)
    })
        .await
        .map_err(|e| RepositoryError::Resolution(e.into()))?
}

/// Builds the bundle's archive on a blocking thread while the client reads it. If building fails
///  half way the body is aborted, so the client sees a broken transfer rather than a short jar.
fn stream_archive(bundle: Arc<dyn BundleView>) -> Body {
    let (sender, body) = Body::channel();

    tokio::task::spawn_blocking(move || {
        let mut sink = BodyWriter::new(sender);
        let result = build_archive(bundle.as_ref(), &mut sink)
            .and_then(|sink| sink.flush().map_err(ArchiveError::from));
        match result {
            Ok(()) => trace!("sent archive of bundle {}", bundle.symbolic_name()),
            Err(e) => {
                warn!("aborting archive of bundle {}: {}", bundle.symbolic_name(), e);
                sink.abort();
            }
        }
    });
    body
}

/// Blocking [`Write`] adapter for a streaming response body. Bytes are collected into chunks of
///  [`JAR_CHUNK_SIZE`], and each chunk waits until the body has room for it.
struct BodyWriter {
    sender: hyper::body::Sender,
    pending: Vec<u8>,
}

impl BodyWriter {
    fn new(sender: hyper::body::Sender) -> BodyWriter {
        BodyWriter {
            sender,
            pending: Vec::with_capacity(JAR_CHUNK_SIZE),
        }
    }

    fn send_pending(&mut self) -> io::Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let chunk = Bytes::from(std::mem::replace(&mut self.pending, Vec::with_capacity(JAR_CHUNK_SIZE)));
        // fails once the client is gone
        futures::executor::block_on(self.sender.send_data(chunk))
            .map_err(|e| io::Error::new(io::ErrorKind::BrokenPipe, e))
    }

    fn abort(self) {
        self.sender.abort();
    }
}

impl Write for BodyWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        if self.pending.len() >= JAR_CHUNK_SIZE {
            self.send_pending()?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.send_pending()
    }
}

/// The page answered for anything that is not an artifact file. Maven treats it like a
///  directory listing, so it comes with status 200.
fn index_page(request_path: &str) -> Response {
    let request_path = escape_html(request_path);
    let html = format!(
        "<!DOCTYPE HTML PUBLIC \"-//W3C//DTD HTML 3.2 Final//EN\"><html><head><title>Index of {0}</title></head><body><h1>Index of {0}</h1><pre><hr></pre></body></html>",
        request_path,
    );
    (StatusCode::OK, [(CONTENT_TYPE, "text/html;charset=UTF-8")], html).into_response()
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn server_error(e: RepositoryError) -> Response {
    error!("{}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
}
