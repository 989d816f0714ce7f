//! `GET /live2d/<path>` (§6): raw static byte serving for the avatar asset
//! collaborator (§1) — out of scope to build a real asset pipeline, but the
//! route itself is real, so it gets real path-traversal guarding.

use crate::app::AppState;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::path::{Component, Path as StdPath, PathBuf};
use std::sync::Arc;
use tracing::instrument;

fn resolve(base: &str, requested: &str) -> Option<PathBuf> {
    let base = StdPath::new(base);
    let mut resolved = base.to_path_buf();
    for component in StdPath::new(requested).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            // `..`, root, and prefix components would escape the asset
            // directory; refuse rather than try to canonicalize around them.
            _ => return None,
        }
    }
    Some(resolved)
}

#[instrument(skip(app))]
pub async fn serve(State(app): State<Arc<AppState>>, Path(path): Path<String>) -> Response {
    let Some(full_path) = resolve(&app.config.gateway.live2d_dir, &path) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match tokio::fs::read(&full_path).await {
        Ok(bytes) => {
            let mime = mime_guess_by_ext(&full_path);
            ([(header::CONTENT_TYPE, mime)], bytes).into_response()
        }
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

fn mime_guess_by_ext(path: &StdPath) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("png") => "image/png",
        Some("json") => "application/json",
        Some("moc3") => "application/octet-stream",
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        _ => "application/octet-stream",
    }
}
