// src/server/routes.rs

use std::convert::Infallible;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use axum::Router;
use axum::extract::{Request, State};
use axum::http::{Method, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use futures::stream::Stream;
use percent_encoding::percent_decode_str;
use regex::Regex;
use tokio::sync::{broadcast, watch};
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tracing::{debug, warn};

use crate::server::reload::ReloadHandle;

pub const EVENTS_PATH: &str = "/__sitepipe/events";
pub const CLIENT_PATH: &str = "/__sitepipe/client.js";

static BODY_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</body>").expect("valid regex"));

const CLIENT_JS: &str = r#"(function () {
  var NOTIFY = __SITEPIPE_NOTIFY__;

  function notice(text) {
    if (!NOTIFY || !document.body) return;
    var el = document.createElement('div');
    el.textContent = text;
    el.style.cssText = 'position:fixed;top:0;right:0;z-index:9999;padding:6px 12px;' +
      'background:#1990b8;color:#fff;font:13px sans-serif';
    document.body.appendChild(el);
    setTimeout(function () { el.remove(); }, 1500);
  }

  function injectCss(name) {
    var found = false;
    document.querySelectorAll('link[rel="stylesheet"]').forEach(function (link) {
      var url = new URL(link.href);
      if (url.pathname.split('/').pop() === name) {
        url.searchParams.set('sitepipe', Date.now());
        link.href = url.toString();
        found = true;
      }
    });
    return found;
  }

  var source = new EventSource('/__sitepipe/events');
  source.addEventListener('reload', function (e) {
    var msg = JSON.parse(e.data);
    if (msg.type === 'inject' && msg.paths.length > 0 &&
        msg.paths.every(function (p) { return /\.css$/i.test(p); })) {
      var injected = msg.paths.filter(injectCss);
      if (injected.length === msg.paths.length) {
        notice('Injected: ' + injected.join(', '));
        return;
      }
    }
    notice('Reloading');
    location.reload();
  });
})();
"#;

#[derive(Debug, Clone)]
pub struct ServerState {
    pub base_dir: PathBuf,
    pub reload: ReloadHandle,
    pub notify: bool,
    pub shutdown: watch::Receiver<bool>,
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route(EVENTS_PATH, get(events_handler))
        .route(CLIENT_PATH, get(client_handler))
        .fallback(static_handler)
        .with_state(state)
}

/// SSE endpoint; one subscription per connected page.
async fn events_handler(
    State(state): State<ServerState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.reload.subscribe();
    let mut shutdown = state.shutdown.clone();

    let stream = async_stream::stream! {
        yield Ok(Event::default().event("connected").data("{}"));

        loop {
            let stop = *shutdown.borrow_and_update();
            if stop {
                break;
            }

            let next = tokio::select! {
                msg = rx.recv() => Ok(msg),
                changed = shutdown.changed() => Err(changed.is_err()),
            };

            match next {
                Ok(Ok(event)) => match serde_json::to_string(&event) {
                    Ok(json) => {
                        yield Ok(Event::default().event("reload").data(json));
                    }
                    Err(e) => warn!(error = %e, "failed to serialise reload event"),
                },
                Ok(Err(broadcast::error::RecvError::Lagged(n))) => {
                    warn!(skipped = n, "reload client lagged; some events dropped");
                }
                Ok(Err(broadcast::error::RecvError::Closed)) => break,
                // Shutdown sender gone.
                Err(true) => break,
                // Flag changed; re-checked at the top of the loop.
                Err(false) => {}
            }
        }

        debug!("reload event stream closed");
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

async fn client_handler(State(state): State<ServerState>) -> impl IntoResponse {
    let js = CLIENT_JS.replace(
        "__SITEPIPE_NOTIFY__",
        if state.notify { "true" } else { "false" },
    );
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        js,
    )
}

/// HTML pages get the client script; everything else goes to `ServeDir`.
async fn static_handler(State(state): State<ServerState>, req: Request) -> Response {
    if req.method() == Method::GET || req.method() == Method::HEAD {
        if let Some(page) = html_page(&state.base_dir, req.uri().path()) {
            match tokio::fs::read_to_string(&page).await {
                Ok(html) => return Html(inject_client(&html)).into_response(),
                Err(e) => {
                    debug!(path = %page.display(), error = %e, "could not read page; falling back");
                }
            }
        }
    }

    match ServeDir::new(&state.base_dir)
        .append_index_html_on_directories(true)
        .oneshot(req)
        .await
    {
        Ok(res) => res.into_response(),
        Err(never) => match never {},
    }
}

/// Map a request path to an HTML file under `base`, if it names one. The
/// path is percent-decoded first, the same way `ServeDir` resolves it.
fn html_page(base: &Path, uri_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(uri_path).decode_utf8().ok()?;
    let rel = Path::new(decoded.trim_start_matches('/'));
    if rel
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return None;
    }

    let mut path = base.join(rel);
    if path.is_dir() {
        path.push("index.html");
    }

    let is_html = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"));

    (is_html && path.is_file()).then_some(path)
}

/// Insert the reload client before `</body>`, or append it.
pub fn inject_client(html: &str) -> String {
    let tag = format!(r#"<script src="{CLIENT_PATH}"></script>"#);
    if BODY_CLOSE.is_match(html) {
        BODY_CLOSE
            .replace(html, |caps: &regex::Captures<'_>| format!("{tag}{}", &caps[0]))
            .into_owned()
    } else {
        format!("{html}{tag}")
    }
}
