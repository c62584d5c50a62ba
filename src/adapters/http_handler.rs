use std::{net::SocketAddr, sync::Arc};

use axum::{
    Router,
    extract::{ConnectInfo, Request, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tower_http::trace::TraceLayer;

use crate::{
    core::{RequestContext, RobotsService},
    ports::http_server::HandlerError,
    tracing_setup::create_request_span,
};

/// Build the router serving the robots document at `/<file_name>`.
///
/// `GET` and `HEAD` are answered; every other path falls through to axum's 404.
pub fn router(service: Arc<RobotsService>) -> Router {
    let path = service.config().serve_path();
    tracing::debug!(%path, "mounting robots handler");

    Router::new()
        .route(&path, get(serve_robots))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            create_request_span(request.method().as_str(), request.uri().path())
        }))
        .with_state(service)
}

async fn serve_robots(
    State(service): State<Arc<RobotsService>>,
    request: Request,
) -> Result<Response, HandlerError> {
    let context = request_context(&request);
    let body = service.render_for_request(&context).await?;
    Ok(([(header::CONTENT_TYPE, "text/plain")], body).into_response())
}

/// Snapshot the parts of the request dynamic values may look at.
pub fn request_context(request: &Request) -> RequestContext {
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().host().map(str::to_string));

    RequestContext {
        method: request.method().clone(),
        path: request.uri().path().to_string(),
        host,
        headers: request.headers().clone(),
        client_addr: request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr),
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "failed to serve robots document");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}
