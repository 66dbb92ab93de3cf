use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header::CONTENT_TYPE, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::extract::Extractor;
use crate::models::{ErrorBody, ProxyQuery};

/// Every path answers `GET ?url=...`. The CORS layer answers `OPTIONS`
/// itself and stamps `Access-Control-Allow-Origin: *` on all responses.
pub fn router(extractor: Extractor) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/", get(proxy_endpoint))
        .route("/*path", get(proxy_endpoint))
        .layer(cors)
        .with_state(extractor)
}

async fn proxy_endpoint(
    State(extractor): State<Extractor>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Response {
    let query = match query {
        Ok(Query(pairs)) => ProxyQuery::from_pairs(pairs),
        Err(rejection) => {
            tracing::warn!("rejected query string: {}", rejection);
            return (StatusCode::BAD_REQUEST, Json(ErrorBody::new(rejection.body_text())))
                .into_response();
        }
    };

    let Some(target) = query.url.filter(|u| !u.trim().is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody::new("Missing url parameter")),
        )
            .into_response();
    };

    let result = extractor.extract(&target).await;
    if result.success {
        tracing::info!(
            "Fetched: {} ({} paragraphs)",
            result.title,
            result.paragraph_count
        );
        (StatusCode::OK, Json(result)).into_response()
    } else {
        let detail = result.error_message.unwrap_or_default();
        tracing::error!(target_url = %target, "Error: {}", detail);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody::new(detail)),
        )
            .into_response()
    }
}
