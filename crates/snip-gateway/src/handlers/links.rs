use crate::error::Result;
use crate::model::{CreateLinkRequest, CreateLinkResponse, LinkStatsResponse, ResolveLinkResponse};
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use snip_core::ShortCode;
use snip_service::ShortenRequest;
use tracing::info;

pub async fn create_link_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateLinkRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = payload?;
    let expiration = state.expiration_for(request.days_valid);

    let link = state
        .service()
        .shorten(ShortenRequest::new(request.long_url, expiration))
        .await?;

    let status = if link.created {
        info!(code = %link.code, "created short link");
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    let body = CreateLinkResponse {
        short_url: link.code.to_url(state.base_url()),
        code: link.code,
        long_url: link.long_url,
        expires_at: link.expires_at,
    };
    Ok((status, Json(body)).into_response())
}

pub async fn resolve_link_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ResolveLinkResponse>> {
    let code = ShortCode::new(code)?;
    let resolution = state.service().resolve(&code).await?;

    Ok(Json(ResolveLinkResponse {
        long_url: resolution.long_url,
        click_count: resolution.click_count,
    }))
}

pub async fn link_stats_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<LinkStatsResponse>> {
    let code = ShortCode::new(code)?;
    let stats = state.service().stats(&code).await?;

    Ok(Json(LinkStatsResponse {
        code: stats.code,
        long_url: stats.long_url,
        click_count: stats.click_count,
        created_at: stats.created_at,
        expires_at: stats.expires_at,
    }))
}
