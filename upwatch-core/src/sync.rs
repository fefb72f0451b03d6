//! Fetching the dashboard's row list.
//!
//! The status endpoint is preferred. A 404 from it means the richer contract
//! isn't deployed, so the plain target list is used instead and every row's
//! liveness is left unknown. Failures that don't say "401" outright are
//! checked against `/auth/me` before being reported, because the API does not
//! reliably distinguish an expired session from other errors.

use crate::row::ViewRow;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use upwatch_client::client::paths;
use upwatch_client::{
    ApiClient, ApiError, RequestOptions, Response, StatusCode, Target, TargetStatus,
};

pub const GENERIC_LOAD_ERROR: &str = "Failed to load";

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Ready(Vec<ViewRow>),
    AuthFailed,
    Errored(String),
}

enum Fetched {
    Rows(Vec<ViewRow>),
    AuthFailed,
}

/// Run one full synchronization. Requests are issued strictly one after another.
pub async fn synchronize(client: &ApiClient) -> SyncOutcome {
    match fetch_rows(client).await {
        Ok(Fetched::Rows(rows)) => {
            debug!("Synchronized {} row(s)", rows.len());
            SyncOutcome::Ready(rows)
        }
        Ok(Fetched::AuthFailed) => {
            info!("Session rejected while loading targets");
            SyncOutcome::AuthFailed
        }
        Err(message) => disambiguate(client, message).await,
    }
}

async fn fetch_rows(client: &ApiClient) -> Result<Fetched, String> {
    let response = client
        .raw_request(paths::TARGETS_STATUS, RequestOptions::get())
        .await
        .map_err(|e| e.to_string())?;

    match response.status() {
        StatusCode::UNAUTHORIZED => Ok(Fetched::AuthFailed),
        status if status.is_success() => {
            let statuses: Vec<TargetStatus> = decode(response).await?;
            Ok(Fetched::Rows(
                statuses.into_iter().map(ViewRow::Enriched).collect(),
            ))
        }
        StatusCode::NOT_FOUND => {
            debug!("Status endpoint not available, falling back to plain target list");
            fetch_bare_rows(client).await
        }
        status => Err(format!("Status {}", status.as_u16())),
    }
}

async fn fetch_bare_rows(client: &ApiClient) -> Result<Fetched, String> {
    let response = client
        .raw_request(paths::TARGETS, RequestOptions::get())
        .await
        .map_err(|e| e.to_string())?;

    match response.status() {
        StatusCode::UNAUTHORIZED => Ok(Fetched::AuthFailed),
        status if status.is_success() => {
            let targets: Vec<Target> = decode(response).await?;
            Ok(Fetched::Rows(targets.into_iter().map(ViewRow::Bare).collect()))
        }
        _ => Err("Failed to load targets".to_string()),
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, String> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ApiError::from(e).to_string())?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()).to_string())
}

/// Ask `/auth/me` whether an ambiguous failure was really a lost session.
async fn disambiguate(client: &ApiClient, message: String) -> SyncOutcome {
    warn!("Loading targets failed: {}", message);

    match client.raw_request(paths::AUTH_ME, RequestOptions::get()).await {
        Ok(me) if me.status() == StatusCode::UNAUTHORIZED => {
            info!("Identity check says the session has expired");
            SyncOutcome::AuthFailed
        }
        _ => {
            let message = if message.trim().is_empty() {
                GENERIC_LOAD_ERROR.to_string()
            } else {
                message
            };
            SyncOutcome::Errored(message)
        }
    }
}
