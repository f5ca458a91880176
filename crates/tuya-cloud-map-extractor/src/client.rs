//! Cloud map fetch
//!
//! The cloud client itself lives outside this crate. The flow only needs
//! one blocking call that either returns the current map or says which
//! credential was wrong.

use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::answers::DeviceIdentity;
use crate::header::MapHeader;
use crate::server::ServerRegion;

/// Rendered map returned next to the header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapImage(pub Vec<u8>);

/// Why a map could not be fetched
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("the cloud rejected the client id")]
    BadClientId,

    #[error("the cloud rejected the client secret")]
    BadClientSecret,

    #[error("device not found or not owned by this project")]
    BadDeviceId,

    #[error("credentials do not belong to this server region")]
    BadServer,

    #[error("map fetch failed: {0}")]
    Unknown(String),
}

/// Blocking access to the Tuya cloud map
pub trait MapFetcher: Send + Sync + 'static {
    fn fetch_map(
        &self,
        server: ServerRegion,
        client_id: &str,
        client_secret: &str,
        device_id: &str,
    ) -> Result<(MapHeader, MapImage), FetchError>;
}

/// Fetch the map for `identity` on the blocking thread pool
pub async fn fetch_map_header(
    fetcher: Arc<dyn MapFetcher>,
    identity: &DeviceIdentity,
) -> Result<(MapHeader, MapImage), FetchError> {
    let identity = identity.clone();
    debug!(
        "Fetching map header for device {} on {}",
        identity.device_id, identity.server
    );

    tokio::task::spawn_blocking(move || {
        fetcher.fetch_map(
            identity.server,
            &identity.client_id,
            &identity.client_secret,
            &identity.device_id,
        )
    })
    .await
    .map_err(|e| FetchError::Unknown(format!("fetch task failed: {}", e)))?
}
