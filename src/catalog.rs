//! Startup load of the endpoint catalog.
//!
//! The catalog is a JSON document listing payment-gated endpoints and
//! their advertised payment options. It is fetched once when a session
//! starts; a missing or malformed catalog is not fatal, the session
//! simply starts with no endpoints listed.

use tracing::{debug, instrument, warn};
use url::Url;
use x402_probe_types::EndpointDescriptor;

/// Errors produced while fetching or decoding the catalog document.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to fetch catalog: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Failed to decode catalog document: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Fetches and decodes the catalog document from `catalog_url`.
#[instrument(skip(client), fields(url = %catalog_url))]
pub async fn fetch_catalog(
    client: &reqwest::Client,
    catalog_url: &Url,
) -> Result<Vec<EndpointDescriptor>, CatalogError> {
    let body = client
        .get(catalog_url.clone())
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    let endpoints: Vec<EndpointDescriptor> = serde_json::from_str(&body)?;
    debug!(count = endpoints.len(), "Loaded endpoint catalog");
    Ok(endpoints)
}

/// Loads the catalog, degrading to an empty list on any failure.
///
/// Catalog problems are logged and swallowed so that a broken catalog
/// host does not prevent the session from starting.
pub async fn load_catalog(client: &reqwest::Client, catalog_url: &Url) -> Vec<EndpointDescriptor> {
    match fetch_catalog(client, catalog_url).await {
        Ok(endpoints) => endpoints,
        Err(error) => {
            warn!(%catalog_url, %error, "Catalog unavailable, starting with no endpoints");
            Vec::new()
        }
    }
}
