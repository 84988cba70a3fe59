//! Catalog existence check.
//!
//! Asks the TavernaStream API whether a TMDB title is already present in the
//! local catalog: `GET /api/media/check/{tmdbId}/{mediaType}` returning
//! `{ "exists": bool }`.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::models::progress::MediaType;

/// Answers whether a title exists in the catalog.
#[cfg_attr(test, mockall::automock)]
pub trait CatalogChecker {
    fn exists(&self, tmdb_id: u64, media_type: MediaType) -> Result<bool>;
}

#[derive(Debug, Deserialize)]
struct CatalogCheckResponse {
    exists: bool,
}

pub struct HttpCatalogClient {
    client: Client,
    base_url: String,
}

impl HttpCatalogClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build catalog HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn check_url(&self, tmdb_id: u64, media_type: MediaType) -> String {
        format!(
            "{}/api/media/check/{}/{}",
            self.base_url.trim_end_matches('/'),
            tmdb_id,
            media_type
        )
    }
}

impl CatalogChecker for HttpCatalogClient {
    fn exists(&self, tmdb_id: u64, media_type: MediaType) -> Result<bool> {
        let url = self.check_url(tmdb_id, media_type);

        let response = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("Network error during catalog check for {}", url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!(
                "Catalog check for {} failed with HTTP status {}",
                url,
                status
            ));
        }

        let body: CatalogCheckResponse = response
            .json()
            .with_context(|| format!("Catalog check for {} returned an unexpected body", url))?;

        Ok(body.exists)
    }
}
