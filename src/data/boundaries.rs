//! Boundary GeoJSON download.
//!
//! The county boundary document is fetched once at startup. Nothing renders
//! it yet, so every failure here is logged and otherwise ignored.

use serde::Deserialize;
use std::sync::mpsc::{channel, Receiver};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum BoundaryError {
    #[error("Failed to download boundaries: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Boundary document is not valid GeoJSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Expected a FeatureCollection, got '{0}'")]
    NotFeatureCollection(String),
}

/// Minimal view of a GeoJSON FeatureCollection.
#[derive(Debug, Clone, Deserialize)]
pub struct BoundaryCollection {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub features: Vec<BoundaryFeature>,
}

/// Only the geometry is kept; ids and properties are skipped.
#[derive(Debug, Clone, Deserialize)]
pub struct BoundaryFeature {
    #[serde(default)]
    pub geometry: Option<serde_json::Value>,
}

impl BoundaryCollection {
    pub fn from_json(bytes: &[u8]) -> Result<Self, BoundaryError> {
        let collection: Self = serde_json::from_slice(bytes)?;
        if collection.kind != "FeatureCollection" {
            return Err(BoundaryError::NotFeatureCollection(collection.kind));
        }
        Ok(collection)
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    /// Features that carry a geometry object.
    pub fn drawable_count(&self) -> usize {
        self.features.iter().filter(|f| f.geometry.is_some()).count()
    }
}

/// Blocking download of the boundary document.
pub fn fetch_boundaries(url: &str, timeout: Duration) -> Result<BoundaryCollection, BoundaryError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()?;
    let bytes = client.get(url).send()?.error_for_status()?.bytes()?;
    BoundaryCollection::from_json(&bytes)
}

/// Download in a background thread; the receiver yields exactly one result.
pub fn spawn_fetch(url: String, timeout: Duration) -> Receiver<Result<BoundaryCollection, String>> {
    let (tx, rx) = channel();

    thread::spawn(move || {
        let result = match fetch_boundaries(&url, timeout) {
            Ok(collection) => {
                info!(
                    url = %url,
                    features = collection.feature_count(),
                    "Boundary GeoJSON loaded"
                );
                Ok(collection)
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Boundary GeoJSON unavailable, continuing without it");
                Err(e.to_string())
            }
        };
        let _ = tx.send(result);
    });

    rx
}
