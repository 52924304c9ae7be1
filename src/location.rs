// src/location.rs
//! Distance filtering against a target location

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::core::LocationConfig;
use crate::types::Distance;

/// Mean Earth radius (IUGG)
const EARTH_RADIUS_KM: f64 = 6371.0088;
const GEOCODER_USER_AGENT: &str = concat!("job-matcher/", env!("CARGO_PKG_VERSION"));
const MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Great-circle distance in kilometers
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("geocoder returned HTTP {0}")]
    Status(u16),

    #[error("no match for '{0}'")]
    NotFound(String),

    #[error("invalid coordinates in geocoder response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, query: &str) -> Result<Coordinates, GeocodeError>;
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

/// OpenStreetMap Nominatim search. Requests are spaced at least one second apart.
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
    last_request: Mutex<Option<Instant>>,
}

impl NominatimGeocoder {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(GEOCODER_USER_AGENT)
            .timeout(Duration::from_secs(20))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            last_request: Mutex::new(None),
        })
    }

    /// Wait until at least `MIN_REQUEST_INTERVAL` has passed since the previous request
    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < MIN_REQUEST_INTERVAL {
                tokio::time::sleep(MIN_REQUEST_INTERVAL - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, query: &str) -> Result<Coordinates, GeocodeError> {
        self.throttle().await;

        debug!("Geocoding '{}'", query);
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status().as_u16()));
        }

        let places: Vec<NominatimPlace> = response.json().await?;
        let place = places
            .into_iter()
            .next()
            .ok_or_else(|| GeocodeError::NotFound(query.to_string()))?;

        match (place.lat.parse::<f64>(), place.lon.parse::<f64>()) {
            (Ok(lat), Ok(lon)) => Ok(Coordinates { lat, lon }),
            _ => Err(GeocodeError::InvalidResponse(format!("{}, {}", place.lat, place.lon))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DistanceCheck {
    Keep(Distance),
    /// Outside the radius, with the measured distance
    Reject(f64),
}

/// Radius filter around a geocoded target. Each distinct city is geocoded once per run.
pub struct LocationFilter {
    geocoder: Box<dyn Geocoder>,
    target: Coordinates,
    max_distance_km: f64,
    cache: HashMap<String, Option<Coordinates>>,
}

impl LocationFilter {
    /// Geocode the target. When that fails, filtering is disabled and `None` is returned.
    pub async fn new(geocoder: Box<dyn Geocoder>, config: &LocationConfig) -> Option<Self> {
        match geocoder.geocode(config.target.trim()).await {
            Ok(target) => {
                info!(
                    "Geocoded target location: {} -> ({:.4}, {:.4}), radius {} km",
                    config.target, target.lat, target.lon, config.max_distance_km
                );
                Some(Self {
                    geocoder,
                    target,
                    max_distance_km: config.max_distance_km,
                    cache: HashMap::new(),
                })
            }
            Err(e) => {
                warn!(
                    "Failed to geocode target location '{}': {}. Location filtering disabled",
                    config.target, e
                );
                None
            }
        }
    }

    /// Unknown cities are kept with `Distance::Unknown`
    pub async fn check(&mut self, city: &str) -> DistanceCheck {
        let key = city.trim();
        if key.is_empty() {
            debug!("Job has no city, keeping with unknown distance");
            return DistanceCheck::Keep(Distance::Unknown);
        }

        let coords = match self.cache.get(key) {
            Some(cached) => *cached,
            None => {
                let looked_up = match self.geocoder.geocode(key).await {
                    Ok(coords) => Some(coords),
                    Err(e) => {
                        warn!("Failed to geocode job location '{}': {}", key, e);
                        None
                    }
                };
                self.cache.insert(key.to_string(), looked_up);
                looked_up
            }
        };

        let Some(coords) = coords else {
            return DistanceCheck::Keep(Distance::Unknown);
        };

        let km = haversine_km(self.target, coords);
        if km > self.max_distance_km {
            DistanceCheck::Reject(km)
        } else {
            DistanceCheck::Keep(Distance::Known(km))
        }
    }
}
