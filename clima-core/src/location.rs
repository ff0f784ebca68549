//! Where the device is.
//!
//! Locations are single-shot: each `request_location` yields one coordinate
//! pair or an error, and nothing more arrives until it is called again.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::{error::LocationError, model::Coordinates};

/// Approximate geolocation by public IP address.
pub const IP_LOOKUP_ENDPOINT: &str = "http://ip-api.com/json/";

#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Ask for permission to locate the device.
    async fn request_permission(&self) -> Result<(), LocationError>;

    /// Resolve the current location once.
    async fn request_location(&self) -> Result<Coordinates, LocationError>;

    /// Suppress further updates until the next `request_location`.
    fn stop_updating(&self) {}
}

/// A location pinned in configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedLocation(pub Coordinates);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn request_permission(&self) -> Result<(), LocationError> {
        Ok(())
    }

    async fn request_location(&self) -> Result<Coordinates, LocationError> {
        Ok(self.0)
    }
}

/// Looks the device up by its public IP, if the user allowed it.
#[derive(Debug, Clone)]
pub struct IpLocator {
    http: Client,
    endpoint: String,
    allowed: bool,
}

impl IpLocator {
    pub fn new(allowed: bool) -> Self {
        Self {
            http: Client::new(),
            endpoint: IP_LOOKUP_ENDPOINT.to_string(),
            allowed,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

#[async_trait]
impl LocationProvider for IpLocator {
    async fn request_permission(&self) -> Result<(), LocationError> {
        if self.allowed {
            Ok(())
        } else {
            Err(LocationError::PermissionDenied)
        }
    }

    async fn request_location(&self) -> Result<Coordinates, LocationError> {
        self.request_permission().await?;

        debug!(endpoint = %self.endpoint, "looking up location by ip");

        let res = self
            .http
            .get(&self.endpoint)
            .query(&[("fields", "status,message,lat,lon")])
            .send()
            .await
            .map_err(|e| LocationError::Unavailable(format!("ip lookup failed: {e}")))?;

        let status = res.status();
        if !status.is_success() {
            return Err(LocationError::Unavailable(format!(
                "ip lookup returned status {status}"
            )));
        }

        let body: IpApiResponse = res
            .json()
            .await
            .map_err(|e| LocationError::Unavailable(format!("invalid ip lookup response: {e}")))?;

        if body.status != "success" {
            let reason = body.message.unwrap_or_else(|| "lookup failed".to_string());
            return Err(LocationError::Unavailable(reason));
        }

        match (body.lat, body.lon) {
            (Some(latitude), Some(longitude)) => Ok(Coordinates::new(latitude, longitude)),
            _ => Err(LocationError::Unavailable(
                "ip lookup response had no coordinates".to_string(),
            )),
        }
    }
}
