use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{config::Units, error::WeatherError};

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// Symbolic icon for a provider condition code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionIcon {
    Thunderstorm,
    Drizzle,
    Rain,
    Snow,
    Fog,
    Clear,
    Clouds,
    Unknown,
}

impl ConditionIcon {
    /// Map an OpenWeather condition id to its icon.
    /// See: https://openweathermap.org/weather-conditions
    pub fn from_condition_id(id: i32) -> Self {
        match id {
            200..=232 => Self::Thunderstorm,
            300..=321 => Self::Drizzle,
            500..=531 => Self::Rain,
            600..=622 => Self::Snow,
            701..=781 => Self::Fog,
            800 => Self::Clear,
            801..=804 => Self::Clouds,
            _ => Self::Unknown,
        }
    }

    /// Symbol identifier understood by display surfaces.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Thunderstorm => "cloud.bolt",
            Self::Drizzle => "cloud.drizzle",
            Self::Rain => "cloud.rain",
            Self::Snow => "cloud.snow",
            Self::Fog => "cloud.fog",
            Self::Clear => "sun.max",
            Self::Clouds | Self::Unknown => "cloud",
        }
    }
}

/// A normalized current-weather reading.
///
/// Only produced by [`WeatherModel::from_response`]; immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherModel {
    condition_id: i32,
    city_name: String,
    temperature: f64,
    units: Units,
    observed_at: Option<DateTime<Utc>>,
}

impl WeatherModel {
    pub(crate) fn new(condition_id: i32, city_name: String, temperature: f64, units: Units) -> Self {
        Self {
            condition_id,
            city_name,
            temperature,
            units,
            observed_at: None,
        }
    }

    /// Decode a provider response body. Only the first `weather` entry is consulted.
    pub fn from_response(body: &str, units: Units) -> Result<Self, WeatherError> {
        let parsed: OwCurrentResponse = serde_json::from_str(body)?;

        let condition = parsed.weather.first().ok_or(WeatherError::NoConditions)?;

        let mut model = Self::new(condition.id, parsed.name, parsed.main.temp, units);
        model.observed_at = parsed.dt.and_then(|ts| DateTime::from_timestamp(ts, 0));

        Ok(model)
    }

    pub fn condition_id(&self) -> i32 {
        self.condition_id
    }

    pub fn city_name(&self) -> &str {
        &self.city_name
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn units(&self) -> Units {
        self.units
    }

    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        self.observed_at
    }

    /// Display label rounded to whole degrees, e.g. `72°`.
    pub fn temperature_string(&self) -> String {
        // `as i64` on a rounded value also folds -0.0 into 0.
        format!("{}°", self.temperature.round() as i64)
    }

    /// One decimal place plus the unit suffix, e.g. `72.3°F`.
    pub fn temperature_detail(&self) -> String {
        format!("{:.1}{}", self.temperature, self.units.suffix())
    }

    pub fn condition_icon(&self) -> ConditionIcon {
        ConditionIcon::from_condition_id(self.condition_id)
    }
}

#[derive(Debug, Deserialize)]
struct OwCondition {
    id: i32,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    weather: Vec<OwCondition>,
    main: OwMain,
    name: String,
    dt: Option<i64>,
}
