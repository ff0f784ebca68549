//! Core library for the `clima` weather client.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The weather reading model and its provider decoding
//! - `WeatherFetcher`, which turns a city name or coordinates into a reading
//! - The location-provider and display-surface seams
//! - `AppController`, which wires input, location and fetcher to a display
//!
//! It is used by `clima-cli`, but any front end that implements
//! `WeatherDisplay` can drive it.

pub mod config;
pub mod controller;
pub mod display;
pub mod error;
pub mod fetcher;
pub mod location;
pub mod model;

pub use config::{ApiConfig, Config, LocationConfig, Units};
pub use controller::{AppController, AppEvent, EventSender};
pub use display::WeatherDisplay;
pub use error::{LocationError, WeatherError};
pub use fetcher::{WeatherFetcher, WeatherListener};
pub use location::{FixedLocation, IpLocator, LocationProvider};
pub use model::{ConditionIcon, Coordinates, WeatherModel};
