use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use clima_core::{
    AppController, Config, FixedLocation, IpLocator, LocationProvider, Units, WeatherFetcher,
};
use inquire::{Confirm, Password, PasswordDisplayMode, Select};
use std::sync::Arc;
use tracing::warn;

use crate::{
    display::{TerminalDisplay, render_card},
    repl,
};

const LOCATION_QUESTION: &str =
    "Allow clima to look up your approximate location from your IP address?";

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "clima", version, about = "Current weather for a city or your location")]
pub struct Cli {
    /// Defaults to `interactive`.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Search cities line by line; `:here` uses your location, `:quit` exits.
    Interactive,

    /// Show the current weather once.
    Show {
        /// City name, e.g. "London" or "Paris,FR".
        #[arg(conflicts_with_all = ["lat", "lon"])]
        city: Option<String>,

        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,

        /// Use your current location.
        #[arg(long, conflicts_with_all = ["city", "lat", "lon"])]
        here: bool,

        /// Override the configured unit system (imperial, metric, standard).
        #[arg(long, value_parser = parse_units)]
        units: Option<Units>,
    },

    /// Store the API key, unit system and location permission.
    Configure,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command.unwrap_or(Command::Interactive) {
            Command::Interactive => interactive().await,
            Command::Show {
                city,
                lat,
                lon,
                here,
                units,
            } => show(city, lat.zip(lon), here, units).await,
            Command::Configure => configure(),
        }
    }
}

fn parse_units(value: &str) -> Result<Units, String> {
    Units::try_from(value).map_err(|e| e.to_string())
}

async fn interactive() -> Result<()> {
    let mut config = Config::load()?;
    let api = config.api_config()?;
    ensure_location_permission(&mut config)?;

    let display = TerminalDisplay::default();
    println!("Type a city and press enter. `:here` for your location, `:quit` to exit.");
    display.prompt();

    let controller = AppController::new(display, WeatherFetcher::new(api), location_provider(&config));
    repl::spawn_input(controller.events());
    controller.start();
    controller.run().await;

    Ok(())
}

async fn show(
    city: Option<String>,
    coordinates: Option<(f64, f64)>,
    here: bool,
    units: Option<Units>,
) -> Result<()> {
    let mut config = Config::load()?;
    let mut api = config.api_config()?;
    if let Some(units) = units {
        api = api.with_units(units);
    }
    let fetcher = WeatherFetcher::new(api);

    let url = match (city, coordinates, here) {
        (_, _, true) => {
            ensure_location_permission(&mut config)?;
            let here = location_provider(&config)
                .request_location()
                .await
                .context("Could not determine your location")?;
            fetcher.coordinates_url(here.latitude, here.longitude)?
        }
        (_, Some((lat, lon)), false) => fetcher.coordinates_url(lat, lon)?,
        (Some(city), None, false) => {
            let city = city.trim();
            if city.is_empty() {
                bail!("City name must not be empty.");
            }
            fetcher.city_url(city)?
        }
        (None, None, false) => bail!("Give a city name, --lat and --lon, or --here."),
    };

    let weather = fetcher
        .fetch(url)
        .await
        .context("Failed to fetch current weather")?;

    println!("{}", render_card(&weather));
    Ok(())
}

fn configure() -> Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("OpenWeather API key:")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .prompt()
        .context("API key prompt aborted")?;
    let api_key = api_key.trim();
    if api_key.is_empty() {
        bail!("API key must not be empty.");
    }
    config.set_api_key(api_key.to_string());

    let current = Units::all()
        .iter()
        .position(|u| *u == config.units)
        .unwrap_or(0);
    config.units = Select::new("Unit system:", Units::all().to_vec())
        .with_starting_cursor(current)
        .prompt()
        .context("Unit prompt aborted")?;

    if config.fixed_location().is_none() {
        let allowed = Confirm::new(LOCATION_QUESTION)
            .with_default(config.location_allowed())
            .prompt()
            .context("Location prompt aborted")?;
        config.location.allowed = Some(allowed);
    }

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());

    Ok(())
}

/// Ask once for location permission and remember the answer.
fn ensure_location_permission(config: &mut Config) -> Result<()> {
    if config.location.allowed.is_some() || config.fixed_location().is_some() {
        return Ok(());
    }

    let answer = Confirm::new(LOCATION_QUESTION)
        .with_default(true)
        .prompt();

    match answer {
        Ok(allowed) => {
            config.location.allowed = Some(allowed);
            config.save()
        }
        // Non-interactive stdin: leave the question open for next time.
        Err(err) => {
            warn!(error = %err, "location permission prompt unavailable");
            Ok(())
        }
    }
}

fn location_provider(config: &Config) -> Arc<dyn LocationProvider> {
    match config.fixed_location() {
        Some(coordinates) => Arc::new(FixedLocation(coordinates)),
        None => Arc::new(IpLocator::new(config.location_allowed())),
    }
}
