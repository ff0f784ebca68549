//! Wiring between user input, the location provider, the fetcher and the display.
//!
//! The controller owns the display and an event inbox. Whatever task drives
//! [`AppController::run`] (or [`AppController::step`]) is the only place the
//! display is mutated; background work such as HTTP requests and location
//! lookups reports back by sending [`AppEvent`]s into the inbox.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::{
    display::WeatherDisplay,
    error::{LocationError, WeatherError},
    fetcher::{WeatherFetcher, WeatherListener},
    location::LocationProvider,
    model::{Coordinates, WeatherModel},
};

/// Placeholder shown when an empty search is submitted.
pub const SEARCH_HINT: &str = "Type something";

#[derive(Debug)]
pub enum AppEvent {
    /// The search field now holds this text.
    SearchEdited(String),
    /// Search button or field commit.
    SearchSubmitted,
    LocationPressed,
    LocationUpdated(Coordinates),
    LocationFailed(LocationError),
    WeatherUpdated(WeatherModel),
    WeatherFailed(WeatherError),
    Shutdown,
}

pub type EventSender = mpsc::UnboundedSender<AppEvent>;

/// Forwards fetcher outcomes into the controller's inbox.
struct EventBridge(EventSender);

impl WeatherListener for EventBridge {
    fn on_weather_updated(&self, weather: WeatherModel) {
        if self.0.send(AppEvent::WeatherUpdated(weather)).is_err() {
            debug!("controller stopped; dropping weather update");
        }
    }

    fn on_weather_failed(&self, error: WeatherError) {
        if self.0.send(AppEvent::WeatherFailed(error)).is_err() {
            debug!("controller stopped; dropping weather failure");
        }
    }
}

pub struct AppController<D> {
    display: D,
    fetcher: WeatherFetcher,
    location: Arc<dyn LocationProvider>,
    sender: EventSender,
    inbox: mpsc::UnboundedReceiver<AppEvent>,
    // Keeps the fetcher's weak listener alive for as long as the controller exists.
    _listener: Arc<dyn WeatherListener>,
}

impl<D: WeatherDisplay> AppController<D> {
    pub fn new(display: D, mut fetcher: WeatherFetcher, location: Arc<dyn LocationProvider>) -> Self {
        let (sender, inbox) = mpsc::unbounded_channel();

        let listener: Arc<dyn WeatherListener> = Arc::new(EventBridge(sender.clone()));
        fetcher.set_listener(&listener);

        Self {
            display,
            fetcher,
            location,
            sender,
            inbox,
            _listener: listener,
        }
    }

    /// A sender for input sources (keyboard, buttons) to feed the controller.
    pub fn events(&self) -> EventSender {
        self.sender.clone()
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Launch sequence: ask for location permission, then locate once.
    pub fn start(&self) {
        let location = Arc::clone(&self.location);
        let sender = self.sender.clone();

        tokio::spawn(async move {
            let event = match location.request_permission().await {
                Ok(()) => locate(location.as_ref()).await,
                Err(err) => AppEvent::LocationFailed(err),
            };
            let _ = sender.send(event);
        });
    }

    /// Ask for a fresh location. Earlier pending requests are not cancelled.
    pub fn request_location(&self) {
        let location = Arc::clone(&self.location);
        let sender = self.sender.clone();

        tokio::spawn(async move {
            let _ = sender.send(locate(location.as_ref()).await);
        });
    }

    /// Fetch weather for the search field's contents and clear it.
    ///
    /// Empty (or whitespace-only) text is rejected: the hint is shown, nothing
    /// is fetched and the field keeps its text.
    pub fn submit_search(&mut self) -> Result<(), WeatherError> {
        let text = self.display.search_text();
        let city = text.trim();

        if city.is_empty() {
            self.display.show_search_hint(SEARCH_HINT);
            return Err(WeatherError::EmptySearch);
        }

        self.fetcher.fetch_by_city(city);
        self.display.set_search_text("");
        Ok(())
    }

    /// Wait for the next event and handle it. Returns `false` once shut down.
    pub async fn step(&mut self) -> bool {
        match self.inbox.recv().await {
            Some(event) => self.dispatch(event),
            None => false,
        }
    }

    /// Handle events until `Shutdown`, then hand the display back.
    pub async fn run(mut self) -> D {
        while self.step().await {}
        self.display
    }

    pub fn dispatch(&mut self, event: AppEvent) -> bool {
        match event {
            AppEvent::SearchEdited(text) => self.display.set_search_text(&text),
            AppEvent::SearchSubmitted => {
                if let Err(err) = self.submit_search() {
                    debug!(error = %err, "search rejected");
                }
            }
            AppEvent::LocationPressed => self.request_location(),
            AppEvent::LocationUpdated(coordinates) => {
                self.location.stop_updating();
                debug!(%coordinates, "location updated");
                self.fetcher
                    .fetch_by_coordinates(coordinates.latitude, coordinates.longitude);
            }
            AppEvent::LocationFailed(err) => self.report_failure(err.into()),
            AppEvent::WeatherUpdated(weather) => self.show_weather(&weather),
            AppEvent::WeatherFailed(err) => self.report_failure(err),
            AppEvent::Shutdown => return false,
        }

        true
    }

    fn show_weather(&mut self, weather: &WeatherModel) {
        self.display.set_temperature(&weather.temperature_string());
        self.display.set_condition_icon(weather.condition_icon());
        self.display.set_city(weather.city_name());
        self.display.refresh();
    }

    // The display keeps its last good reading.
    fn report_failure(&self, err: WeatherError) {
        error!(error = %err, hint = err.user_message(), "weather update failed");
    }
}

async fn locate(location: &dyn LocationProvider) -> AppEvent {
    match location.request_location().await {
        Ok(coordinates) => AppEvent::LocationUpdated(coordinates),
        Err(err) => AppEvent::LocationFailed(err),
    }
}
