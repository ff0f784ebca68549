use reqwest::Client;
use serde::Deserialize;
use std::{
    fmt,
    sync::{Arc, Weak},
};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    config::ApiConfig,
    error::WeatherError,
    model::{Coordinates, WeatherModel},
};

/// Receives exactly one outcome per issued request.
///
/// Called from the background task that ran the request; implementations
/// that touch a display must hand the value over to the display's own task.
pub trait WeatherListener: Send + Sync {
    fn on_weather_updated(&self, weather: WeatherModel);
    fn on_weather_failed(&self, error: WeatherError);
}

/// Builds provider URLs, runs the HTTP call and reports the outcome to a listener.
#[derive(Clone)]
pub struct WeatherFetcher {
    config: ApiConfig,
    http: Client,
    listener: Option<Weak<dyn WeatherListener>>,
}

impl fmt::Debug for WeatherFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeatherFetcher")
            .field("endpoint", &self.config.endpoint)
            .field("units", &self.config.units)
            .field("has_listener", &self.listener.is_some())
            .finish_non_exhaustive()
    }
}

impl WeatherFetcher {
    pub fn new(config: ApiConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    pub fn with_client(config: ApiConfig, http: Client) -> Self {
        Self {
            config,
            http,
            listener: None,
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Register the listener. Only a weak reference is kept; the caller owns it.
    pub fn set_listener(&mut self, listener: &Arc<dyn WeatherListener>) {
        self.listener = Some(Arc::downgrade(listener));
    }

    pub fn city_url(&self, city_name: &str) -> Result<Url, WeatherError> {
        let mut url = self.config.base_url()?;
        url.query_pairs_mut().append_pair("q", city_name);
        Ok(url)
    }

    pub fn coordinates_url(&self, latitude: f64, longitude: f64) -> Result<Url, WeatherError> {
        if !Coordinates::new(latitude, longitude).is_finite() {
            return Err(WeatherError::MalformedUrl(format!(
                "non-finite coordinates ({latitude}, {longitude})"
            )));
        }

        let mut url = self.config.base_url()?;
        url.query_pairs_mut()
            .append_pair("lat", &latitude.to_string())
            .append_pair("lon", &longitude.to_string());
        Ok(url)
    }

    /// Request weather for a city. `None` means the URL could not be built and
    /// nothing was sent; the listener is not notified in that case.
    pub fn fetch_by_city(&self, city_name: &str) -> Option<JoinHandle<()>> {
        self.issue(self.city_url(city_name))
    }

    /// Request weather for a coordinate pair. Same `None` contract as `fetch_by_city`.
    pub fn fetch_by_coordinates(&self, latitude: f64, longitude: f64) -> Option<JoinHandle<()>> {
        self.issue(self.coordinates_url(latitude, longitude))
    }

    /// Spawn the request on the runtime and return immediately.
    pub fn perform_request(&self, url: Url) -> JoinHandle<()> {
        let fetcher = self.clone();
        tokio::spawn(async move {
            let outcome = fetcher.fetch(url).await;
            fetcher.notify(outcome);
        })
    }

    /// Run one request to completion.
    pub async fn fetch(&self, url: Url) -> Result<WeatherModel, WeatherError> {
        debug!(url = %redacted(&url), "requesting current weather");

        let res = self.http.get(url).send().await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(WeatherError::Status {
                status: status.as_u16(),
                message: provider_message(&body),
            });
        }

        WeatherModel::from_response(&body, self.config.units)
    }

    fn issue(&self, url: Result<Url, WeatherError>) -> Option<JoinHandle<()>> {
        match url {
            Ok(url) => Some(self.perform_request(url)),
            Err(err) => {
                warn!(error = %err, "weather request not issued");
                None
            }
        }
    }

    fn notify(&self, outcome: Result<WeatherModel, WeatherError>) {
        let Some(listener) = self.listener.as_ref().and_then(Weak::upgrade) else {
            debug!("no weather listener registered; dropping outcome");
            return;
        };

        match outcome {
            Ok(weather) => {
                info!(
                    city = weather.city_name(),
                    temperature = weather.temperature(),
                    condition = weather.condition_id(),
                    "weather updated"
                );
                listener.on_weather_updated(weather);
            }
            Err(err) => listener.on_weather_failed(err),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwErrorBody {
    message: String,
}

/// The provider's `message` field when present, otherwise the start of the body.
fn provider_message(body: &str) -> String {
    match serde_json::from_str::<OwErrorBody>(body) {
        Ok(err) => err.message,
        Err(_) => truncate_body(body),
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    } else {
        body.to_string()
    }
}

/// The URL without its API key, for logs.
fn redacted(url: &Url) -> String {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "appid")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut safe = url.clone();
    safe.query_pairs_mut().clear().extend_pairs(pairs);
    safe.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Units;
    use serde_json::json;
    use tokio::sync::mpsc;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    type Outcome = Result<WeatherModel, WeatherError>;

    struct Recorder(mpsc::UnboundedSender<Outcome>);

    impl WeatherListener for Recorder {
        fn on_weather_updated(&self, weather: WeatherModel) {
            let _ = self.0.send(Ok(weather));
        }

        fn on_weather_failed(&self, error: WeatherError) {
            let _ = self.0.send(Err(error));
        }
    }

    fn fetcher_for(endpoint: &str) -> WeatherFetcher {
        WeatherFetcher::new(ApiConfig::new("TEST_KEY").with_endpoint(endpoint))
    }

    fn attach_recorder(
        fetcher: &mut WeatherFetcher,
    ) -> (Arc<dyn WeatherListener>, mpsc::UnboundedReceiver<Outcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let listener: Arc<dyn WeatherListener> = Arc::new(Recorder(tx));
        fetcher.set_listener(&listener);
        (listener, rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Outcome>) -> Vec<Outcome> {
        let mut out = Vec::new();
        while let Ok(outcome) = rx.try_recv() {
            out.push(outcome);
        }
        out
    }

    async fn provider() -> (MockServer, String) {
        let server = MockServer::start().await;
        let endpoint = format!("{}/data/2.5/weather", server.uri());
        (server, endpoint)
    }

    #[test]
    fn city_url_percent_encodes_the_name() {
        let fetcher = fetcher_for("https://api.openweathermap.org/data/2.5/weather");
        let city = "São Paulo & Co/1";

        let url = fetcher.city_url(city).expect("url builds");

        assert!(url.as_str().contains("appid=TEST_KEY&units=imperial&q=S%C3%A3o+Paulo+%26+Co%2F1"));
        let q: Vec<String> = url
            .query_pairs()
            .filter(|(k, _)| k == "q")
            .map(|(_, v)| v.into_owned())
            .collect();
        assert_eq!(q, vec![city.to_string()]);
    }

    #[test]
    fn coordinates_url_formats_decimal_degrees() {
        let fetcher = fetcher_for("https://api.openweathermap.org/data/2.5/weather");

        let url = fetcher.coordinates_url(51.5074, -0.1278).expect("url builds");

        assert!(url.as_str().ends_with("&lat=51.5074&lon=-0.1278"));
        assert!(!url.as_str().contains("q="));
    }

    #[test]
    fn non_finite_coordinates_are_malformed() {
        let fetcher = fetcher_for("https://api.openweathermap.org/data/2.5/weather");

        let err = fetcher.coordinates_url(f64::NAN, 10.0).unwrap_err();
        assert!(matches!(err, WeatherError::MalformedUrl(_)));
    }

    #[test]
    fn redacted_url_hides_api_key() {
        let fetcher = fetcher_for("https://api.openweathermap.org/data/2.5/weather");
        let url = fetcher.city_url("Oslo").expect("url builds");

        let logged = redacted(&url);
        assert!(!logged.contains("TEST_KEY"));
        assert!(logged.contains("q=Oslo"));
    }

    #[test]
    fn provider_message_prefers_json_message() {
        assert_eq!(
            provider_message(r#"{"cod":"404","message":"city not found"}"#),
            "city not found"
        );
        let long = "x".repeat(300);
        assert_eq!(provider_message(&long).len(), 203);
    }

    #[tokio::test]
    async fn malformed_endpoint_issues_nothing_and_notifies_nobody() {
        let mut fetcher = fetcher_for("not a url");
        let (_listener, mut rx) = attach_recorder(&mut fetcher);

        assert!(fetcher.fetch_by_city("London").is_none());
        assert!(fetcher.fetch_by_coordinates(1.0, 2.0).is_none());

        tokio::task::yield_now().await;
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn city_fetch_reports_one_success() {
        let (server, endpoint) = provider().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("q", "London"))
            .and(query_param("appid", "TEST_KEY"))
            .and(query_param("units", "imperial"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "weather": [{"id": 800}],
                "main": {"temp": 72.3},
                "name": "London"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut fetcher = fetcher_for(&endpoint);
        let (_listener, mut rx) = attach_recorder(&mut fetcher);

        fetcher
            .fetch_by_city("London")
            .expect("request issued")
            .await
            .expect("task completes");

        let outcomes = drain(&mut rx);
        assert_eq!(outcomes.len(), 1);
        let weather = outcomes.into_iter().next().unwrap().expect("success");
        assert_eq!(weather.city_name(), "London");
        assert_eq!(weather.condition_id(), 800);
        assert_eq!(weather.temperature_string(), "72°");
    }

    #[tokio::test]
    async fn coordinate_fetch_sends_lat_and_lon() {
        let (server, endpoint) = provider().await;
        Mock::given(method("GET"))
            .and(query_param("lat", "48.8566"))
            .and(query_param("lon", "2.3522"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "weather": [{"id": 500}],
                "main": {"temp": 14.0},
                "name": "Paris"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = ApiConfig::new("TEST_KEY")
            .with_endpoint(endpoint)
            .with_units(Units::Metric);
        let mut fetcher = WeatherFetcher::new(config);
        let (_listener, mut rx) = attach_recorder(&mut fetcher);

        fetcher
            .fetch_by_coordinates(48.8566, 2.3522)
            .expect("request issued")
            .await
            .expect("task completes");

        let weather = drain(&mut rx).pop().expect("one outcome").expect("success");
        assert_eq!(weather.city_name(), "Paris");
        assert_eq!(weather.units(), Units::Metric);
        assert_eq!(weather.temperature_detail(), "14.0°C");
    }

    #[tokio::test]
    async fn transport_error_reports_exactly_one_failure() {
        // Nothing listens on port 1.
        let mut fetcher = fetcher_for("http://127.0.0.1:1/data/2.5/weather");
        let (_listener, mut rx) = attach_recorder(&mut fetcher);

        fetcher
            .fetch_by_city("London")
            .expect("request issued")
            .await
            .expect("task completes");

        let outcomes = drain(&mut rx);
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(outcomes[0], Err(WeatherError::Transport(_))));
    }

    #[tokio::test]
    async fn empty_condition_list_reports_parse_failure() {
        let (server, endpoint) = provider().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "weather": [],
                "main": {"temp": 3.0},
                "name": "Reykjavik"
            })))
            .mount(&server)
            .await;

        let mut fetcher = fetcher_for(&endpoint);
        let (_listener, mut rx) = attach_recorder(&mut fetcher);

        fetcher.fetch_by_city("Reykjavik").expect("request issued").await.unwrap();

        let outcomes = drain(&mut rx);
        assert_eq!(outcomes.len(), 1);
        match &outcomes[0] {
            Err(err) => assert!(err.is_parse()),
            Ok(weather) => panic!("expected parse failure, got {weather:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_city_reports_provider_status() {
        let (server, endpoint) = provider().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(json!({"cod": "404", "message": "city not found"})),
            )
            .mount(&server)
            .await;

        let fetcher = fetcher_for(&endpoint);
        let url = fetcher.city_url("Atlantis").unwrap();

        let err = fetcher.fetch(url).await.unwrap_err();
        match err {
            WeatherError::Status { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "city not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn dropped_listener_is_not_called() {
        let (server, endpoint) = provider().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "weather": [{"id": 800}],
                "main": {"temp": 20.0},
                "name": "Lisbon"
            })))
            .mount(&server)
            .await;

        let mut fetcher = fetcher_for(&endpoint);
        let (listener, mut rx) = attach_recorder(&mut fetcher);
        drop(listener);

        fetcher.fetch_by_city("Lisbon").expect("request issued").await.unwrap();

        assert!(drain(&mut rx).is_empty());
    }
}
