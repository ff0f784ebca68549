use thiserror::Error;

/// Failures produced while locating the device.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("location permission was denied")]
    PermissionDenied,

    #[error("location unavailable: {0}")]
    Unavailable(String),
}

/// Every failure a single weather request (or the input that triggers it) can end in.
///
/// None of these are fatal: the controller logs them and keeps showing the
/// last good reading.
#[derive(Debug, Error)]
pub enum WeatherError {
    /// The search field was empty (or whitespace) when submitted.
    #[error("search text is empty")]
    EmptySearch,

    #[error("failed to reach weather provider: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("weather provider returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("failed to parse weather response: {0}")]
    Parse(#[from] serde_json::Error),

    /// The response decoded, but its `weather` list was empty.
    #[error("weather response contained no conditions")]
    NoConditions,

    #[error(transparent)]
    Location(#[from] LocationError),

    #[error("invalid request url: {0}")]
    MalformedUrl(String),
}

impl WeatherError {
    /// True for failures caused by a response that did not match the provider schema.
    pub fn is_parse(&self) -> bool {
        matches!(self, WeatherError::Parse(_) | WeatherError::NoConditions)
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherError::EmptySearch => "Type something",
            WeatherError::Transport(_) => "Unable to connect. Check your internet connection.",
            WeatherError::Status { status: 404, .. } => "City not found.",
            WeatherError::Status { status: 401, .. } => {
                "The weather provider rejected the API key. Run `clima configure`."
            }
            WeatherError::Status { .. } => "The weather provider could not answer. Try again later.",
            WeatherError::Parse(_) | WeatherError::NoConditions => {
                "Received an unexpected response from the weather provider."
            }
            WeatherError::Location(LocationError::PermissionDenied) => {
                "Location access is turned off."
            }
            WeatherError::Location(LocationError::Unavailable(_)) => {
                "Your location could not be determined."
            }
            WeatherError::MalformedUrl(_) => "The weather request could not be built.",
        }
    }
}

impl From<url::ParseError> for WeatherError {
    fn from(err: url::ParseError) -> Self {
        WeatherError::MalformedUrl(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_conditions_count_as_parse_failure() {
        assert!(WeatherError::NoConditions.is_parse());
        assert!(!WeatherError::EmptySearch.is_parse());
    }

    #[test]
    fn location_error_display_is_passed_through() {
        let err = WeatherError::from(LocationError::Unavailable("no fix".into()));
        assert_eq!(err.to_string(), "location unavailable: no fix");
        assert_eq!(err.user_message(), "Your location could not be determined.");
    }

    #[test]
    fn url_parse_errors_become_malformed_url() {
        let err = WeatherError::from(url::ParseError::RelativeUrlWithoutBase);
        assert!(matches!(err, WeatherError::MalformedUrl(_)));
    }

    #[test]
    fn not_found_status_has_specific_message() {
        let err = WeatherError::Status { status: 404, message: "city not found".into() };
        assert_eq!(err.user_message(), "City not found.");
        assert!(err.to_string().contains("city not found"));
    }
}
