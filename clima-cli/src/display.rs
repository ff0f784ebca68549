use chrono::Local;
use clima_core::{ConditionIcon, WeatherDisplay, WeatherModel};
use std::io::{self, Write};

const PROMPT: &str = "city> ";

/// Terminal rendition of the weather screen.
#[derive(Debug, Default)]
pub struct TerminalDisplay {
    temperature: String,
    city: String,
    icon: Option<ConditionIcon>,
    search: String,
}

impl TerminalDisplay {
    pub fn prompt(&self) {
        print!("{PROMPT}");
        let _ = io::stdout().flush();
    }
}

impl WeatherDisplay for TerminalDisplay {
    fn set_temperature(&mut self, text: &str) {
        self.temperature = text.to_string();
    }

    fn set_city(&mut self, text: &str) {
        self.city = text.to_string();
    }

    fn set_condition_icon(&mut self, icon: ConditionIcon) {
        self.icon = Some(icon);
    }

    fn search_text(&self) -> String {
        self.search.clone()
    }

    fn set_search_text(&mut self, text: &str) {
        self.search = text.to_string();
    }

    fn show_search_hint(&mut self, hint: &str) {
        println!("  ({hint})");
        self.prompt();
    }

    fn refresh(&mut self) {
        let symbol = self.icon.map(glyph).unwrap_or(" ");
        println!("\n  {symbol}  {}  {}", self.temperature, self.city);
        self.prompt();
    }
}

pub fn glyph(icon: ConditionIcon) -> &'static str {
    match icon {
        ConditionIcon::Thunderstorm => "⛈",
        ConditionIcon::Drizzle => "🌦",
        ConditionIcon::Rain => "🌧",
        ConditionIcon::Snow => "❄",
        ConditionIcon::Fog => "🌫",
        ConditionIcon::Clear => "☀",
        ConditionIcon::Clouds | ConditionIcon::Unknown => "☁",
    }
}

/// Multi-line summary for one-shot output.
pub fn render_card(weather: &WeatherModel) -> String {
    let icon = weather.condition_icon();
    let mut card = format!(
        "{}  {}  {}\n   {} ({})",
        glyph(icon),
        weather.temperature_string(),
        weather.city_name(),
        weather.temperature_detail(),
        icon.name(),
    );

    if let Some(observed) = weather.observed_at() {
        let local = observed.with_timezone(&Local);
        card.push_str(&format!(", observed {}", local.format("%H:%M")));
    }

    card
}
