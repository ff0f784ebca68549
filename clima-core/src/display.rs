use crate::model::ConditionIcon;

/// The surface the controller renders to: three weather outputs plus a search field.
///
/// Only ever called from the task that runs the `AppController`.
pub trait WeatherDisplay {
    fn set_temperature(&mut self, text: &str);
    fn set_city(&mut self, text: &str);
    fn set_condition_icon(&mut self, icon: ConditionIcon);

    fn search_text(&self) -> String;
    fn set_search_text(&mut self, text: &str);
    /// Show a placeholder prompting for input after a rejected submission.
    fn show_search_hint(&mut self, hint: &str);

    /// Called once after a complete weather update has been applied.
    fn refresh(&mut self) {}
}
