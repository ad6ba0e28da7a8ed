use serde::{Deserialize, Serialize};
use validator::Validate;

/// Static configuration for one station entity. Defined once in the run
/// configuration, never mutated or deleted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StationConfig {
    #[validate(length(min = 1))]
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,

    #[serde(default)]
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,

    /// Parameter feeds this station subscribes to; empty means all feeds.
    #[serde(default)]
    pub parameters: Vec<String>,
}

impl StationConfig {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: None,
            latitude: None,
            longitude: None,
            parameters: Vec::new(),
        }
    }

    pub fn subscribes_to(&self, parameter: &str) -> bool {
        self.parameters.is_empty() || self.parameters.iter().any(|p| p == parameter)
    }
}
