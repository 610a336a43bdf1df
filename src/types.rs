use serde::{Deserialize, Serialize};

pub const DEFAULT_INTERVAL_HOURS: f64 = 1.0;

/// One watched page. Loaded once from config, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteDescriptor {
    pub name: String,
    pub url: String,
    pub keywords: Vec<String>,
    #[serde(default = "default_interval_hours")]
    pub interval_hours: f64,
}

fn default_interval_hours() -> f64 {
    DEFAULT_INTERVAL_HOURS
}

impl SiteDescriptor {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        keywords: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            keywords: keywords.into_iter().map(Into::into).collect(),
            interval_hours: DEFAULT_INTERVAL_HOURS,
        }
    }

    pub fn with_interval_hours(mut self, hours: f64) -> Self {
        self.interval_hours = hours;
        self
    }
}
