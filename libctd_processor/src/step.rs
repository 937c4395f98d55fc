use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;
use std::fmt;

use super::tool::Executable;

/// The order value of a step as entered by the user.
///
/// A configuration file may carry either a number or free text here. Only at run time is the
/// value required to be an integer; text that fails to parse rejects the whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StepOrder {
    Number(i64),
    Text(String),
}

impl StepOrder {
    /// Interpret the order as an integer
    pub fn value(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Any YAML value is accepted. Anything that is not an integer is kept as its text, so a bad
/// order never stops a configuration from loading.
impl<'de> Deserialize<'de> for StepOrder {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let order = match Value::deserialize(deserializer)? {
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Number(i),
                None => Self::Text(n.to_string()),
            },
            Value::String(s) => Self::Text(s),
            Value::Bool(b) => Self::Text(b.to_string()),
            Value::Null => Self::Text(String::new()),
            other => Self::Text(
                serde_yaml::to_string(&other)
                    .map(|s| s.trim().to_string())
                    .unwrap_or_default(),
            ),
        };
        Ok(order)
    }
}

impl Default for StepOrder {
    fn default() -> Self {
        Self::Number(1)
    }
}

impl fmt::Display for StepOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for StepOrder {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for StepOrder {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// One PSA configuration file and the settings that decide how (and if) it is run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingStep {
    pub config_file: String,
    pub executable: Option<Executable>,
    pub order: StepOrder,
    pub enabled: bool,
}

impl ProcessingStep {
    pub fn new(config_file: &str, order: StepOrder) -> Self {
        Self {
            config_file: config_file.to_string(),
            executable: None,
            order,
            enabled: true,
        }
    }

    /// Build the default step list for freshly scanned configuration files.
    ///
    /// Steps are enabled, have no executable and are ordered by their position (starting at 1).
    pub fn from_names(names: &[String]) -> Vec<Self> {
        names
            .iter()
            .enumerate()
            .map(|(idx, name)| Self::new(name, StepOrder::Number(idx as i64 + 1)))
            .collect()
    }

    /// Take over the user's choices from a previously saved step for the same file
    pub fn apply_saved(&mut self, saved: &ProcessingStep) {
        self.executable = saved.executable.clone();
        self.order = saved.order.clone();
        self.enabled = saved.enabled;
    }
}
