use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStateChange {
    Added,
    Removed,
    Updated,
}

impl ServiceStateChange {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStateChange::Added => "added",
            ServiceStateChange::Removed => "removed",
            ServiceStateChange::Updated => "updated",
        }
    }
}

impl fmt::Display for ServiceStateChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A browse notification: one instance of `service_type` changed state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEvent {
    pub service_type: String,
    pub name: String,
    pub state: ServiceStateChange,
}

impl ServiceEvent {
    pub fn new(
        service_type: impl Into<String>,
        name: impl Into<String>,
        state: ServiceStateChange,
    ) -> Self {
        Self {
            service_type: service_type.into(),
            name: name.into(),
            state,
        }
    }
}
