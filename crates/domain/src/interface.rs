use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// Which local interfaces multicast traffic is sent and received on.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "InterfaceSetting", into = "InterfaceSetting")]
pub enum InterfaceChoice {
    /// Every IPv4 interface reported by the OS.
    #[default]
    All,
    /// Let the OS pick (INADDR_ANY).
    Default,
    /// An explicit set of interface addresses; empty means detached.
    List(Vec<IpAddr>),
}

impl InterfaceChoice {
    pub fn is_detached(&self) -> bool {
        matches!(self, InterfaceChoice::List(addrs) if addrs.is_empty())
    }
}

impl fmt::Display for InterfaceChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterfaceChoice::All => f.write_str("all"),
            InterfaceChoice::Default => f.write_str("default"),
            InterfaceChoice::List(addrs) => {
                let joined: Vec<String> = addrs.iter().map(ToString::to_string).collect();
                f.write_str(&joined.join(","))
            }
        }
    }
}

impl FromStr for InterfaceChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(InterfaceChoice::All),
            "default" => Ok(InterfaceChoice::Default),
            "" | "none" => Ok(InterfaceChoice::List(Vec::new())),
            list => list
                .split(',')
                .map(|addr| {
                    addr.trim()
                        .parse::<IpAddr>()
                        .map_err(|e| format!("Invalid interface address '{}': {}", addr, e))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(InterfaceChoice::List),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum InterfaceSetting {
    Keyword(String),
    Addresses(Vec<IpAddr>),
}

impl TryFrom<InterfaceSetting> for InterfaceChoice {
    type Error = String;

    fn try_from(setting: InterfaceSetting) -> Result<Self, Self::Error> {
        match setting {
            InterfaceSetting::Keyword(keyword) => keyword.parse(),
            InterfaceSetting::Addresses(addrs) => Ok(InterfaceChoice::List(addrs)),
        }
    }
}

impl From<InterfaceChoice> for InterfaceSetting {
    fn from(choice: InterfaceChoice) -> Self {
        match choice {
            InterfaceChoice::All => InterfaceSetting::Keyword("all".to_string()),
            InterfaceChoice::Default => InterfaceSetting::Keyword("default".to_string()),
            InterfaceChoice::List(addrs) => InterfaceSetting::Addresses(addrs),
        }
    }
}
