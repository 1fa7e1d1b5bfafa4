pub mod browse;
pub mod register;
pub mod resolve;

use ferrous_mdns_domain::ServiceInfo;
use serde_json::{json, Value};

/// JSON view of a resolved service, properties rendered as strings.
pub fn service_json(info: &ServiceInfo) -> Value {
    let properties: serde_json::Map<String, Value> = info
        .properties
        .iter()
        .map(|(key, value)| {
            (
                String::from_utf8_lossy(key).into_owned(),
                Value::String(String::from_utf8_lossy(value.as_bytes()).into_owned()),
            )
        })
        .collect();

    json!({
        "name": info.name,
        "service_type": info.service_type,
        "server": info.server,
        "address": info.address.map(|ip| ip.to_string()),
        "port": info.port,
        "priority": info.priority,
        "weight": info.weight,
        "properties": properties,
    })
}
