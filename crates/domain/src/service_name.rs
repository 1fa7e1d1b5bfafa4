//! DNS-SD naming rules (RFC 6763 §7, RFC 6335 §5.1).

use crate::errors::DomainError;

/// Meta-query name used to enumerate the service types on a link.
pub const SERVICE_TYPE_ENUMERATION: &str = "_services._dns-sd._udp.local.";

pub const MAX_LABEL_LEN: usize = 63;
pub const MAX_NAME_LEN: usize = 255;
const MAX_SERVICE_LABEL_LEN: usize = 15;

const TRAILERS: [&str; 2] = ["._tcp.local.", "._udp.local."];

/// Validate a service type (optionally prefixed by an instance or subtype)
/// and return the bare `_<service>._<proto>.local.` part.
///
/// Accepted forms:
/// - `_http._tcp.local.`
/// - `<subtype>._sub._http._tcp.local.`
/// - `<instance>._http._tcp.local.`
pub fn service_type_name(type_: &str) -> Result<String, DomainError> {
    let bad = |reason: &str| DomainError::BadTypeInName(format!("{:?}: {}", type_, reason));

    let trailer = TRAILERS
        .iter()
        .find(|t| type_.ends_with(*t))
        .ok_or_else(|| bad("must end with '._tcp.local.' or '._udp.local.'"))?;

    let mut remaining: Vec<&str> = type_[..type_.len() - trailer.len()].split('.').collect();
    let service = remaining.pop().unwrap_or_default();

    validate_service_label(service).map_err(|reason| bad(reason))?;

    if remaining.len() == 1 && remaining[0].is_empty() {
        return Err(bad("service names cannot start with '.'"));
    }

    if remaining.last() == Some(&"_sub") {
        remaining.pop();
        if remaining.first().map_or(true, |first| first.is_empty()) {
            return Err(bad("_sub requires a subtype name"));
        }
    }

    if !remaining.is_empty() {
        let prefix = remaining.join(".");
        if prefix.len() > MAX_LABEL_LEN {
            return Err(bad("instance or subtype part is longer than 63 bytes"));
        }
        if prefix.chars().any(|c| c.is_ascii_control()) {
            return Err(bad("instance or subtype part contains control characters"));
        }
    }

    Ok(format!("{}{}", service, trailer))
}

fn validate_service_label(service: &str) -> Result<(), &'static str> {
    let label = service
        .strip_prefix('_')
        .ok_or("service label must start with '_'")?;

    if label.is_empty() {
        return Err("service label is empty");
    }
    if label.len() > MAX_SERVICE_LABEL_LEN {
        return Err("service label is longer than 15 bytes");
    }
    if label.contains("--") {
        return Err("service label contains consecutive hyphens");
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Err("service label starts or ends with a hyphen");
    }
    if !label.bytes().any(|b| b.is_ascii_alphabetic()) {
        return Err("service label must contain a letter");
    }
    if !label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
        return Err("service label may only contain letters, digits and hyphens");
    }
    Ok(())
}

/// Check the length limits of a domain name as it will be encoded.
///
/// A trailing dot is allowed; empty interior labels are not.
pub fn validate_domain_name(name: &str) -> Result<(), DomainError> {
    let trimmed = name.strip_suffix('.').unwrap_or(name);
    if trimmed.is_empty() {
        return Err(DomainError::InvalidName(format!("{:?} is empty", name)));
    }

    let mut encoded_len = 1;
    for label in trimmed.split('.') {
        if label.is_empty() {
            return Err(DomainError::InvalidName(format!(
                "{:?} contains an empty label",
                name
            )));
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(DomainError::NamePartTooLong(format!(
                "label {:?} is {} bytes",
                label,
                label.len()
            )));
        }
        encoded_len += label.len() + 1;
    }

    if encoded_len > MAX_NAME_LEN {
        return Err(DomainError::NamePartTooLong(format!(
            "name {:?} is {} bytes",
            name, encoded_len
        )));
    }
    Ok(())
}

/// Split a fully qualified instance name into its instance label and the
/// type it was registered under.
pub fn split_instance_name<'a>(name: &'a str, service_type: &str) -> Option<&'a str> {
    name.strip_suffix(service_type)
        .and_then(|prefix| prefix.strip_suffix('.'))
        .filter(|instance| !instance.is_empty())
}
