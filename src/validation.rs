//! Strict validation of the `/send-location` body.
//!
//! The body is inspected as a raw JSON value so numeric strings can be
//! coerced and every problem can be collected before rejecting.

use serde_json::{Map, Value};
use url::Url;

pub const DEVICE_ID_MIN: usize = 8;
pub const DEVICE_ID_MAX: usize = 128;

const RECIPIENT_KEYS: &[&str] = &["to", "recipient"];
const DEVICE_KEYS: &[&str] = &["deviceId"];
const LATITUDE_KEYS: &[&str] = &["lat", "latitude"];
const LONGITUDE_KEYS: &[&str] = &["lon", "lng", "longitude"];
const MAP_URL_KEYS: &[&str] = &["mapUrl", "mapsUrl"];

/// A location report that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationReport {
    pub recipient: String,
    pub device_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub map_url: Option<Url>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: &'static str,
    pub message: String,
}

impl ValidationIssue {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

// First alias present in the object
fn field<'a>(body: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| body.get(*k))
}

/// Device id used by the per-device limiter, read before full validation.
pub fn device_key(body: &Value) -> Option<&str> {
    let obj = body.as_object()?;
    field(obj, DEVICE_KEYS)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

pub fn validate(body: &Value) -> Result<LocationReport, Vec<ValidationIssue>> {
    let Some(obj) = body.as_object() else {
        return Err(vec![ValidationIssue::new("body", "expected a JSON object")]);
    };

    let mut issues = Vec::new();

    let recipient = match field(obj, RECIPIENT_KEYS) {
        Some(Value::String(s)) if is_valid_email(s.trim()) => Some(s.trim().to_string()),
        Some(_) => {
            issues.push(ValidationIssue::new("recipient", "not a valid email address"));
            None
        }
        None => {
            issues.push(ValidationIssue::new("recipient", "required"));
            None
        }
    };

    let device_id = match field(obj, DEVICE_KEYS) {
        Some(Value::String(s)) => {
            let len = s.chars().count();
            if (DEVICE_ID_MIN..=DEVICE_ID_MAX).contains(&len) {
                Some(s.clone())
            } else {
                issues.push(ValidationIssue::new(
                    "deviceId",
                    format!("length must be {}-{}, got {}", DEVICE_ID_MIN, DEVICE_ID_MAX, len),
                ));
                None
            }
        }
        Some(_) => {
            issues.push(ValidationIssue::new("deviceId", "must be a string"));
            None
        }
        None => {
            issues.push(ValidationIssue::new("deviceId", "required"));
            None
        }
    };

    let latitude = coordinate(field(obj, LATITUDE_KEYS), "latitude", 90.0, &mut issues);
    let longitude = coordinate(field(obj, LONGITUDE_KEYS), "longitude", 180.0, &mut issues);

    let map_url = match field(obj, MAP_URL_KEYS) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => match parse_map_url(s.trim()) {
            Some(url) => Some(url),
            None => {
                issues.push(ValidationIssue::new("mapUrl", "not a valid http(s) URL"));
                None
            }
        },
        Some(_) => {
            issues.push(ValidationIssue::new("mapUrl", "must be a string"));
            None
        }
    };

    match (recipient, device_id, latitude, longitude) {
        (Some(recipient), Some(device_id), Some(latitude), Some(longitude))
            if issues.is_empty() =>
        {
            Ok(LocationReport {
                recipient,
                device_id,
                latitude,
                longitude,
                map_url,
            })
        }
        _ => Err(issues),
    }
}

// Accepts JSON numbers and numeric strings, finite and within [-limit, limit]
fn coordinate(
    value: Option<&Value>,
    name: &'static str,
    limit: f64,
    issues: &mut Vec<ValidationIssue>,
) -> Option<f64> {
    let parsed = match value {
        None => {
            issues.push(ValidationIssue::new(name, "required"));
            return None;
        }
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    let Some(v) = parsed else {
        issues.push(ValidationIssue::new(name, "must be numeric"));
        return None;
    };
    if !v.is_finite() {
        issues.push(ValidationIssue::new(name, "must be finite"));
        return None;
    }
    if !(-limit..=limit).contains(&v) {
        issues.push(ValidationIssue::new(name, format!("must be within [-{limit}, {limit}]")));
        return None;
    }
    Some(v)
}

fn parse_map_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw).ok()?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Some(url),
        _ => None,
    }
}

/// Syntactic email check: one `@`, a sane local part and a dotted domain.
pub fn is_valid_email(email: &str) -> bool {
    if email.len() > 254 || email.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || local.len() > 64 || domain.contains('@') {
        return false;
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }
    let local_ok = local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "!#$%&'*+-/=?^_`{|}~.".contains(c));
    if !local_ok {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}
