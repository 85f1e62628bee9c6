use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// A `certificate_id` as the upstream understands it: the id of an existing
/// certificate, or the literal `"new"` asking the upstream to provision one
/// while it creates the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateRef {
    Existing(u64),
    New,
}

impl CertificateRef {
    /// Reads a reference out of a raw JSON field. `0` is a valid id; the
    /// upstream uses it for "no certificate".
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().map(Self::Existing),
            Value::String(s) if s == "new" => Some(Self::New),
            _ => None,
        }
    }

    pub fn as_value(self) -> Value {
        match self {
            Self::Existing(id) => Value::from(id),
            Self::New => Value::from("new"),
        }
    }
}

impl fmt::Display for CertificateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Existing(id) => write!(f, "{id}"),
            Self::New => f.write_str("new"),
        }
    }
}

impl Serialize for CertificateRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Existing(id) => serializer.serialize_u64(*id),
            Self::New => serializer.serialize_str("new"),
        }
    }
}

impl<'de> Deserialize<'de> for CertificateRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value)
            .ok_or_else(|| D::Error::custom(format!("expected an integer or \"new\", got {value}")))
    }
}

/// The handful of fields shared by every upstream listing entry, for
/// compact human-facing output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceSummary {
    pub id: u64,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub domain_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ResourceSummary {
    /// Reads the common fields out of one upstream entry. Anything without
    /// an id is not a summarizable entry.
    pub fn from_value(entry: &Value) -> Option<Self> {
        let id = entry.get("id")?.as_u64()?;
        // Upstream `enabled` arrives as a boolean or as 0/1 depending on
        // the kind; entries without the field count as enabled.
        let enabled = entry.get("enabled").is_none_or(lenient_bool);
        let domain_names = entry
            .get("domain_names")
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();
        let name = entry
            .get("name")
            .or_else(|| entry.get("nice_name"))
            .and_then(Value::as_str)
            .map(str::to_owned);

        Some(Self {
            id,
            enabled,
            domain_names,
            name,
        })
    }

    /// A one-line label: domain names when present, else the name, else
    /// just the id.
    pub fn label(&self) -> String {
        if !self.domain_names.is_empty() {
            return self.domain_names.join(", ");
        }
        match &self.name {
            Some(name) => name.clone(),
            None => format!("#{id}", id = self.id),
        }
    }
}

fn lenient_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64() != Some(0),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_certificate_ref_reads_both_shapes() {
        assert_eq!(
            CertificateRef::from_value(&json!(7)),
            Some(CertificateRef::Existing(7))
        );
        assert_eq!(
            CertificateRef::from_value(&json!(0)),
            Some(CertificateRef::Existing(0))
        );
        assert_eq!(
            CertificateRef::from_value(&json!("new")),
            Some(CertificateRef::New)
        );
        assert_eq!(CertificateRef::from_value(&json!("7")), None);
        assert_eq!(CertificateRef::from_value(&json!(-1)), None);
        assert_eq!(CertificateRef::from_value(&json!(null)), None);
    }

    #[test]
    fn test_certificate_ref_serde_round_trip() {
        let existing: CertificateRef = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(serde_json::to_value(existing).unwrap(), json!(42));

        let fresh: CertificateRef = serde_json::from_value(json!("new")).unwrap();
        assert_eq!(serde_json::to_value(fresh).unwrap(), json!("new"));

        assert!(serde_json::from_value::<CertificateRef>(json!("banana")).is_err());
    }

    #[test]
    fn test_summary_reads_boolean_and_numeric_enabled() {
        let entry = json!({
            "id": 5,
            "enabled": 1,
            "domain_names": ["app.example.com", "www.example.com"]
        });
        let summary = ResourceSummary::from_value(&entry).expect("entry has an id");
        assert!(summary.enabled);
        assert_eq!(summary.label(), "app.example.com, www.example.com");

        let disabled = json!({"id": 6, "enabled": false});
        assert!(!ResourceSummary::from_value(&disabled).unwrap().enabled);

        let zero = json!({"id": 7, "enabled": 0});
        assert!(!ResourceSummary::from_value(&zero).unwrap().enabled);
    }

    #[test]
    fn test_summary_requires_an_id() {
        assert!(ResourceSummary::from_value(&json!({"enabled": true})).is_none());
        assert!(ResourceSummary::from_value(&json!("not an object")).is_none());
    }

    #[test]
    fn test_summary_label_falls_back_to_name_then_id() {
        let named = json!({"id": 3, "name": "Office allowlist"});
        assert_eq!(
            ResourceSummary::from_value(&named).unwrap().label(),
            "Office allowlist"
        );

        let cert = json!({"id": 9, "nice_name": "example.com wildcard"});
        assert_eq!(
            ResourceSummary::from_value(&cert).unwrap().label(),
            "example.com wildcard"
        );

        let bare = json!({"id": 11});
        assert_eq!(ResourceSummary::from_value(&bare).unwrap().label(), "#11");
    }
}
