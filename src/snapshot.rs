// Snapshot Module - Device state as reported by GET /state
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Key of a strand or LED entry in the state document.
///
/// Ordered the way a JS object iterates its keys: canonical array-index keys
/// ("0", "1", ... "10") first in numeric order, then every other key in
/// lexicographic order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(String);

impl SlotId {
    #[cfg(test)]
    pub fn new(id: impl Into<String>) -> Self {
        SlotId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    // Canonical form only: "07" and "+7" are plain string keys
    fn array_index(&self) -> Option<u32> {
        let n: u32 = self.0.parse().ok()?;
        if n == u32::MAX || n.to_string() != self.0 {
            return None;
        }
        Some(n)
    }

    /// Integer value of the id using `parseInt` rules: optional leading
    /// whitespace and sign, then as many digits as present.
    pub fn leading_int(&self) -> Option<i64> {
        let s = self.0.trim_start();
        let (negative, digits) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };
        let end = digits
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(digits.len());
        if end == 0 {
            return None;
        }
        let value: i64 = digits[..end].parse().ok()?;
        Some(if negative { -value } else { value })
    }
}

impl Ord for SlotId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.array_index(), other.array_index()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for SlotId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SlotId {
    fn from(id: &str) -> Self {
        SlotId(id.to_string())
    }
}

// MQTT bridge status reported by the backend
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "Option<Value>")]
pub enum MqttStatus {
    Connected,
    Disconnected,
    #[default]
    Uninitialized,
    Unrecognized(String),
}

impl From<Option<Value>> for MqttStatus {
    fn from(raw: Option<Value>) -> Self {
        match raw {
            None | Some(Value::Null) => MqttStatus::Uninitialized,
            Some(Value::String(s)) => match s.trim() {
                "connected" => MqttStatus::Connected,
                "disconnected" => MqttStatus::Disconnected,
                // The LED manager reports "not initialized" before its first connect
                "uninitialized" | "not initialized" => MqttStatus::Uninitialized,
                other => MqttStatus::Unrecognized(other.to_string()),
            },
            // Numbers, booleans and objects never match a known state
            Some(other) => MqttStatus::Unrecognized(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct LedState {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub animation_text: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct StrandInfo {
    #[serde(default)]
    pub pin: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct StrandState {
    #[serde(default)]
    pub strand_name: String,
    #[serde(default)]
    pub strand_info: StrandInfo,
    #[serde(default)]
    pub led_info: BTreeMap<SlotId, LedState>,
}

impl StrandState {
    pub fn pin(&self) -> Option<&Value> {
        self.strand_info.pin.as_ref()
    }

    /// Pin as shown to the user: bare strings unquoted, other JSON as-is.
    pub fn pin_label(&self) -> String {
        match self.pin() {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "unknown".to_string(),
        }
    }
}

/// One complete view of device state from a single successful poll.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct DeviceSnapshot {
    #[serde(default)]
    pub mqtt_status: MqttStatus,
    pub modes: Vec<String>,
    pub strands: BTreeMap<SlotId, StrandState>,
}

impl DeviceSnapshot {
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    pub fn led_count(&self) -> usize {
        self.strands.values().map(|s| s.led_info.len()).sum()
    }
}
