// Connectivity Module - MQTT health indicator
use crate::dom::{self, Document, DomError};
use crate::snapshot::MqttStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectivityState {
    #[default]
    Uninitialized,
    Connected,
    Disconnected,
    Unrecognized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Indicator {
    pub color: &'static str,
    pub tooltip: &'static str,
}

impl From<&MqttStatus> for ConnectivityState {
    fn from(status: &MqttStatus) -> Self {
        match status {
            MqttStatus::Connected => ConnectivityState::Connected,
            MqttStatus::Disconnected => ConnectivityState::Disconnected,
            MqttStatus::Uninitialized => ConnectivityState::Uninitialized,
            MqttStatus::Unrecognized(_) => ConnectivityState::Unrecognized,
        }
    }
}

impl ConnectivityState {
    pub fn indicator(self) -> Indicator {
        match self {
            ConnectivityState::Connected => Indicator {
                color: "green",
                tooltip: "MQTT Connected and listening",
            },
            ConnectivityState::Disconnected => Indicator {
                color: "red",
                tooltip: "MQTT Disconnected",
            },
            ConnectivityState::Uninitialized | ConnectivityState::Unrecognized => Indicator {
                color: "black",
                tooltip: "MQTT Connection Never Initialized",
            },
        }
    }

    /// Write the indicator color and tooltip onto the `mqtt_status` element.
    pub fn apply(self, document: &mut Document) -> Result<(), DomError> {
        let indicator = self.indicator();
        let element = document.element_mut(dom::MQTT_STATUS)?;
        element.style.color = Some(indicator.color.to_string());
        element.title = Some(indicator.tooltip.to_string());
        Ok(())
    }
}
