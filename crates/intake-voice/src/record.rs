//! The incident report being collected, and the conversation state that decides
//! which field the next answer fills.

use serde::{Deserialize, Serialize};

/// Conversation states, in traversal order.
///
/// A state names the last field that was captured: while in `Name`, the next answer is
/// the crime type. `District` is transient; the session constructs the address and
/// moves on to `AddressValidation` within the same turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    Greeting,
    Name,
    CrimeType,
    Area,
    Landmark,
    City,
    District,
    AddressValidation,
    Complete,
}

impl ConversationState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Name => "name",
            Self::CrimeType => "crime_type",
            Self::Area => "area",
            Self::Landmark => "landmark",
            Self::City => "city",
            Self::District => "district",
            Self::AddressValidation => "address_validation",
            Self::Complete => "complete",
        }
    }

    /// Terminal state: no further transitions.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Whether caller input is meaningful in this state.
    pub const fn accepts_input(self) -> bool {
        !matches!(self, Self::District | Self::Complete)
    }
}

impl std::fmt::Display for ConversationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields collected for one incident report. Empty string means unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeRecord {
    pub name: String,
    pub crime_type: String,
    pub area: String,
    pub landmark: String,
    pub city: String,
    pub district: String,
    /// Derived from the four address fields; only set once the district is captured.
    pub full_address: String,
    /// Fixed at conversation start; never asked for.
    pub phone_number: String,
}

impl IntakeRecord {
    pub fn new(phone_number: impl Into<String>) -> Self {
        Self {
            phone_number: phone_number.into(),
            ..Default::default()
        }
    }

    /// Compose and store `full_address` from the current address fields.
    pub fn construct_address(&mut self) -> &str {
        self.full_address = compose_address(&self.area, &self.landmark, &self.city, &self.district);
        &self.full_address
    }

    /// Clear everything the address-validation step covers.
    pub fn clear_address(&mut self) {
        self.area.clear();
        self.landmark.clear();
        self.city.clear();
        self.district.clear();
        self.full_address.clear();
    }

    /// First collected field that is still empty, by its wire name.
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("name", &self.name),
            ("crime_type", &self.crime_type),
            ("area", &self.area),
            ("landmark", &self.landmark),
            ("city", &self.city),
            ("district", &self.district),
            ("full_address", &self.full_address),
        ]
        .into_iter()
        .find(|(_, value)| value.is_empty())
        .map(|(field, _)| field)
    }

    pub fn is_complete(&self) -> bool {
        self.missing_field().is_none()
    }
}

/// `"{area}, Near {landmark}, {city}, {district} District"`
pub fn compose_address(area: &str, landmark: &str, city: &str, district: &str) -> String {
    format!("{area}, Near {landmark}, {city}, {district} District")
}
