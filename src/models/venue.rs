use serde::{Deserialize, Serialize};

use super::{amount, Address, Amount, ValidationError};

pub type VenueId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Venue {
    pub id: VenueId,
    pub name: String,
    pub sport_type: String,
    #[serde(with = "amount::as_string")]
    pub hourly_rate: Amount,
    /// Decimal degrees, kept as text to preserve precision.
    pub latitude: String,
    pub longitude: String,
    pub owner: Address,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVenue {
    pub name: String,
    pub sport_type: String,
    #[serde(with = "amount::as_string")]
    pub hourly_rate: Amount,
    pub latitude: String,
    pub longitude: String,
}

impl NewVenue {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let fields = [
            ("name", &self.name),
            ("sport_type", &self.sport_type),
            ("latitude", &self.latitude),
            ("longitude", &self.longitude),
        ];
        if let Some((field, _)) = fields.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ValidationError::MissingField(*field));
        }
        if self.hourly_rate == 0 {
            return Err(ValidationError::NonPositiveRate);
        }
        for (field, value) in [("latitude", &self.latitude), ("longitude", &self.longitude)] {
            if value.trim().parse::<f64>().is_err() {
                return Err(ValidationError::InvalidCoordinate(field));
            }
        }
        Ok(())
    }
}
