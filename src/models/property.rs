//! Rental property listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Row of the `properties` table. Prices are santim per night.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Property {
    pub id: Uuid,
    pub host_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub city: String,
    pub price_per_night_cents: i64,
    pub currency: String,
    pub max_guests: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// ```json
/// {
///   "title": "Bole 2BR apartment",
///   "city": "Addis Ababa",
///   "price_per_night_cents": 350000,
///   "max_guests": 4
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreatePropertyRequest {
    pub title: String,
    pub description: Option<String>,
    pub city: String,
    pub price_per_night_cents: i64,
    pub max_guests: i32,
}

impl CreatePropertyRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::InvalidRequest("Title is required".to_string()));
        }
        if self.city.trim().is_empty() {
            return Err(AppError::InvalidRequest("City is required".to_string()));
        }
        if self.price_per_night_cents <= 0 {
            return Err(AppError::InvalidRequest(
                "Price per night must be positive".to_string(),
            ));
        }
        if self.max_guests < 1 {
            return Err(AppError::InvalidRequest(
                "A property must accept at least one guest".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct PropertyQuery {
    pub city: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreatePropertyRequest {
        CreatePropertyRequest {
            title: "Bole 2BR".to_string(),
            description: None,
            city: "Addis Ababa".to_string(),
            price_per_night_cents: 350_000,
            max_guests: 4,
        }
    }

    #[test]
    fn valid_listing_passes() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn rejects_free_or_empty_listings() {
        let mut free = request();
        free.price_per_night_cents = 0;
        assert!(free.validate().is_err());

        let mut nameless = request();
        nameless.title = "  ".to_string();
        assert!(nameless.validate().is_err());

        let mut no_guests = request();
        no_guests.max_guests = 0;
        assert!(no_guests.validate().is_err());
    }
}
