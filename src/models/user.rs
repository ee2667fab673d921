use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

pub const MAX_NAME_LEN: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Farmer,
    Veterinarian,
    Trader,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Farmer => "farmer",
            Role::Veterinarian => "veterinarian",
            Role::Trader => "trader",
            Role::Admin => "admin",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Farmer
    }
}

/// GeoJSON point, longitude first. Backed by a 2dsphere index for
/// nearest-neighbor lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: [f64; 2],
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: [longitude, latitude],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Avatar {
    pub public_id: String,
    pub url: String,
}

/// A direct rating left on a user by another user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserReview {
    pub user: ObjectId,
    pub rating: f64,
    pub comment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    /// Stored hashed by the auth layer. Never serialized into a response.
    #[serde(skip_serializing, default)]
    pub password: String,
    #[serde(default)]
    pub role: Role,
    pub phone: String,
    pub address: String,
    pub location: GeoPoint,
    pub avatar: Avatar,
    /// Aggregate over all rating values recorded against this user.
    /// Written only by the rating aggregation paths.
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub num_of_reviews: i64,
    #[serde(default)]
    pub reviews: Vec<UserReview>,
    pub created_at: DateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_password_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_password_expire: Option<DateTime>,
}

/// Reduced view embedded where another entity references a user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    pub avatar: Avatar,
    pub rating: f64,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            avatar: user.avatar.clone(),
            rating: user.rating,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Some(ObjectId::new()),
            name: "Ama".to_string(),
            email: "ama@example.com".to_string(),
            password: "$2a$10$secret".to_string(),
            role: Role::Farmer,
            phone: "0200000000".to_string(),
            address: "Kumasi".to_string(),
            location: GeoPoint::new(-1.62, 6.69),
            avatar: Avatar {
                public_id: "avatars/ama".to_string(),
                url: "https://cdn.example.com/ama.png".to_string(),
            },
            rating: 4.0,
            num_of_reviews: 2,
            reviews: Vec::new(),
            created_at: DateTime::now(),
            reset_password_token: None,
            reset_password_expire: None,
        }
    }

    #[test]
    fn password_never_serialized() {
        let value = serde_json::to_value(sample_user()).unwrap();
        assert!(value.get("password").is_none());
        assert_eq!(value["email"], "ama@example.com");
    }

    #[test]
    fn wire_fields_are_camel_case() {
        let value = serde_json::to_value(sample_user()).unwrap();
        assert!(value.get("numOfReviews").is_some());
        assert!(value.get("createdAt").is_some());
        assert!(value.get("num_of_reviews").is_none());
    }

    #[test]
    fn geo_point_is_longitude_first() {
        let point = GeoPoint::new(-1.62, 6.69);
        assert_eq!(point.kind, "Point");
        assert_eq!(point.coordinates, [-1.62, 6.69]);
    }

    #[test]
    fn summary_carries_aggregate_rating() {
        let user = sample_user();
        let summary = UserSummary::from(&user);
        assert_eq!(summary.rating, 4.0);
        assert_eq!(summary.id, user.id);
    }
}
