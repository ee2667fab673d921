use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use bson::{doc, Document};
use futures::TryStreamExt;
use mongodb::options::ReturnDocument;
use serde::Deserialize;
use serde_json::json;

use super::parse_id;
use crate::{
    auth::{AdminUser, AuthUser},
    database::users,
    error::{ApiResult, AppError},
    models::user::{GeoPoint, User, UserReview, MAX_NAME_LEN},
    rating,
    state::AppState,
};

pub async fn get_profile(AuthUser { user, .. }: AuthUser) -> ApiResult<impl IntoResponse> {
    Ok(Json(json!({ "success": true, "user": user })))
}

#[derive(Deserialize)]
pub struct LocationInput {
    pub coordinates: [f64; 2],
}

#[derive(Deserialize)]
pub struct UpdateProfile {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub location: Option<LocationInput>,
}

impl UpdateProfile {
    fn validate(&self) -> Result<(), AppError> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(AppError::Validation("Please enter your name".to_string()));
            }
            if name.len() > MAX_NAME_LEN {
                return Err(AppError::Validation(
                    "Name cannot exceed 50 characters".to_string(),
                ));
            }
        }
        if let Some(email) = &self.email {
            if !email.contains('@') {
                return Err(AppError::Validation(
                    "Please enter valid email address".to_string(),
                ));
            }
        }
        Ok(())
    }
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    AuthUser { id, .. }: AuthUser,
    Json(body): Json<UpdateProfile>,
) -> ApiResult<impl IntoResponse> {
    body.validate()?;

    let mut set = Document::new();
    if let Some(name) = body.name {
        set.insert("name", name);
    }
    if let Some(email) = body.email {
        set.insert("email", email);
    }
    if let Some(phone) = body.phone {
        set.insert("phone", phone);
    }
    if let Some(address) = body.address {
        set.insert("address", address);
    }
    if let Some(location) = body.location {
        let point = GeoPoint::new(location.coordinates[0], location.coordinates[1]);
        set.insert("location", bson::to_bson(&point)?);
    }

    let collection = users(&state.db);

    let user = if set.is_empty() {
        collection.find_one(doc! { "_id": id }).await?
    } else {
        collection
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await?
    }
    .ok_or(AppError::NotFound("User"))?;

    Ok(Json(json!({ "success": true, "user": user })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSearch {
    pub role: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub max_distance: Option<i64>,
}

pub async fn search_users(
    State(state): State<Arc<AppState>>,
    AuthUser { .. }: AuthUser,
    Query(params): Query<UserSearch>,
) -> ApiResult<impl IntoResponse> {
    let (Some(role), Some(latitude), Some(longitude)) =
        (params.role, params.latitude, params.longitude)
    else {
        return Err(AppError::Validation(
            "Please provide role, latitude and longitude".to_string(),
        ));
    };

    let filter = doc! {
        "role": role,
        "location": {
            "$near": {
                "$geometry": { "type": "Point", "coordinates": [longitude, latitude] },
                "$maxDistance": params.max_distance.unwrap_or(10_000),
            }
        }
    };

    let found: Vec<User> = users(&state.db).find(filter).await?.try_collect().await?;

    Ok(Json(json!({
        "success": true,
        "count": found.len(),
        "users": found,
    })))
}

#[derive(Deserialize)]
pub struct UserRating {
    pub rating: f64,
    pub comment: String,
}

pub async fn rate_user(
    State(state): State<Arc<AppState>>,
    AuthUser { id, .. }: AuthUser,
    Path(target): Path<String>,
    Json(body): Json<UserRating>,
) -> ApiResult<impl IntoResponse> {
    rating::ensure_valid(body.rating)?;

    let target = parse_id(&target, "User")?;

    // Same lock as the trade/consultation aggregation paths, so a direct
    // rating cannot interleave with a refresh of the same user.
    let _guard = state.rating_locks.acquire(target).await;

    let collection = users(&state.db);

    let mut user = collection
        .find_one(doc! { "_id": target })
        .await?
        .ok_or(AppError::NotFound("User"))?;

    user.reviews.push(UserReview {
        user: id,
        rating: body.rating,
        comment: body.comment,
    });

    let values: Vec<f64> = user.reviews.iter().map(|r| r.rating).collect();
    if let Some(summary) = rating::recompute(&values) {
        user.rating = summary.mean;
        user.num_of_reviews = summary.count;
    }

    collection
        .update_one(
            doc! { "_id": target },
            doc! { "$set": {
                "reviews": bson::to_bson(&user.reviews)?,
                "rating": user.rating,
                "numOfReviews": user.num_of_reviews,
            }},
        )
        .await?;

    Ok(Json(
        json!({ "success": true, "message": "Rating submitted successfully" }),
    ))
}

pub async fn all_users(
    State(state): State<Arc<AppState>>,
    AdminUser { .. }: AdminUser,
) -> ApiResult<impl IntoResponse> {
    let everyone: Vec<User> = users(&state.db).find(doc! {}).await?.try_collect().await?;

    Ok(Json(json!({ "success": true, "users": everyone })))
}

pub async fn get_user_details(
    State(state): State<Arc<AppState>>,
    AdminUser { .. }: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id, "User")?;

    let user = users(&state.db)
        .find_one(doc! { "_id": id })
        .await?
        .ok_or(AppError::NotFound("User"))?;

    Ok(Json(json!({ "success": true, "user": user })))
}
