use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use bson::{doc, DateTime};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::Database;
use serde::Deserialize;
use serde_json::json;

use super::parse_id;
use crate::{
    auth::AuthUser,
    database::{consultations, users},
    error::{ApiResult, AppError},
    models::{
        consultation::{Consultation, ConsultationStatus, ConsultationView},
        user::UserSummary,
    },
    policy::{can_access_consultation, ConsultationOp},
    rating,
    state::AppState,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewConsultation {
    pub veterinarian: String,
    pub subject: String,
    pub description: String,
    pub scheduled_at: String,
}

impl NewConsultation {
    fn validate(&self) -> Result<(), AppError> {
        if self.subject.trim().is_empty() {
            return Err(AppError::Validation("Please enter a subject".to_string()));
        }
        if self.description.trim().is_empty() {
            return Err(AppError::Validation(
                "Please enter a description".to_string(),
            ));
        }
        Ok(())
    }

    fn scheduled_at(&self) -> Result<DateTime, AppError> {
        chrono::DateTime::parse_from_rfc3339(&self.scheduled_at)
            .map(|t| DateTime::from_chrono(t.with_timezone(&Utc)))
            .map_err(|_| {
                AppError::Validation("scheduledAt must be an RFC 3339 timestamp".to_string())
            })
    }
}

pub async fn new_consultation(
    State(state): State<Arc<AppState>>,
    AuthUser { id, user }: AuthUser,
    Json(body): Json<NewConsultation>,
) -> ApiResult<impl IntoResponse> {
    body.validate()?;
    let scheduled_at = body.scheduled_at()?;
    let veterinarian_id = parse_id(&body.veterinarian, "User")?;

    let mut consultation = Consultation {
        id: None,
        farmer: id,
        veterinarian: veterinarian_id,
        subject: body.subject,
        description: body.description,
        scheduled_at,
        status: ConsultationStatus::Pending,
        completed_at: None,
        farmer_rating: None,
        farmer_feedback: None,
        created_at: DateTime::now(),
    };

    let inserted = consultations(&state.db).insert_one(&consultation).await?;
    consultation.id = inserted.inserted_id.as_object_id();

    if let Some(vet) = users(&state.db)
        .find_one(doc! { "_id": veterinarian_id })
        .await?
    {
        let message = format!(
            "You have a new consultation request from {}.\n\nSubject: {}\n\nScheduled for: {}\n\nPlease login to your account to respond.",
            user.name, consultation.subject, body.scheduled_at
        );
        state
            .mailer
            .send(vet.email, "New Consultation Request".to_string(), message);
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "consultation": consultation })),
    ))
}

pub async fn my_consultations(
    State(state): State<Arc<AppState>>,
    AuthUser { id, .. }: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let mine: Vec<Consultation> = consultations(&state.db)
        .find(doc! { "$or": [ { "farmer": id }, { "veterinarian": id } ] })
        .await?
        .try_collect()
        .await?;

    let mut views = Vec::with_capacity(mine.len());
    for consultation in mine {
        views.push(populate(&state.db, consultation).await?);
    }

    Ok(Json(json!({ "success": true, "consultations": views })))
}

pub async fn get_consultation(
    State(state): State<Arc<AppState>>,
    AuthUser { id, .. }: AuthUser,
    Path(consultation_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let consultation_id = parse_id(&consultation_id, "Consultation")?;

    let consultation = consultations(&state.db)
        .find_one(doc! { "_id": consultation_id })
        .await?
        .ok_or(AppError::NotFound("Consultation"))?;

    if !can_access_consultation(id, &consultation, ConsultationOp::View) {
        return Err(AppError::Unauthorized(
            "Not authorized to access this consultation",
        ));
    }

    let view = populate(&state.db, consultation).await?;

    Ok(Json(json!({ "success": true, "consultation": view })))
}

#[derive(Deserialize)]
pub struct ConsultationTransition {
    pub status: ConsultationStatus,
}

pub async fn update_consultation(
    State(state): State<Arc<AppState>>,
    AuthUser { id, .. }: AuthUser,
    Path(consultation_id): Path<String>,
    Json(body): Json<ConsultationTransition>,
) -> ApiResult<impl IntoResponse> {
    let consultation_id = parse_id(&consultation_id, "Consultation")?;
    let collection = consultations(&state.db);

    let mut consultation = collection
        .find_one(doc! { "_id": consultation_id })
        .await?
        .ok_or(AppError::NotFound("Consultation"))?;

    if !can_access_consultation(id, &consultation, ConsultationOp::Transition) {
        return Err(AppError::Unauthorized(
            "Not authorized to update this consultation",
        ));
    }

    consultation.apply_transition(body.status, DateTime::now());

    let mut set = doc! { "status": bson::to_bson(&consultation.status)? };
    if let Some(at) = consultation.completed_at {
        set.insert("completedAt", at);
    }

    collection
        .update_one(doc! { "_id": consultation_id }, doc! { "$set": set })
        .await?;

    Ok(Json(json!({ "success": true, "consultation": consultation })))
}

#[derive(Deserialize)]
pub struct ConsultationRating {
    pub rating: f64,
    pub feedback: Option<String>,
}

pub async fn rate_consultation(
    State(state): State<Arc<AppState>>,
    AuthUser { id, .. }: AuthUser,
    Path(consultation_id): Path<String>,
    Json(body): Json<ConsultationRating>,
) -> ApiResult<impl IntoResponse> {
    rating::ensure_valid(body.rating)?;

    let consultation_id = parse_id(&consultation_id, "Consultation")?;
    let collection = consultations(&state.db);

    let consultation = collection
        .find_one(doc! { "_id": consultation_id })
        .await?
        .ok_or(AppError::NotFound("Consultation"))?;

    if consultation.status != ConsultationStatus::Completed {
        return Err(AppError::BusinessRule(
            "You can only rate completed consultations",
        ));
    }

    if !can_access_consultation(id, &consultation, ConsultationOp::Rate) {
        return Err(AppError::Unauthorized(
            "Not authorized to rate this consultation",
        ));
    }

    let mut set = doc! { "farmerRating": body.rating };
    if let Some(feedback) = &body.feedback {
        set.insert("farmerFeedback", feedback.as_str());
    }

    collection
        .update_one(doc! { "_id": consultation_id }, doc! { "$set": set })
        .await?;

    rating::refresh_consultation_rating(&state.db, &state.rating_locks, consultation.veterinarian)
        .await?;

    Ok(Json(
        json!({ "success": true, "message": "Consultation rated successfully" }),
    ))
}

async fn populate(db: &Database, consultation: Consultation) -> ApiResult<ConsultationView> {
    let farmer = users(db)
        .find_one(doc! { "_id": consultation.farmer })
        .await?
        .map(|u| UserSummary::from(&u));

    let veterinarian = users(db)
        .find_one(doc! { "_id": consultation.veterinarian })
        .await?
        .map(|u| UserSummary::from(&u));

    Ok(ConsultationView::assemble(consultation, farmer, veterinarian))
}
