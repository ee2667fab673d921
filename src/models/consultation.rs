use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use super::user::UserSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsultationStatus {
    Pending,
    Accepted,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consultation {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub farmer: ObjectId,
    pub veterinarian: ObjectId,
    pub subject: String,
    pub description: String,
    pub scheduled_at: DateTime,
    pub status: ConsultationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime>,
    /// Only the farmer rates a consultation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farmer_rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farmer_feedback: Option<String>,
    pub created_at: DateTime,
}

impl Consultation {
    /// Applies a status change. Unlike a trade, completion touches no
    /// other entity; it only stamps the completion time, once.
    pub fn apply_transition(&mut self, status: ConsultationStatus, now: DateTime) {
        if status == ConsultationStatus::Completed && self.status != ConsultationStatus::Completed {
            self.completed_at = Some(now);
        }
        self.status = status;
    }
}

/// Consultation with its reference fields resolved into reduced views.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationView {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub farmer: Option<UserSummary>,
    pub veterinarian: Option<UserSummary>,
    pub subject: String,
    pub description: String,
    pub scheduled_at: DateTime,
    pub status: ConsultationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farmer_rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farmer_feedback: Option<String>,
    pub created_at: DateTime,
}

impl ConsultationView {
    pub fn assemble(
        consultation: Consultation,
        farmer: Option<UserSummary>,
        veterinarian: Option<UserSummary>,
    ) -> Self {
        Self {
            id: consultation.id,
            farmer,
            veterinarian,
            subject: consultation.subject,
            description: consultation.description,
            scheduled_at: consultation.scheduled_at,
            status: consultation.status,
            completed_at: consultation.completed_at,
            farmer_rating: consultation.farmer_rating,
            farmer_feedback: consultation.farmer_feedback,
            created_at: consultation.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_consultation() -> Consultation {
        Consultation {
            id: Some(ObjectId::new()),
            farmer: ObjectId::new(),
            veterinarian: ObjectId::new(),
            subject: "Calf fever".to_string(),
            description: "Two calves refusing feed since Monday".to_string(),
            scheduled_at: DateTime::now(),
            status: ConsultationStatus::Pending,
            completed_at: None,
            farmer_rating: None,
            farmer_feedback: None,
            created_at: DateTime::now(),
        }
    }

    #[test]
    fn completion_stamps_time_once() {
        let mut consultation = sample_consultation();
        consultation.apply_transition(ConsultationStatus::Completed, DateTime::now());

        let stamped = consultation.completed_at;
        assert!(stamped.is_some());

        consultation.apply_transition(ConsultationStatus::Completed, DateTime::now());
        assert_eq!(consultation.completed_at, stamped);
    }

    #[test]
    fn other_transitions_do_not_stamp() {
        let mut consultation = sample_consultation();
        consultation.apply_transition(ConsultationStatus::Accepted, DateTime::now());

        assert_eq!(consultation.status, ConsultationStatus::Accepted);
        assert!(consultation.completed_at.is_none());
    }
}
