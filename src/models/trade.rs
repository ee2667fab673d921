use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use super::{product::ProductSummary, user::UserSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Pending,
    Accepted,
    Completed,
    Rejected,
}

impl TradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Pending => "pending",
            TradeStatus::Accepted => "accepted",
            TradeStatus::Completed => "completed",
            TradeStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub product: ObjectId,
    pub seller: ObjectId,
    pub buyer: ObjectId,
    pub quantity: i64,
    pub price: f64,
    pub status: TradeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seller_rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seller_feedback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_feedback: Option<String>,
    pub created_at: DateTime,
}

impl Trade {
    /// Applies a status change. Entering `completed` for the first time
    /// stamps the completion time and returns the stock decrement the
    /// caller must apply to the traded product. Completion is one-way;
    /// repeating it has no further effect on stock.
    pub fn apply_transition(&mut self, status: TradeStatus, now: DateTime) -> Option<i64> {
        let first_completion =
            status == TradeStatus::Completed && self.status != TradeStatus::Completed;

        self.status = status;

        if first_completion {
            self.completed_at = Some(now);
            Some(self.quantity)
        } else {
            None
        }
    }
}

/// Falls back to the listed price times quantity when the request names
/// no price of its own.
pub fn default_price(product_price: f64, quantity: i64, requested: Option<f64>) -> f64 {
    requested.unwrap_or(product_price * quantity as f64)
}

/// Trade with its reference fields resolved into reduced views.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeView {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub product: Option<ProductSummary>,
    pub seller: Option<UserSummary>,
    pub buyer: Option<UserSummary>,
    pub quantity: i64,
    pub price: f64,
    pub status: TradeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seller_rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seller_feedback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_feedback: Option<String>,
    pub created_at: DateTime,
}

impl TradeView {
    pub fn assemble(
        trade: Trade,
        product: Option<ProductSummary>,
        seller: Option<UserSummary>,
        buyer: Option<UserSummary>,
    ) -> Self {
        Self {
            id: trade.id,
            product,
            seller,
            buyer,
            quantity: trade.quantity,
            price: trade.price,
            status: trade.status,
            completed_at: trade.completed_at,
            seller_rating: trade.seller_rating,
            buyer_rating: trade.buyer_rating,
            seller_feedback: trade.seller_feedback,
            buyer_feedback: trade.buyer_feedback,
            created_at: trade.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trade(quantity: i64) -> Trade {
        Trade {
            id: Some(ObjectId::new()),
            product: ObjectId::new(),
            seller: ObjectId::new(),
            buyer: ObjectId::new(),
            quantity,
            price: 75.0,
            status: TradeStatus::Pending,
            completed_at: None,
            seller_rating: None,
            buyer_rating: None,
            seller_feedback: None,
            buyer_feedback: None,
            created_at: DateTime::now(),
        }
    }

    #[test]
    fn completion_stamps_time_and_reports_decrement() {
        let mut trade = sample_trade(3);
        let decrement = trade.apply_transition(TradeStatus::Completed, DateTime::now());

        assert_eq!(decrement, Some(3));
        assert_eq!(trade.status, TradeStatus::Completed);
        assert!(trade.completed_at.is_some());
    }

    #[test]
    fn non_completion_transitions_leave_stock_alone() {
        let mut trade = sample_trade(3);

        assert_eq!(
            trade.apply_transition(TradeStatus::Accepted, DateTime::now()),
            None
        );
        assert_eq!(
            trade.apply_transition(TradeStatus::Rejected, DateTime::now()),
            None
        );
        assert!(trade.completed_at.is_none());
    }

    #[test]
    fn repeated_completion_does_not_decrement_twice() {
        let mut trade = sample_trade(3);

        assert_eq!(
            trade.apply_transition(TradeStatus::Completed, DateTime::now()),
            Some(3)
        );
        assert_eq!(
            trade.apply_transition(TradeStatus::Completed, DateTime::now()),
            None
        );
    }

    #[test]
    fn price_defaults_to_listed_price_times_quantity() {
        assert_eq!(default_price(25.0, 3, None), 75.0);
        assert_eq!(default_price(25.0, 3, Some(60.0)), 60.0);
    }
}
