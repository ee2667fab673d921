//! # Rating aggregation
//!
//! Every rating written anywhere in the system funnels through one of the
//! refresh paths here. A user's aggregate is never adjusted
//! incrementally: each new rating triggers a full re-read of the source
//! collection and a recompute of the mean, then a single `$set` on the
//! user record.
//!
//! ## Sources
//!
//! - **Trades**: ratings received as seller and as buyer are merged into
//!   one pool before averaging.
//! - **Consultations**: only farmer-given ratings on the veterinarian.
//! - **Product reviews** and **direct user ratings** keep their own
//!   embedded-list mean on the rated entity and do not pass through this
//!   module's refresh paths, only through [`recompute`].
//!
//! ## Locking
//!
//! Recompute-and-persist for a given user runs under a per-user async
//! lock held in process state. Two racing ratings against the same user
//! serialize here instead of interleaving the read-aggregate/write
//! window.

use std::{collections::HashMap, sync::Arc};

use bson::{doc, oid::ObjectId};
use futures::TryStreamExt;
use mongodb::Database;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    database::{consultations, trades, users},
    error::{ApiResult, AppError},
    models::{consultation::Consultation, trade::Trade},
};

#[derive(Debug, PartialEq)]
pub struct RatingSummary {
    pub mean: f64,
    pub count: i64,
}

/// Mean and count of a rating pool. `None` for an empty pool, in which
/// case no write happens and the stored aggregate stays as it was.
pub fn recompute(values: &[f64]) -> Option<RatingSummary> {
    if values.is_empty() {
        return None;
    }

    let total: f64 = values.iter().sum();
    Some(RatingSummary {
        mean: total / values.len() as f64,
        count: values.len() as i64,
    })
}

/// Range check shared by every rate endpoint, before any record is read.
pub fn ensure_valid(rating: f64) -> Result<(), AppError> {
    if !(1.0..=5.0).contains(&rating) {
        return Err(AppError::Validation(
            "Rating must be between 1 and 5".to_string(),
        ));
    }
    Ok(())
}

/// Per-user locks serializing aggregate recomputation.
#[derive(Default)]
pub struct UserLocks {
    inner: Mutex<HashMap<ObjectId, Arc<Mutex<()>>>>,
}

impl UserLocks {
    pub async fn acquire(&self, user: ObjectId) -> OwnedMutexGuard<()> {
        let slot = {
            let mut map = self.inner.lock().await;
            map.entry(user)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        slot.lock_owned().await
    }
}

/// Merges the ratings a user received as seller with those received as
/// buyer. Each trade contributes its sellerRating at most once and its
/// buyerRating at most once.
pub fn trade_rating_pool(as_seller: &[Trade], as_buyer: &[Trade]) -> Vec<f64> {
    as_seller
        .iter()
        .filter_map(|t| t.seller_rating)
        .chain(as_buyer.iter().filter_map(|t| t.buyer_rating))
        .collect()
}

/// Recomputes a user's aggregate from all trade ratings recorded against
/// them, across both roles, and persists it.
pub async fn refresh_trade_rating(
    db: &Database,
    locks: &UserLocks,
    user: ObjectId,
) -> ApiResult<()> {
    let _guard = locks.acquire(user).await;

    let as_seller: Vec<Trade> = trades(db)
        .find(doc! { "seller": user, "sellerRating": { "$exists": true } })
        .await?
        .try_collect()
        .await?;

    let as_buyer: Vec<Trade> = trades(db)
        .find(doc! { "buyer": user, "buyerRating": { "$exists": true } })
        .await?
        .try_collect()
        .await?;

    persist(db, user, recompute(&trade_rating_pool(&as_seller, &as_buyer))).await
}

/// Recomputes a veterinarian's aggregate from farmer-given consultation
/// ratings and persists it.
pub async fn refresh_consultation_rating(
    db: &Database,
    locks: &UserLocks,
    veterinarian: ObjectId,
) -> ApiResult<()> {
    let _guard = locks.acquire(veterinarian).await;

    let rated: Vec<Consultation> = consultations(db)
        .find(doc! { "veterinarian": veterinarian, "farmerRating": { "$exists": true } })
        .await?
        .try_collect()
        .await?;

    let values: Vec<f64> = rated.iter().filter_map(|c| c.farmer_rating).collect();
    persist(db, veterinarian, recompute(&values)).await
}

async fn persist(db: &Database, user: ObjectId, summary: Option<RatingSummary>) -> ApiResult<()> {
    let Some(summary) = summary else {
        return Ok(());
    };

    users(db)
        .update_one(
            doc! { "_id": user },
            doc! { "$set": { "rating": summary.mean, "numOfReviews": summary.count } },
        )
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use bson::DateTime;

    use super::*;
    use crate::models::trade::TradeStatus;

    fn rated_trade(
        seller: ObjectId,
        buyer: ObjectId,
        seller_rating: Option<f64>,
        buyer_rating: Option<f64>,
    ) -> Trade {
        Trade {
            id: Some(ObjectId::new()),
            product: ObjectId::new(),
            seller,
            buyer,
            quantity: 1,
            price: 10.0,
            status: TradeStatus::Completed,
            completed_at: Some(DateTime::now()),
            seller_rating,
            buyer_rating,
            seller_feedback: None,
            buyer_feedback: None,
            created_at: DateTime::now(),
        }
    }

    #[test]
    fn empty_pool_yields_no_summary() {
        assert_eq!(recompute(&[]), None);
    }

    #[test]
    fn mean_and_count_over_merged_pool() {
        let summary = recompute(&[4.0, 5.0, 3.0]).unwrap();
        assert_eq!(summary.mean, 4.0);
        assert_eq!(summary.count, 3);
    }

    #[test]
    fn range_check_rejects_out_of_band_values() {
        assert!(ensure_valid(0.0).is_err());
        assert!(ensure_valid(6.0).is_err());
        assert!(ensure_valid(0.99).is_err());
        assert!(ensure_valid(1.0).is_ok());
        assert!(ensure_valid(5.0).is_ok());
    }

    #[test]
    fn pool_counts_each_trade_side_exactly_once() {
        let user = ObjectId::new();
        let other = ObjectId::new();

        // Received as seller on one trade, as buyer on another. The
        // counterpart ratings the user *gave* must not enter the pool.
        let as_seller = vec![rated_trade(user, other, Some(4.0), Some(1.0))];
        let as_buyer = vec![rated_trade(other, user, Some(1.0), Some(2.0))];

        let pool = trade_rating_pool(&as_seller, &as_buyer);
        assert_eq!(pool, vec![4.0, 2.0]);

        let summary = recompute(&pool).unwrap();
        assert_eq!(summary.mean, 3.0);
        assert_eq!(summary.count, 2);
    }

    #[test]
    fn unrated_sides_are_skipped() {
        let user = ObjectId::new();
        let other = ObjectId::new();

        let as_seller = vec![
            rated_trade(user, other, Some(5.0), None),
            rated_trade(user, other, None, None),
        ];

        let pool = trade_rating_pool(&as_seller, &[]);
        assert_eq!(pool, vec![5.0]);
    }
}
