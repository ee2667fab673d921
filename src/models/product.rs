use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::rating::recompute;

/// A product review. One entry per rater; resubmitting replaces it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductReview {
    pub user: ObjectId,
    pub name: String,
    pub rating: f64,
    pub comment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub price: f64,
    /// Only ever decremented, and only when a trade completes.
    pub stock: i64,
    /// Admin who listed the product.
    pub user: ObjectId,
    #[serde(default)]
    pub ratings: f64,
    #[serde(default)]
    pub num_of_reviews: i64,
    #[serde(default)]
    pub reviews: Vec<ProductReview>,
    pub created_at: DateTime,
}

impl Product {
    /// Replaces the rater's existing review or appends a new one, then
    /// recomputes the embedded aggregate from the full list.
    pub fn upsert_review(&mut self, review: ProductReview) {
        match self.reviews.iter_mut().find(|r| r.user == review.user) {
            Some(existing) => {
                existing.rating = review.rating;
                existing.comment = review.comment;
            }
            None => self.reviews.push(review),
        }

        self.num_of_reviews = self.reviews.len() as i64;

        let values: Vec<f64> = self.reviews.iter().map(|r| r.rating).collect();
        if let Some(summary) = recompute(&values) {
            self.ratings = summary.mean;
        }
    }
}

/// Reduced view embedded where a trade references its product.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub price: f64,
}

impl From<&Product> for ProductSummary {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: product.price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_product() -> Product {
        Product {
            id: Some(ObjectId::new()),
            name: "Maize seed".to_string(),
            price: 25.0,
            stock: 10,
            user: ObjectId::new(),
            ratings: 0.0,
            num_of_reviews: 0,
            reviews: Vec::new(),
            created_at: DateTime::now(),
        }
    }

    fn review(user: ObjectId, rating: f64) -> ProductReview {
        ProductReview {
            user,
            name: "Kofi".to_string(),
            rating,
            comment: "ok".to_string(),
        }
    }

    #[test]
    fn first_review_appends_and_aggregates() {
        let mut product = sample_product();
        product.upsert_review(review(ObjectId::new(), 4.0));

        assert_eq!(product.reviews.len(), 1);
        assert_eq!(product.num_of_reviews, 1);
        assert_eq!(product.ratings, 4.0);
    }

    #[test]
    fn resubmission_replaces_instead_of_appending() {
        let mut product = sample_product();
        let rater = ObjectId::new();

        product.upsert_review(review(rater, 2.0));
        product.upsert_review(review(ObjectId::new(), 4.0));
        product.upsert_review(review(rater, 5.0));

        assert_eq!(product.reviews.len(), 2);
        assert_eq!(product.num_of_reviews, 2);
        assert_eq!(product.ratings, 4.5);
    }
}
