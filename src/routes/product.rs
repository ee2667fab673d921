use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use bson::{doc, DateTime, Document};
use futures::TryStreamExt;
use mongodb::options::ReturnDocument;
use serde::Deserialize;
use serde_json::json;

use super::parse_id;
use crate::{
    auth::{AdminUser, AuthUser},
    database::products,
    error::{ApiResult, AppError},
    models::product::{Product, ProductReview},
    query::{build_filter, page_bounds, PAGE_SIZE},
    rating,
    state::AppState,
};

#[derive(Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: f64,
    pub stock: i64,
}

impl NewProduct {
    fn validate(&self) -> Result<(), AppError> {
        validate_fields(Some(self.name.as_str()), Some(self.price), Some(self.stock))
    }
}

#[derive(Deserialize)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i64>,
}

impl UpdateProduct {
    fn validate(&self) -> Result<(), AppError> {
        validate_fields(self.name.as_deref(), self.price, self.stock)
    }
}

fn validate_fields(
    name: Option<&str>,
    price: Option<f64>,
    stock: Option<i64>,
) -> Result<(), AppError> {
    if let Some(name) = name {
        if name.trim().is_empty() {
            return Err(AppError::Validation(
                "Please enter product name".to_string(),
            ));
        }
    }
    if price.is_some_and(|p| p < 0.0) {
        return Err(AppError::Validation("Price cannot be negative".to_string()));
    }
    if stock.is_some_and(|s| s < 0) {
        return Err(AppError::Validation("Stock cannot be negative".to_string()));
    }
    Ok(())
}

pub async fn new_product(
    State(state): State<Arc<AppState>>,
    AdminUser { id, .. }: AdminUser,
    Json(body): Json<NewProduct>,
) -> ApiResult<impl IntoResponse> {
    body.validate()?;

    let mut product = Product {
        id: None,
        name: body.name,
        price: body.price,
        stock: body.stock,
        user: id,
        ratings: 0.0,
        num_of_reviews: 0,
        reviews: Vec::new(),
        created_at: DateTime::now(),
    };

    let inserted = products(&state.db).insert_one(&product).await?;
    product.id = inserted.inserted_id.as_object_id();

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "product": product })),
    ))
}

pub async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<impl IntoResponse> {
    let collection = products(&state.db);

    let products_count = collection.count_documents(doc! {}).await?;

    let filter = build_filter(&params);
    let page = params.get("page").and_then(|p| p.parse().ok());
    let (skip, limit) = page_bounds(page);

    let page_items: Vec<Product> = collection
        .find(filter)
        .skip(skip)
        .limit(limit)
        .await?
        .try_collect()
        .await?;

    Ok(Json(json!({
        "success": true,
        "count": page_items.len(),
        "productsCount": products_count,
        "resPerPage": PAGE_SIZE,
        "products": page_items,
    })))
}

pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id, "Product")?;

    let product = products(&state.db)
        .find_one(doc! { "_id": id })
        .await?
        .ok_or(AppError::NotFound("Product"))?;

    Ok(Json(json!({ "success": true, "product": product })))
}

pub async fn update_product(
    State(state): State<Arc<AppState>>,
    AdminUser { .. }: AdminUser,
    Path(id): Path<String>,
    Json(body): Json<UpdateProduct>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id, "Product")?;
    body.validate()?;

    let mut set = Document::new();
    if let Some(name) = body.name {
        set.insert("name", name);
    }
    if let Some(price) = body.price {
        set.insert("price", price);
    }
    if let Some(stock) = body.stock {
        set.insert("stock", stock);
    }

    let collection = products(&state.db);

    let product = if set.is_empty() {
        collection.find_one(doc! { "_id": id }).await?
    } else {
        collection
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await?
    }
    .ok_or(AppError::NotFound("Product"))?;

    Ok(Json(json!({ "success": true, "product": product })))
}

pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    AdminUser { .. }: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id, "Product")?;

    products(&state.db)
        .find_one_and_delete(doc! { "_id": id })
        .await?
        .ok_or(AppError::NotFound("Product"))?;

    Ok(Json(json!({ "success": true, "message": "Product is deleted" })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewInput {
    pub product_id: String,
    pub rating: f64,
    pub comment: String,
}

pub async fn upsert_review(
    State(state): State<Arc<AppState>>,
    AuthUser { id, user }: AuthUser,
    Json(body): Json<ReviewInput>,
) -> ApiResult<impl IntoResponse> {
    rating::ensure_valid(body.rating)?;

    let product_id = parse_id(&body.product_id, "Product")?;
    let collection = products(&state.db);

    let mut product = collection
        .find_one(doc! { "_id": product_id })
        .await?
        .ok_or(AppError::NotFound("Product"))?;

    product.upsert_review(ProductReview {
        user: id,
        name: user.name,
        rating: body.rating,
        comment: body.comment,
    });

    collection
        .update_one(
            doc! { "_id": product_id },
            doc! { "$set": {
                "reviews": bson::to_bson(&product.reviews)?,
                "ratings": product.ratings,
                "numOfReviews": product.num_of_reviews,
            }},
        )
        .await?;

    Ok(Json(json!({ "success": true })))
}
