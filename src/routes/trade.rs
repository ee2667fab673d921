use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use bson::{doc, DateTime};
use futures::TryStreamExt;
use mongodb::Database;
use serde::Deserialize;
use serde_json::json;

use super::parse_id;
use crate::{
    auth::AuthUser,
    database::{products, trades, users},
    error::{ApiResult, AppError},
    models::{
        product::ProductSummary,
        trade::{default_price, Trade, TradeStatus, TradeView},
        user::UserSummary,
    },
    policy::{can_access_trade, Party, TradeOp},
    rating,
    state::AppState,
};

#[derive(Deserialize)]
pub struct NewTrade {
    pub product: String,
    pub seller: String,
    pub quantity: i64,
    pub price: Option<f64>,
}

pub async fn new_trade(
    State(state): State<Arc<AppState>>,
    AuthUser { id, user }: AuthUser,
    Json(body): Json<NewTrade>,
) -> ApiResult<impl IntoResponse> {
    if body.quantity < 1 {
        return Err(AppError::Validation("Please enter quantity".to_string()));
    }
    if body.price.is_some_and(|p| p < 0.0) {
        return Err(AppError::Validation("Price cannot be negative".to_string()));
    }

    let product_id = parse_id(&body.product, "Product")?;
    let seller_id = parse_id(&body.seller, "User")?;

    let product = products(&state.db)
        .find_one(doc! { "_id": product_id })
        .await?
        .ok_or(AppError::NotFound("Product"))?;

    if product.stock < body.quantity {
        return Err(AppError::BusinessRule("Not enough stock available"));
    }

    let mut trade = Trade {
        id: None,
        product: product_id,
        seller: seller_id,
        buyer: id,
        quantity: body.quantity,
        price: default_price(product.price, body.quantity, body.price),
        status: TradeStatus::Pending,
        completed_at: None,
        seller_rating: None,
        buyer_rating: None,
        seller_feedback: None,
        buyer_feedback: None,
        created_at: DateTime::now(),
    };

    let inserted = trades(&state.db).insert_one(&trade).await?;
    trade.id = inserted.inserted_id.as_object_id();

    if let Some(seller) = users(&state.db).find_one(doc! { "_id": seller_id }).await? {
        let message = format!(
            "You have a new trade request from {}.\n\nProduct: {}\nQuantity: {}\nPrice: {}\n\nPlease login to your account to respond.",
            user.name, product.name, trade.quantity, trade.price
        );
        state
            .mailer
            .send(seller.email, "New Trade Request".to_string(), message);
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "trade": trade })),
    ))
}

pub async fn my_trades(
    State(state): State<Arc<AppState>>,
    AuthUser { id, .. }: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let mine: Vec<Trade> = trades(&state.db)
        .find(doc! { "$or": [ { "seller": id }, { "buyer": id } ] })
        .await?
        .try_collect()
        .await?;

    let mut views = Vec::with_capacity(mine.len());
    for trade in mine {
        views.push(populate(&state.db, trade).await?);
    }

    Ok(Json(json!({ "success": true, "trades": views })))
}

pub async fn get_trade(
    State(state): State<Arc<AppState>>,
    AuthUser { id, .. }: AuthUser,
    Path(trade_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let trade_id = parse_id(&trade_id, "Trade")?;

    let trade = trades(&state.db)
        .find_one(doc! { "_id": trade_id })
        .await?
        .ok_or(AppError::NotFound("Trade"))?;

    if !can_access_trade(id, &trade, TradeOp::View) {
        return Err(AppError::Unauthorized(
            "Not authorized to access this trade",
        ));
    }

    let view = populate(&state.db, trade).await?;

    Ok(Json(json!({ "success": true, "trade": view })))
}

#[derive(Deserialize)]
pub struct TradeTransition {
    pub status: TradeStatus,
}

pub async fn update_trade(
    State(state): State<Arc<AppState>>,
    AuthUser { id, .. }: AuthUser,
    Path(trade_id): Path<String>,
    Json(body): Json<TradeTransition>,
) -> ApiResult<impl IntoResponse> {
    let trade_id = parse_id(&trade_id, "Trade")?;
    let collection = trades(&state.db);

    let mut trade = collection
        .find_one(doc! { "_id": trade_id })
        .await?
        .ok_or(AppError::NotFound("Trade"))?;

    if !can_access_trade(id, &trade, TradeOp::Transition) {
        return Err(AppError::Unauthorized("Not authorized to update this trade"));
    }

    let product = products(&state.db)
        .find_one(doc! { "_id": trade.product })
        .await?;

    let decrement = trade.apply_transition(body.status, DateTime::now());

    if let Some(quantity) = decrement {
        // Availability was checked when the trade was created, not here;
        // completion decrements whatever is left.
        products(&state.db)
            .update_one(
                doc! { "_id": trade.product },
                doc! { "$inc": { "stock": -quantity } },
            )
            .await?;
    }

    let mut set = doc! { "status": bson::to_bson(&trade.status)? };
    if let Some(at) = trade.completed_at {
        set.insert("completedAt", at);
    }

    collection
        .update_one(doc! { "_id": trade_id }, doc! { "$set": set })
        .await?;

    if let Some(buyer) = users(&state.db).find_one(doc! { "_id": trade.buyer }).await? {
        let product_name = product.as_ref().map(|p| p.name.as_str()).unwrap_or("the product");
        let status = trade.status.as_str();
        let message = format!(
            "Your trade request for {product_name} has been {status} by the seller.\n\nPlease login to your account for more details."
        );
        state
            .mailer
            .send(buyer.email, format!("Trade {status}"), message);
    }

    Ok(Json(json!({ "success": true, "trade": trade })))
}

#[derive(Deserialize)]
pub struct TradeRating {
    pub rating: f64,
    pub feedback: Option<String>,
    pub ratee: Party,
}

pub async fn rate_trade(
    State(state): State<Arc<AppState>>,
    AuthUser { id, .. }: AuthUser,
    Path(trade_id): Path<String>,
    Json(body): Json<TradeRating>,
) -> ApiResult<impl IntoResponse> {
    rating::ensure_valid(body.rating)?;

    let trade_id = parse_id(&trade_id, "Trade")?;
    let collection = trades(&state.db);

    let trade = collection
        .find_one(doc! { "_id": trade_id })
        .await?
        .ok_or(AppError::NotFound("Trade"))?;

    if trade.status != TradeStatus::Completed {
        return Err(AppError::BusinessRule("You can only rate completed trades"));
    }

    if !can_access_trade(id, &trade, TradeOp::View) {
        return Err(AppError::Unauthorized("Not authorized to rate this trade"));
    }

    if !can_access_trade(id, &trade, TradeOp::Rate(body.ratee)) {
        return Err(AppError::Validation("Invalid rating operation".to_string()));
    }

    let (rating_field, feedback_field, ratee_id, already_rated) = match body.ratee {
        Party::Seller => (
            "sellerRating",
            "sellerFeedback",
            trade.seller,
            trade.seller_rating.is_some(),
        ),
        Party::Buyer => (
            "buyerRating",
            "buyerFeedback",
            trade.buyer,
            trade.buyer_rating.is_some(),
        ),
    };

    if already_rated {
        return Err(AppError::BusinessRule("This trade has already been rated"));
    }

    let mut set = bson::Document::new();
    set.insert(rating_field, body.rating);
    if let Some(feedback) = &body.feedback {
        set.insert(feedback_field, feedback.as_str());
    }

    collection
        .update_one(doc! { "_id": trade_id }, doc! { "$set": set })
        .await?;

    rating::refresh_trade_rating(&state.db, &state.rating_locks, ratee_id).await?;

    Ok(Json(json!({ "success": true, "message": "Trade rated successfully" })))
}

async fn populate(db: &Database, trade: Trade) -> ApiResult<TradeView> {
    let product = products(db)
        .find_one(doc! { "_id": trade.product })
        .await?
        .map(|p| ProductSummary::from(&p));

    let seller = users(db)
        .find_one(doc! { "_id": trade.seller })
        .await?
        .map(|u| UserSummary::from(&u));

    let buyer = users(db)
        .find_one(doc! { "_id": trade.buyer })
        .await?
        .map(|u| UserSummary::from(&u));

    Ok(TradeView::assemble(trade, product, seller, buyer))
}
