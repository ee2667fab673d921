//! # MongoDB
//!
//! Document store backing every entity. Four collections, one per
//! schema: `users`, `products`, `trades`, `consultations`. Handlers hold
//! no authoritative state between requests; the per-document atomicity
//! of the store is the only durability unit.
//!
//! ## Indexes
//!
//! Bootstrapped at startup:
//! - unique index on `users.email`
//! - `2dsphere` index on `users.location` for `$near` role searches

use bson::doc;
use mongodb::{options::IndexOptions, Client, Collection, Database, IndexModel};
use tracing::info;

use crate::models::{
    consultation::Consultation, product::Product, trade::Trade, user::User,
};

pub const USERS: &str = "users";
pub const PRODUCTS: &str = "products";
pub const TRADES: &str = "trades";
pub const CONSULTATIONS: &str = "consultations";

pub async fn init_mongo(uri: &str, name: &str) -> Database {
    let client = Client::with_uri_str(uri)
        .await
        .expect("MongoDB misconfigured!");

    let db = client.database(name);
    ensure_indexes(&db).await;

    info!("MongoDB connected, database: {name}");

    db
}

async fn ensure_indexes(db: &Database) {
    let unique_email = IndexModel::builder()
        .keys(doc! { "email": 1 })
        .options(IndexOptions::builder().unique(true).build())
        .build();

    users(db)
        .create_index(unique_email)
        .await
        .expect("Index bootstrap failed!");

    let geo = IndexModel::builder()
        .keys(doc! { "location": "2dsphere" })
        .build();

    users(db)
        .create_index(geo)
        .await
        .expect("Index bootstrap failed!");
}

pub fn users(db: &Database) -> Collection<User> {
    db.collection(USERS)
}

pub fn products(db: &Database) -> Collection<Product> {
    db.collection(PRODUCTS)
}

pub fn trades(db: &Database) -> Collection<Trade> {
    db.collection(TRADES)
}

pub fn consultations(db: &Database) -> Collection<Consultation> {
    db.collection(CONSULTATIONS)
}
