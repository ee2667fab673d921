pub mod consultation;
pub mod product;
pub mod trade;
pub mod user;

use bson::oid::ObjectId;

use crate::error::AppError;

/// A path id that does not even parse can name no record.
pub(crate) fn parse_id(id: &str, entity: &'static str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(id).map_err(|_| AppError::NotFound(entity))
}
