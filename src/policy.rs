//! Entity access policy, kept free of HTTP plumbing. Handlers translate a
//! `false` into the authorization failure for their route.

use bson::oid::ObjectId;
use serde::Deserialize;

use crate::models::{consultation::Consultation, trade::Trade};

/// Side of a trade being rated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Party {
    Seller,
    Buyer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeOp {
    View,
    Transition,
    Rate(Party),
}

/// A trade is visible to its two parties, transitioned only by the
/// seller, and each side is rated only by the opposite party.
pub fn can_access_trade(principal: ObjectId, trade: &Trade, op: TradeOp) -> bool {
    match op {
        TradeOp::View => principal == trade.seller || principal == trade.buyer,
        TradeOp::Transition => principal == trade.seller,
        TradeOp::Rate(Party::Seller) => principal == trade.buyer,
        TradeOp::Rate(Party::Buyer) => principal == trade.seller,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsultationOp {
    View,
    Transition,
    Rate,
}

/// A consultation is visible to farmer and veterinarian, transitioned
/// only by the veterinarian, and rated only by the farmer.
pub fn can_access_consultation(
    principal: ObjectId,
    consultation: &Consultation,
    op: ConsultationOp,
) -> bool {
    match op {
        ConsultationOp::View => {
            principal == consultation.farmer || principal == consultation.veterinarian
        }
        ConsultationOp::Transition => principal == consultation.veterinarian,
        ConsultationOp::Rate => principal == consultation.farmer,
    }
}

#[cfg(test)]
mod tests {
    use bson::DateTime;

    use super::*;
    use crate::models::{
        consultation::ConsultationStatus,
        trade::TradeStatus,
    };

    fn trade(seller: ObjectId, buyer: ObjectId) -> Trade {
        Trade {
            id: Some(ObjectId::new()),
            product: ObjectId::new(),
            seller,
            buyer,
            quantity: 2,
            price: 50.0,
            status: TradeStatus::Pending,
            completed_at: None,
            seller_rating: None,
            buyer_rating: None,
            seller_feedback: None,
            buyer_feedback: None,
            created_at: DateTime::now(),
        }
    }

    fn consultation(farmer: ObjectId, veterinarian: ObjectId) -> Consultation {
        Consultation {
            id: Some(ObjectId::new()),
            farmer,
            veterinarian,
            subject: "Herd check".to_string(),
            description: "Routine visit".to_string(),
            scheduled_at: DateTime::now(),
            status: ConsultationStatus::Pending,
            completed_at: None,
            farmer_rating: None,
            farmer_feedback: None,
            created_at: DateTime::now(),
        }
    }

    #[test]
    fn only_parties_view_a_trade() {
        let (seller, buyer, outsider) = (ObjectId::new(), ObjectId::new(), ObjectId::new());
        let t = trade(seller, buyer);

        assert!(can_access_trade(seller, &t, TradeOp::View));
        assert!(can_access_trade(buyer, &t, TradeOp::View));
        assert!(!can_access_trade(outsider, &t, TradeOp::View));
    }

    #[test]
    fn only_the_seller_transitions_a_trade() {
        let (seller, buyer) = (ObjectId::new(), ObjectId::new());
        let t = trade(seller, buyer);

        assert!(can_access_trade(seller, &t, TradeOp::Transition));
        assert!(!can_access_trade(buyer, &t, TradeOp::Transition));
        assert!(!can_access_trade(ObjectId::new(), &t, TradeOp::Transition));
    }

    #[test]
    fn each_side_is_rated_by_the_opposite_party() {
        let (seller, buyer) = (ObjectId::new(), ObjectId::new());
        let t = trade(seller, buyer);

        assert!(can_access_trade(buyer, &t, TradeOp::Rate(Party::Seller)));
        assert!(!can_access_trade(seller, &t, TradeOp::Rate(Party::Seller)));

        assert!(can_access_trade(seller, &t, TradeOp::Rate(Party::Buyer)));
        assert!(!can_access_trade(buyer, &t, TradeOp::Rate(Party::Buyer)));

        let outsider = ObjectId::new();
        assert!(!can_access_trade(outsider, &t, TradeOp::Rate(Party::Seller)));
        assert!(!can_access_trade(outsider, &t, TradeOp::Rate(Party::Buyer)));
    }

    #[test]
    fn only_parties_view_a_consultation() {
        let (farmer, vet, outsider) = (ObjectId::new(), ObjectId::new(), ObjectId::new());
        let c = consultation(farmer, vet);

        assert!(can_access_consultation(farmer, &c, ConsultationOp::View));
        assert!(can_access_consultation(vet, &c, ConsultationOp::View));
        assert!(!can_access_consultation(outsider, &c, ConsultationOp::View));
    }

    #[test]
    fn only_the_veterinarian_transitions_and_only_the_farmer_rates() {
        let (farmer, vet) = (ObjectId::new(), ObjectId::new());
        let c = consultation(farmer, vet);

        assert!(can_access_consultation(vet, &c, ConsultationOp::Transition));
        assert!(!can_access_consultation(farmer, &c, ConsultationOp::Transition));

        assert!(can_access_consultation(farmer, &c, ConsultationOp::Rate));
        assert!(!can_access_consultation(vet, &c, ConsultationOp::Rate));
    }
}
