//! Order Model
//!
//! Orders hold integer minor-currency amounts only; floating point never
//! touches money. The status machine is pending → paid, one way.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::payments::PaymentProvider;

/// Order status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
}

/// Customer order
///
/// `external_txn_id` is set exactly once, by the finalizer, together with
/// the pending → paid transition. Once paid it is immutable.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: String,
    pub status: OrderStatus,
    pub payment_provider: Option<PaymentProvider>,
    pub external_txn_id: Option<String>,
    pub amount_total: i64,
    pub currency: String,
    pub customer_email: Option<String>,
    pub ship_name: Option<String>,
    pub ship_street: Option<String>,
    pub ship_city: Option<String>,
    pub ship_postal_code: Option<String>,
    pub ship_country: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One priced quantity within an order
///
/// `product_id = None` marks a non-catalog line such as shipping.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: String,
    pub product_id: Option<String>,
    pub name: String,
    pub quantity: i64,
    pub unit_price: i64,
}

/// Shipping address fields on the checkout payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct ShippingAddress {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 200))]
    pub street: String,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(min = 1, max = 20))]
    pub postal_code: String,
    #[validate(length(min = 2, max = 2))]
    pub country: String,
}

/// Checkout line selection: a catalog product and a quantity
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OrderItemCreate {
    #[validate(length(min = 1))]
    pub product_id: String,
    #[validate(range(min = 1, max = 999))]
    pub quantity: i64,
}

/// Create order payload (checkout session initiation)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OrderCreate {
    #[validate(email)]
    pub customer_email: Option<String>,
    #[validate(nested)]
    pub shipping: Option<ShippingAddress>,
    #[validate(nested, length(min = 1))]
    pub items: Vec<OrderItemCreate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    fn item(product_id: &str, quantity: i64) -> OrderItemCreate {
        OrderItemCreate {
            product_id: product_id.into(),
            quantity,
        }
    }

    #[test]
    fn empty_cart_fails_validation() {
        let payload = OrderCreate {
            customer_email: None,
            shipping: None,
            items: vec![],
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn zero_quantity_fails_validation() {
        let payload = OrderCreate {
            customer_email: None,
            shipping: None,
            items: vec![item("p-1", 0)],
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn minimal_cart_passes_validation() {
        let payload = OrderCreate {
            customer_email: Some("buyer@example.com".into()),
            shipping: None,
            items: vec![item("p-1", 1)],
        };
        assert!(payload.validate().is_ok());
    }
}
