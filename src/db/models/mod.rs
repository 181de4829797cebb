//! Database models

pub mod order;
pub mod product;

pub use order::{Order, OrderCreate, OrderItem, OrderItemCreate, OrderStatus, ShippingAddress};
pub use product::{Product, ProductCreate};
