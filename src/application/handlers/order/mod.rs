//! Order handlers.

mod create_order;
mod get_order;
mod transition_order;

pub use create_order::{CreateOrderCommand, CreateOrderHandler};
pub use get_order::{GetOrderHandler, GetOrderQuery, OrderView};
pub use transition_order::{TransitionOrderCommand, TransitionOrderHandler};
