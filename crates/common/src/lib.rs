//! Shared value types used by the store, domain and API crates.

pub mod money;
pub mod owner;
pub mod status;
pub mod types;

pub use money::Money;
pub use owner::{GuestToken, Owner};
pub use status::OrderStatus;
pub use types::{FoodId, OrderId, PromocodeId, RestaurantId, UserId};
