//! HTTP route handlers.

pub mod basket;
pub mod guests;
pub mod health;
pub mod metrics;
pub mod orders;
mod owner;

pub use owner::{CurrentOwner, GUEST_TOKEN_HEADER, USER_ID_HEADER};
