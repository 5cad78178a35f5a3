//! Persistence for the order aggregate, its food line items and promocodes.
//!
//! Every read-then-write sequence runs on a single [`Transaction`] obtained
//! from a [`Store`]. The repository traits are implemented by the transaction
//! type itself, so a service cannot accidentally mix a pooled read into a
//! transactional write path.

pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod repository;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use model::{LineItemRecord, NewPromocode, OrderRecord, Promocode, PromocodeKind};
pub use postgres::{PgTransaction, PostgresStore};
pub use repository::{LineItemRepository, OrderRepository, PromocodeRepository, Store, Transaction};
