use serde::{Deserialize, Serialize};

/// Declares a numeric identifier newtype.
///
/// Identifiers are opaque `i64` values assigned by the store; wrapping them
/// keeps an order id from being passed where a food id is expected.
macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates an identifier from its raw value.
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Returns the raw value.
            pub const fn get(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

numeric_id!(
    /// Identifier of an order (a basket is an order in `basket` status).
    OrderId
);

numeric_id!(
    /// Identifier of an authenticated user.
    UserId
);

numeric_id!(
    /// Identifier of a catalog food item.
    FoodId
);

numeric_id!(
    /// Identifier of a restaurant.
    RestaurantId
);

numeric_id!(
    /// Identifier of a promocode definition.
    PromocodeId
);
