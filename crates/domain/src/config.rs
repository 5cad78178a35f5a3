//! Service configuration.

use std::time::Duration;

/// Runtime policy shared by the order and promocode services.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Upper bound for one operation, transaction included. On expiry the
    /// transaction is dropped (rolled back) and `DomainError::Timeout` returned.
    pub operation_timeout: Duration,

    /// Whether `OrderService::get_basket` creates a missing basket.
    pub lazy_basket: bool,
}

impl ServiceConfig {
    /// Returns a copy with a different operation timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Returns a copy with a different lazy-basket policy.
    pub fn with_lazy_basket(mut self, lazy: bool) -> Self {
        self.lazy_basket = lazy;
        self
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            operation_timeout: Duration::from_secs(5),
            lazy_basket: true,
        }
    }
}
