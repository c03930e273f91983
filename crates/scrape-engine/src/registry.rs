//! Capability registry: immutable `(exchange, data type) -> Capability` map.
//!
//! Built once at start-up through [`RegistryBuilder`] and shared read-only
//! (behind `Arc`) for the rest of the run. Adding an exchange means
//! registering another capability; resolution never changes.

use std::sync::Arc;

use ahash::AHashMap;
use scrape_core::{DataType, Exchange, ScrapeError};

use crate::Capability;
use crate::binance::BinanceOrderBook;
use crate::bybit::BybitOrderBook;
use crate::http::HttpClient;
use crate::luno::LunoOrderBook;

/// Read-only capability lookup table.
pub struct Registry {
    capabilities: AHashMap<(Exchange, DataType), Arc<dyn Capability>>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Registry with every built-in capability, sharing one HTTP client.
    pub fn with_default_capabilities(http: HttpClient) -> Result<Self, ScrapeError> {
        Ok(Self::builder()
            .register(
                Exchange::Binance,
                DataType::OrderBook,
                Arc::new(BinanceOrderBook::new(http.clone())),
            )?
            .register(
                Exchange::Bybit,
                DataType::OrderBook,
                Arc::new(BybitOrderBook::new(http.clone())),
            )?
            .register(Exchange::Luno, DataType::OrderBook, Arc::new(LunoOrderBook::new(http)))?
            .build())
    }

    /// Look up the capability for a pair. `None` means nothing is registered.
    pub fn resolve(&self, exchange: Exchange, data_type: DataType) -> Option<Arc<dyn Capability>> {
        self.capabilities.get(&(exchange, data_type)).cloned()
    }

    pub fn contains(&self, exchange: Exchange, data_type: DataType) -> bool {
        self.capabilities.contains_key(&(exchange, data_type))
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}

/// Collects bindings before freezing them into a [`Registry`].
#[derive(Default)]
pub struct RegistryBuilder {
    capabilities: AHashMap<(Exchange, DataType), Arc<dyn Capability>>,
}

impl RegistryBuilder {
    /// Bind `capability` to a pair. A pair may be bound only once.
    pub fn register(
        mut self,
        exchange: Exchange,
        data_type: DataType,
        capability: Arc<dyn Capability>,
    ) -> Result<Self, ScrapeError> {
        if self.capabilities.contains_key(&(exchange, data_type)) {
            return Err(ScrapeError::Registry(format!(
                "{exchange}/{data_type} already has a capability"
            )));
        }
        self.capabilities.insert((exchange, data_type), capability);
        Ok(self)
    }

    pub fn build(self) -> Registry {
        Registry { capabilities: self.capabilities }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use async_trait::async_trait;
    use scrape_core::{PollRequest, PollResult};

    use super::*;

    struct Named(&'static str);

    #[async_trait]
    impl Capability for Named {
        fn name(&self) -> &str {
            self.0
        }
        async fn scrape(&self, _request: &PollRequest) -> Result<Box<dyn PollResult>> {
            anyhow::bail!("not used")
        }
    }

    #[test]
    fn defaults_cover_order_book_exchanges() {
        let registry = Registry::with_default_capabilities(HttpClient::new()).unwrap();
        assert_eq!(registry.len(), 3);
        for exchange in [Exchange::Binance, Exchange::Bybit, Exchange::Luno] {
            assert!(registry.contains(exchange, DataType::OrderBook));
        }
        assert!(registry.resolve(Exchange::Kraken, DataType::OrderBook).is_none());
        assert_eq!(
            registry.resolve(Exchange::Luno, DataType::OrderBook).unwrap().name(),
            "luno_order_book"
        );
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let builder = Registry::builder()
            .register(Exchange::Binance, DataType::OrderBook, Arc::new(Named("first")))
            .unwrap();
        let err = builder
            .register(Exchange::Binance, DataType::OrderBook, Arc::new(Named("second")))
            .err()
            .unwrap();
        assert!(matches!(err, ScrapeError::Registry(_)));
    }

    #[test]
    fn empty_registry_resolves_nothing() {
        let registry = Registry::builder().build();
        assert!(registry.is_empty());
        assert!(registry.resolve(Exchange::Binance, DataType::OrderBook).is_none());
    }
}
