use std::collections::BTreeMap;

use thiserror::Error;
use vme::{GenericCard, SharedCard};

use crate::{CardConfig, RamCard};

/// Builds a card from its configuration.
pub type CardFactory = fn(&CardConfig) -> Result<SharedCard, CatalogError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("unknown card type {0:?}")]
    UnknownCardType(String),

    #[error("invalid {card} card option: {reason}")]
    InvalidOption { card: String, reason: String },
}

/// Card types that can be plugged into a slot, by name.
pub struct CardCatalog {
    factories: BTreeMap<String, CardFactory>,
}

impl CardCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registers `factory` under `name`, replacing any previous registration.
    pub fn register(&mut self, name: impl Into<String>, factory: CardFactory) {
        self.factories.insert(name.into(), factory);
    }

    pub fn create(&self, config: &CardConfig) -> Result<SharedCard, CatalogError> {
        let factory = self
            .factories
            .get(&config.kind)
            .ok_or_else(|| CatalogError::UnknownCardType(config.kind.clone()))?;
        factory(config)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl Default for CardCatalog {
    /// The built-in `generic` and `ram` cards.
    fn default() -> Self {
        let mut catalog = Self::new();
        catalog.register("generic", |_| Ok(GenericCard::new().into_shared()));
        catalog.register("ram", |config| Ok(RamCard::from_config(config)?.into_shared()));
        catalog
    }
}

impl core::fmt::Debug for CardCatalog {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}
