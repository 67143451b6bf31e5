/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Lookup from plugin name to broker constructor.

use crate::broker::{Broker, BrokerOptions};
use crate::brokers::memory::{MemoryBroker, MemoryHub, MEMORY_PLUGIN};
use crate::error::FederationError;
use std::collections::HashMap;
use std::sync::Arc;

/// Builds a broker handle configured with a host list.
pub type BrokerConstructor = Arc<dyn Fn(BrokerOptions) -> Arc<dyn Broker> + Send + Sync>;

/// Registry of broker plugins known to the federator.
///
/// New backends are added with [`BrokerRegistry::register`]; the bridge only
/// ever sees the [`Broker`] contract.
#[derive(Clone, Default)]
pub struct BrokerRegistry {
    constructors: HashMap<String, BrokerConstructor>,
}

impl BrokerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `memory` plugin bound to `hub`.
    pub fn with_defaults(hub: MemoryHub) -> Self {
        let mut registry = Self::new();
        registry.register(MEMORY_PLUGIN, move |options| {
            Arc::new(MemoryBroker::new(hub.clone(), options.hosts)) as Arc<dyn Broker>
        });
        registry
    }

    /// Registers a plugin, returning the constructor it replaced, if any.
    pub fn register<F>(&mut self, name: &str, constructor: F) -> Option<BrokerConstructor>
    where
        F: Fn(BrokerOptions) -> Arc<dyn Broker> + Send + Sync + 'static,
    {
        self.constructors
            .insert(name.to_string(), Arc::new(constructor))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered plugin names, sorted.
    pub fn plugins(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Constructs an unconnected broker for `name`.
    pub fn build(&self, name: &str, hosts: &[String]) -> Result<Arc<dyn Broker>, FederationError> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| FederationError::UnknownBrokerPlugin(name.to_string()))?;

        Ok(constructor(BrokerOptions::with_hosts(hosts)))
    }
}

#[cfg(test)]
mod tests {
    use super::BrokerRegistry;
    use crate::broker::Broker;
    use crate::brokers::memory::{MemoryBroker, MemoryHub, MEMORY_PLUGIN};
    use crate::error::FederationError;
    use std::sync::Arc;

    #[test]
    fn defaults_register_memory_plugin() {
        let registry = BrokerRegistry::with_defaults(MemoryHub::new());

        assert!(registry.contains(MEMORY_PLUGIN));
        assert_eq!(registry.plugins(), vec![MEMORY_PLUGIN]);
    }

    #[test]
    fn build_passes_hosts_to_constructor() {
        let registry = BrokerRegistry::with_defaults(MemoryHub::new());

        let broker = registry
            .build(MEMORY_PLUGIN, &["a".to_string(), "b".to_string()])
            .expect("memory plugin is registered");

        assert_eq!(broker.identity(), MEMORY_PLUGIN);
        assert_eq!(broker.address(), "a,b");
    }

    #[test]
    fn unknown_plugin_is_reported() {
        let registry = BrokerRegistry::new();

        let result = registry.build("kafka", &["k:9092".to_string()]);
        assert!(matches!(
            result,
            Err(FederationError::UnknownBrokerPlugin(ref name)) if name == "kafka"
        ));
    }

    #[test]
    fn register_replaces_existing_constructor() {
        let hub = MemoryHub::new();
        let mut registry = BrokerRegistry::with_defaults(hub.clone());

        let replaced = registry.register(MEMORY_PLUGIN, move |options| {
            Arc::new(MemoryBroker::new(hub.clone(), options.hosts)) as Arc<dyn Broker>
        });

        assert!(replaced.is_some());
        assert_eq!(registry.plugins().len(), 1);
    }
}
