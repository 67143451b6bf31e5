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

//! Per-region set of connected broker handles.

use crate::broker::Broker;
use crate::error::{ConnectPhase, FederationError};
use crate::observability::{events, fields};
use crate::registry::BrokerRegistry;
use crate::topology::Topology;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

const COMPONENT: &str = "region_pool";

/// Connected brokers grouped by region. Built fresh on every start.
///
/// A region that ended up with no connected broker is still present, with an
/// empty list; it simply contributes nothing to bridging.
#[derive(Default)]
pub struct RegionBrokerPool {
    regions: BTreeMap<String, Vec<Arc<dyn Broker>>>,
}

impl RegionBrokerPool {
    /// Builds and connects every broker the topology names.
    pub async fn connect(topology: &Topology, registry: &BrokerRegistry) -> Self {
        let mut pool = Self::default();
        pool.connect_regions(topology, registry).await;
        pool
    }

    /// Connects the topology's brokers into this pool, one at a time. Each
    /// broker is added as soon as its connect succeeds, so a pool whose
    /// connect was abandoned halfway still holds everything it connected.
    ///
    /// A broker whose plugin is unknown, or that fails either connect phase,
    /// is logged and skipped; its siblings are still attempted.
    pub async fn connect_regions(&mut self, topology: &Topology, registry: &BrokerRegistry) {
        for (region, brokers) in &topology.brokers {
            info!(
                event = events::REGION_SETUP_START,
                component = COMPONENT,
                region = region.as_str(),
                "starting region setup"
            );

            let connected = self.regions.entry(region.clone()).or_default();
            for (plugin, params) in brokers {
                match Self::setup(registry, plugin, &params.hosts).await {
                    Ok(broker) => {
                        info!(
                            event = events::REGION_BROKER_ADDED,
                            component = COMPONENT,
                            region = region.as_str(),
                            plugin = plugin.as_str(),
                            addr = %fields::format_hosts(&params.hosts),
                            "adding broker"
                        );
                        connected.push(broker);
                    }
                    Err(err) => {
                        warn!(
                            event = events::REGION_BROKER_SKIPPED,
                            component = COMPONENT,
                            region = region.as_str(),
                            plugin = plugin.as_str(),
                            addr = %fields::format_hosts(&params.hosts),
                            err = %err,
                            "skipping broker"
                        );
                    }
                }
            }
        }
    }

    /// Constructs one broker and runs the two-phase connect.
    async fn setup(
        registry: &BrokerRegistry,
        plugin: &str,
        hosts: &[String],
    ) -> Result<Arc<dyn Broker>, FederationError> {
        let broker = registry.build(plugin, hosts)?;

        broker
            .init()
            .await
            .map_err(|source| FederationError::BrokerConnectFailure {
                plugin: plugin.to_string(),
                address: broker.address(),
                phase: ConnectPhase::Init,
                source,
            })?;

        broker
            .connect()
            .await
            .map_err(|source| FederationError::BrokerConnectFailure {
                plugin: plugin.to_string(),
                address: broker.address(),
                phase: ConnectPhase::Connect,
                source,
            })?;

        Ok(broker)
    }

    /// Whether the region was present in the topology this pool was built from.
    pub fn contains_region(&self, region: &str) -> bool {
        self.regions.contains_key(region)
    }

    pub fn brokers(&self, region: &str) -> &[Arc<dyn Broker>] {
        self.regions.get(region).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Union of the broker lists of `regions`, in the order given.
    pub fn collect<'a, I>(&self, regions: I) -> Vec<Arc<dyn Broker>>
    where
        I: IntoIterator<Item = &'a String>,
    {
        regions
            .into_iter()
            .flat_map(|region| self.brokers(region).iter().cloned())
            .collect()
    }

    pub fn regions(&self) -> impl Iterator<Item = (&str, &[Arc<dyn Broker>])> {
        self.regions
            .iter()
            .map(|(region, brokers)| (region.as_str(), brokers.as_slice()))
    }

    /// Total number of connected brokers across all regions.
    pub fn broker_count(&self) -> usize {
        self.regions.values().map(Vec::len).sum()
    }

    /// Disconnects every broker. Regions are torn down concurrently, brokers
    /// within a region one after another; failures are logged only.
    pub async fn disconnect_all(&self) {
        join_all(self.regions.iter().map(|(region, brokers)| async move {
            info!(
                event = events::REGION_TEARDOWN,
                component = COMPONENT,
                region = region.as_str(),
                brokers = brokers.len(),
                "teardown"
            );

            for broker in brokers {
                if let Err(err) = broker.disconnect().await {
                    warn!(
                        event = events::REGION_DISCONNECT_FAILED,
                        component = COMPONENT,
                        region = region.as_str(),
                        broker = %fields::format_broker(broker.as_ref()),
                        err = %err,
                        "failed to disconnect broker"
                    );
                }
            }
        }))
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::RegionBrokerPool;
    use crate::brokers::memory::MemoryHub;
    use crate::registry::BrokerRegistry;
    use crate::topology::Topology;
    use serde_json::json;

    fn topology(brokers: serde_json::Value) -> Topology {
        Topology::extract(&json!({
            "topics": { "orders": { "rate": 1.0, "publish": ["eu"], "subscribe": ["us"] } },
            "brokers": brokers
        }))
        .expect("valid topology")
    }

    #[tokio::test]
    async fn connects_every_configured_broker() {
        let hub = MemoryHub::new();
        let registry = BrokerRegistry::with_defaults(hub.clone());
        let topology = topology(json!({
            "us": { "memory": { "hosts": ["a"] } },
            "eu": { "memory": { "hosts": ["b"] } }
        }));

        let pool = RegionBrokerPool::connect(&topology, &registry).await;

        assert_eq!(pool.broker_count(), 2);
        assert_eq!(pool.brokers("us").len(), 1);
        assert_eq!(hub.connections("a"), 1);
        assert_eq!(hub.connections("b"), 1);

        pool.disconnect_all().await;
        assert_eq!(hub.connections("a"), 0);
        assert_eq!(hub.connections("b"), 0);
    }

    #[tokio::test]
    async fn unknown_plugin_is_skipped_without_affecting_siblings() {
        let hub = MemoryHub::new();
        let registry = BrokerRegistry::with_defaults(hub.clone());
        let topology = topology(json!({
            "us": { "memory": { "hosts": ["a"] }, "kafka": { "hosts": ["k:9092"] } }
        }));

        let pool = RegionBrokerPool::connect(&topology, &registry).await;

        assert_eq!(pool.brokers("us").len(), 1);
        assert_eq!(pool.brokers("us")[0].identity(), "memory");
        assert_eq!(hub.connections("a"), 1);
    }

    #[tokio::test]
    async fn failed_connect_leaves_region_present_but_empty() {
        let hub = MemoryHub::new();
        hub.set_unreachable("a", true);
        let registry = BrokerRegistry::with_defaults(hub.clone());
        let topology = topology(json!({
            "us": { "memory": { "hosts": ["a"] } },
            "eu": { "memory": { "hosts": [] } }
        }));

        let pool = RegionBrokerPool::connect(&topology, &registry).await;

        assert!(pool.contains_region("us"));
        assert!(pool.contains_region("eu"));
        assert!(!pool.contains_region("apac"));
        assert_eq!(pool.broker_count(), 0);
        assert!(pool.brokers("apac").is_empty());
    }

    #[tokio::test]
    async fn collect_unions_region_lists() {
        let hub = MemoryHub::new();
        let registry = BrokerRegistry::with_defaults(hub);
        let topology = topology(json!({
            "us": { "memory": { "hosts": ["a"] } },
            "eu": { "memory": { "hosts": ["b"] } },
            "apac": { "memory": { "hosts": ["c"] } }
        }));

        let pool = RegionBrokerPool::connect(&topology, &registry).await;
        let wanted = ["us".to_string(), "apac".to_string(), "mars".to_string()];

        let brokers = pool.collect(wanted.iter());
        let addresses: Vec<String> = brokers.iter().map(|b| b.address()).collect();
        assert_eq!(addresses, vec!["a".to_string(), "c".to_string()]);
        assert_eq!(pool.regions().count(), 3);
    }
}
