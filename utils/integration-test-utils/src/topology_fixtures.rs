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

use serde_json::{json, Value};
use std::sync::Arc;
use topic_federation::{Broker, BrokerRegistry, MemoryBroker, MemoryHub};

/// Plugin name the fixtures register the in-memory broker under.
pub const MEM_PLUGIN: &str = "mem";

/// Registry with the in-memory broker registered as both `memory` and `mem`.
pub fn mem_registry(hub: &MemoryHub) -> BrokerRegistry {
    let mut registry = BrokerRegistry::with_defaults(hub.clone());
    let hub = hub.clone();
    registry.register(MEM_PLUGIN, move |options| {
        Arc::new(MemoryBroker::new(hub.clone(), options.hosts)) as Arc<dyn Broker>
    });
    registry
}

/// `orders` bridged from region `us` (host `a`) into region `eu` (host `b`).
pub fn orders_document() -> Value {
    orders_topology_with(json!({
        "orders": { "rate": 1.0, "publish": ["eu"], "subscribe": ["us"] }
    }))
}

/// Config document with the given `topics` over the `us`/`eu` fixture regions.
pub fn orders_topology_with(topics: Value) -> Value {
    json!({
        "federation": {
            "topics": topics,
            "brokers": {
                "us": { MEM_PLUGIN: { "hosts": ["a"] } },
                "eu": { MEM_PLUGIN: { "hosts": ["b"] } }
            }
        }
    })
}

/// Client broker attached to `host`, outside of any federator.
pub async fn connected_client(hub: &MemoryHub, host: &str) -> MemoryBroker {
    let broker = MemoryBroker::new(hub.clone(), vec![host.to_string()]);
    broker.init().await.expect("client init should succeed");
    broker
        .connect()
        .await
        .expect("client connect should succeed");
    broker
}
