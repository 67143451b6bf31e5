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

#![allow(dead_code)]

use integration_test_utils::{connected_client, mem_registry, RecordingHandler};
use serde_json::Value;
use std::sync::Arc;
use topic_federation::{
    Broker, BrokerRegistry, ConfigSource, Federator, MemoryBroker, MemoryHub, MemorySource,
    Message, SubscribeOptions, Thinner,
};

pub(crate) const THINNER_SEED: u64 = 42;

pub(crate) fn make_federator(
    name: &str,
    registry: BrokerRegistry,
    source: Arc<dyn ConfigSource>,
) -> Arc<Federator> {
    Arc::new(Federator::new(
        name,
        registry,
        source,
        Thinner::seeded(THINNER_SEED),
    ))
}

/// Federator over `document`, loaded and started on the fixture `mem` registry.
pub(crate) async fn start_federator(
    name: &str,
    hub: &MemoryHub,
    document: Value,
) -> (Arc<Federator>, Arc<MemorySource>) {
    let source = Arc::new(MemorySource::new(document));
    let federator = make_federator(name, mem_registry(hub), source.clone());

    federator
        .load()
        .await
        .expect("fixture topology should be valid");
    federator.start().await;
    assert!(federator.is_running().await);

    (federator, source)
}

/// Client on `host` recording everything published to `topic`.
pub(crate) async fn record(
    hub: &MemoryHub,
    host: &str,
    topic: &str,
) -> (MemoryBroker, RecordingHandler) {
    let client = connected_client(hub, host).await;
    let recorder = RecordingHandler::new();
    client
        .subscribe(topic, Arc::new(recorder.clone()), SubscribeOptions::default())
        .await
        .expect("recorder subscribe should succeed");
    (client, recorder)
}

pub(crate) async fn publish(client: &MemoryBroker, topic: &str, body: &[u8]) {
    client
        .publish(topic, Message::new(body.to_vec()))
        .await
        .expect("client publish should succeed");
}
