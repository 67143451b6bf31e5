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

//! Bridge layer.
//!
//! Wires every bridged topic from its subscriber-region brokers to its
//! publisher-region brokers. Each created subscription gets a teardown waiter
//! that unsubscribes once the stop signal fires.

pub(crate) mod forwarder;
pub mod thinning;

use crate::bridge::forwarder::FederatedForwarder;
use crate::bridge::thinning::Thinner;
use crate::broker::{Broker, MessageHandler, SubscribeOptions, Subscription};
use crate::error::FederationError;
use crate::observability::{events, fields};
use crate::pool::RegionBrokerPool;
use crate::topology::{is_federated_topic, TopicSpec, Topology};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

/// Consumer group every bridge subscription joins.
pub const FEDERATION_QUEUE_GROUP: &str = "federation";

const COMPONENT: &str = "bridge";

/// Outcome of wiring one topology.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BridgeReport {
    /// Subscriptions created, one per `(topic, subscriber broker)` pair.
    pub subscriptions: usize,
    /// `(topic, subscriber broker)` pairs whose subscribe call failed.
    pub failed_subscriptions: usize,
    /// Topics refused because their name carries the federated suffix.
    pub misconfigured_topics: Vec<String>,
    /// Topics left out because their rate is not positive.
    pub idle_topics: Vec<String>,
}

/// Builds topic bridges on top of a connected [`RegionBrokerPool`].
#[derive(Clone)]
pub struct BridgeEngine {
    thinner: Thinner,
}

impl BridgeEngine {
    pub fn new(thinner: Thinner) -> Self {
        Self { thinner }
    }

    /// Subscribes every bridged topic and registers its teardown waiters on
    /// `waiters`. Failures are contained per topic or per subscriber.
    pub async fn wire(
        &self,
        topology: &Topology,
        pool: &RegionBrokerPool,
        exit: &CancellationToken,
        waiters: &TaskTracker,
    ) -> BridgeReport {
        let mut report = BridgeReport::default();

        for (topic, spec) in &topology.topics {
            if !spec.is_bridged() {
                info!(
                    event = events::TOPIC_RATE_TOO_LOW,
                    component = COMPONENT,
                    topic = topic.as_str(),
                    rate = spec.rate,
                    reason = fields::REASON_RATE_NOT_POSITIVE,
                    "rate too low to subscribe"
                );
                report.idle_topics.push(topic.clone());
                continue;
            }

            if is_federated_topic(topic) {
                let err = FederationError::TopicMisconfigured(topic.clone());
                error!(
                    event = events::TOPIC_MISCONFIGURED,
                    component = COMPONENT,
                    topic = topic.as_str(),
                    reason = fields::REASON_FEDERATED_SUFFIX,
                    err = %err,
                    "refusing to federate topic"
                );
                report.misconfigured_topics.push(topic.clone());
                continue;
            }

            info!(
                event = events::TOPIC_SUBSCRIBE_START,
                component = COMPONENT,
                topic = topic.as_str(),
                rate = spec.rate,
                "subscribing"
            );

            self.wire_topic(topic, spec, pool, exit, waiters, &mut report)
                .await;
        }

        report
    }

    async fn wire_topic(
        &self,
        topic: &str,
        spec: &TopicSpec,
        pool: &RegionBrokerPool,
        exit: &CancellationToken,
        waiters: &TaskTracker,
        report: &mut BridgeReport,
    ) {
        warn_unknown_regions(topic, &spec.subscribe, pool);
        warn_unknown_regions(topic, &spec.publish, pool);

        let subscribers = pool.collect(&spec.subscribe);
        let publishers: Arc<[Arc<dyn Broker>]> = pool.collect(&spec.publish).into();

        let handler: Arc<dyn MessageHandler> = Arc::new(FederatedForwarder::new(
            topic,
            spec.rate,
            publishers,
            self.thinner.clone(),
        ));

        for subscriber in subscribers {
            let broker = fields::format_broker(subscriber.as_ref());
            match subscriber
                .subscribe(
                    topic,
                    handler.clone(),
                    SubscribeOptions::group(FEDERATION_QUEUE_GROUP),
                )
                .await
            {
                Ok(subscription) => {
                    debug!(
                        event = events::SUBSCRIBE_OK,
                        component = COMPONENT,
                        topic,
                        broker = broker.as_str(),
                        group = FEDERATION_QUEUE_GROUP,
                        "subscribed"
                    );
                    spawn_unsubscribe_waiter(subscription, broker, exit.clone(), waiters);
                    report.subscriptions += 1;
                }
                Err(source) => {
                    let err = FederationError::SubscribeFailure {
                        topic: topic.to_string(),
                        broker,
                        source,
                    };
                    warn!(
                        event = events::SUBSCRIBE_FAILED,
                        component = COMPONENT,
                        topic,
                        err = %err,
                        "failed to subscribe"
                    );
                    report.failed_subscriptions += 1;
                }
            }
        }
    }
}

fn warn_unknown_regions(topic: &str, regions: &BTreeSet<String>, pool: &RegionBrokerPool) {
    for region in regions.iter().filter(|r| !pool.contains_region(r)) {
        warn!(
            event = events::TOPIC_REGION_UNKNOWN,
            component = COMPONENT,
            topic,
            region = region.as_str(),
            reason = fields::REASON_REGION_NOT_CONFIGURED,
            "region has no brokers configured"
        );
    }
}

/// Unsubscribes exactly once, after `exit` fires.
fn spawn_unsubscribe_waiter(
    subscription: Box<dyn Subscription>,
    broker: String,
    exit: CancellationToken,
    waiters: &TaskTracker,
) {
    waiters.spawn(async move {
        exit.cancelled().await;

        match subscription.unsubscribe().await {
            Ok(()) => debug!(
                event = events::UNSUBSCRIBE_OK,
                component = COMPONENT,
                topic = subscription.topic(),
                broker = broker.as_str(),
                "unsubscribed"
            ),
            Err(err) => warn!(
                event = events::UNSUBSCRIBE_FAILED,
                component = COMPONENT,
                topic = subscription.topic(),
                broker = broker.as_str(),
                err = %err,
                "failed to unsubscribe"
            ),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::{BridgeEngine, BridgeReport};
    use crate::bridge::thinning::Thinner;
    use crate::broker::{Broker, BrokerError, Message, MessageHandler, SubscribeOptions};
    use crate::brokers::memory::{MemoryBroker, MemoryHub};
    use crate::pool::RegionBrokerPool;
    use crate::registry::BrokerRegistry;
    use crate::topology::Topology;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;
    use tokio_util::task::TaskTracker;

    #[derive(Default)]
    struct Counter {
        hits: AtomicUsize,
    }

    #[async_trait]
    impl MessageHandler for Counter {
        async fn on_message(&self, _topic: &str, _message: Message) -> Result<(), BrokerError> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Wired {
        hub: MemoryHub,
        pool: RegionBrokerPool,
        exit: CancellationToken,
        waiters: TaskTracker,
        report: BridgeReport,
    }

    async fn wire(topics: serde_json::Value) -> Wired {
        let hub = MemoryHub::new();
        let registry = BrokerRegistry::with_defaults(hub.clone());
        let topology = Topology::extract(&json!({
            "topics": topics,
            "brokers": {
                "us": { "memory": { "hosts": ["a"] } },
                "eu": { "memory": { "hosts": ["b"] } }
            }
        }))
        .expect("valid topology");

        let pool = RegionBrokerPool::connect(&topology, &registry).await;
        let exit = CancellationToken::new();
        let waiters = TaskTracker::new();
        let report = BridgeEngine::new(Thinner::seeded(3))
            .wire(&topology, &pool, &exit, &waiters)
            .await;

        Wired {
            hub,
            pool,
            exit,
            waiters,
            report,
        }
    }

    async fn client(hub: &MemoryHub, host: &str) -> MemoryBroker {
        let broker = MemoryBroker::new(hub.clone(), vec![host.to_string()]);
        broker.init().await.expect("init");
        broker.connect().await.expect("connect");
        broker
    }

    #[tokio::test]
    async fn bridged_topic_subscribes_with_queue_group() {
        let wired = wire(json!({
            "orders": { "rate": 1.0, "publish": ["eu"], "subscribe": ["us"] }
        }))
        .await;

        assert_eq!(wired.report.subscriptions, 1);
        assert_eq!(wired.hub.subscriber_count("a", "orders"), 1);
        assert_eq!(wired.hub.subscriber_count("b", "orders"), 0);
    }

    #[tokio::test]
    async fn zero_rate_creates_no_subscription() {
        let wired = wire(json!({
            "orders": { "rate": 0.0, "publish": ["eu"], "subscribe": ["us"] }
        }))
        .await;

        assert_eq!(wired.report.subscriptions, 0);
        assert_eq!(wired.report.idle_topics, vec!["orders".to_string()]);
        assert_eq!(wired.hub.subscriber_count("a", "orders"), 0);
    }

    #[tokio::test]
    async fn federated_suffix_topic_is_refused() {
        let wired = wire(json!({
            "orders.federated": { "rate": 1.0, "publish": ["eu"], "subscribe": ["us"] },
            "payments": { "rate": 1.0, "publish": ["eu"], "subscribe": ["us"] }
        }))
        .await;

        assert_eq!(
            wired.report.misconfigured_topics,
            vec!["orders.federated".to_string()]
        );
        assert_eq!(wired.report.subscriptions, 1);
        assert_eq!(wired.hub.subscriber_count("a", "orders.federated"), 0);
        assert_eq!(wired.hub.subscriber_count("a", "payments"), 1);
    }

    #[tokio::test]
    async fn unknown_region_contributes_nothing() {
        let wired = wire(json!({
            "orders": { "rate": 1.0, "publish": ["eu", "apac"], "subscribe": ["us", "mars"] }
        }))
        .await;

        assert_eq!(wired.report.subscriptions, 1);
        assert_eq!(wired.report.failed_subscriptions, 0);
    }

    #[tokio::test]
    async fn messages_flow_to_federated_topic_and_stop_after_exit() {
        let wired = wire(json!({
            "orders": { "rate": 1.0, "publish": ["eu"], "subscribe": ["us"] }
        }))
        .await;

        let source = client(&wired.hub, "a").await;
        let sink = client(&wired.hub, "b").await;
        let received = Arc::new(Counter::default());
        sink.subscribe("orders.federated", received.clone(), SubscribeOptions::default())
            .await
            .expect("sink subscribe");

        source
            .publish("orders", Message::new(b"m".to_vec()))
            .await
            .expect("publish");
        assert_eq!(received.hits.load(Ordering::SeqCst), 1);

        wired.exit.cancel();
        wired.waiters.close();
        wired.waiters.wait().await;
        assert_eq!(wired.hub.subscriber_count("a", "orders"), 0);

        source
            .publish("orders", Message::new(b"m".to_vec()))
            .await
            .expect("publish");
        assert_eq!(received.hits.load(Ordering::SeqCst), 1);

        wired.pool.disconnect_all().await;
    }
}
