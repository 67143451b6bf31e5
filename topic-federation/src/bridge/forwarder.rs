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

//! Subscription handler that thins and republishes one topic.

use crate::bridge::thinning::Thinner;
use crate::broker::{Broker, BrokerError, Message, MessageHandler};
use crate::error::FederationError;
use crate::observability::{events, fields};
use crate::topology::federated_topic_name;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn, Level};

const COMPONENT: &str = "forwarder";

/// Republishes a sampled share of one topic's traffic to every publisher
/// broker under the federated topic name.
pub(crate) struct FederatedForwarder {
    topic: String,
    federated_topic: String,
    rate: f64,
    publishers: Arc<[Arc<dyn Broker>]>,
    thinner: Thinner,
}

impl FederatedForwarder {
    pub(crate) fn new(
        topic: &str,
        rate: f64,
        publishers: Arc<[Arc<dyn Broker>]>,
        thinner: Thinner,
    ) -> Self {
        Self {
            topic: topic.to_string(),
            federated_topic: federated_topic_name(topic),
            rate,
            publishers,
            thinner,
        }
    }
}

#[async_trait]
impl MessageHandler for FederatedForwarder {
    async fn on_message(&self, _topic: &str, message: Message) -> Result<(), BrokerError> {
        let topic = self.topic.as_str();

        if tracing::enabled!(Level::DEBUG) {
            debug!(
                event = events::FORWARD_RECEIVE,
                component = COMPONENT,
                topic,
                body_len = message.body.len(),
                header_keys = %fields::format_header_keys(&message),
                "received message"
            );
        }

        if !self.thinner.admits(self.rate) {
            debug!(
                event = events::FORWARD_THINNED,
                component = COMPONENT,
                topic,
                rate = self.rate,
                reason = fields::REASON_ABOVE_RATE,
                "dropping message"
            );
            return Ok(());
        }

        // Publishers are independent: a failure is logged and never retried.
        for publisher in self.publishers.iter() {
            match publisher
                .publish(&self.federated_topic, message.clone())
                .await
            {
                Ok(()) => {
                    debug!(
                        event = events::FORWARD_PUBLISH_OK,
                        component = COMPONENT,
                        topic,
                        federated_topic = self.federated_topic.as_str(),
                        broker = %fields::format_broker(publisher.as_ref()),
                        "republished message"
                    );
                }
                Err(source) => {
                    let err = FederationError::PublishFailure {
                        topic: self.topic.clone(),
                        broker: fields::format_broker(publisher.as_ref()),
                        source,
                    };
                    warn!(
                        event = events::FORWARD_PUBLISH_FAILED,
                        component = COMPONENT,
                        topic,
                        federated_topic = self.federated_topic.as_str(),
                        err = %err,
                        "error publishing"
                    );
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::FederatedForwarder;
    use crate::bridge::thinning::Thinner;
    use crate::broker::{
        Broker, BrokerError, BrokerErrorKind, Message, MessageHandler, SubscribeOptions,
        Subscription,
    };
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct CapturingBroker {
        fail: bool,
        published: Mutex<Vec<(String, Message)>>,
    }

    impl CapturingBroker {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                fail,
                published: Mutex::new(Vec::new()),
            })
        }

        fn published(&self) -> Vec<(String, Message)> {
            self.published.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Broker for CapturingBroker {
        async fn init(&self) -> Result<(), BrokerError> {
            Ok(())
        }

        async fn connect(&self) -> Result<(), BrokerError> {
            Ok(())
        }

        async fn disconnect(&self) -> Result<(), BrokerError> {
            Ok(())
        }

        async fn publish(&self, topic: &str, message: Message) -> Result<(), BrokerError> {
            self.published
                .lock()
                .unwrap()
                .push((topic.to_string(), message));
            if self.fail {
                Err(BrokerError::new(BrokerErrorKind::Unavailable, "publish refused"))
            } else {
                Ok(())
            }
        }

        async fn subscribe(
            &self,
            _topic: &str,
            _handler: Arc<dyn MessageHandler>,
            _options: SubscribeOptions,
        ) -> Result<Box<dyn Subscription>, BrokerError> {
            Err(BrokerError::new(
                BrokerErrorKind::Internal,
                "not used in forwarder tests",
            ))
        }

        fn address(&self) -> String {
            "capture".to_string()
        }

        fn identity(&self) -> &str {
            "capture"
        }
    }

    fn forwarder(rate: f64, publishers: &[Arc<CapturingBroker>]) -> FederatedForwarder {
        let publishers: Vec<Arc<dyn Broker>> = publishers
            .iter()
            .map(|p| p.clone() as Arc<dyn Broker>)
            .collect();
        FederatedForwarder::new("orders", rate, publishers.into(), Thinner::seeded(5))
    }

    #[tokio::test]
    async fn full_rate_forwards_every_message_unchanged() {
        let first = CapturingBroker::new(false);
        let second = CapturingBroker::new(false);
        let forwarder = forwarder(1.0, &[first.clone(), second.clone()]);

        let message = Message::new(b"payload".to_vec()).with_header("id", "1");
        for _ in 0..100 {
            forwarder
                .on_message("orders", message.clone())
                .await
                .expect("handler never fails");
        }

        for publisher in [first, second] {
            let published = publisher.published();
            assert_eq!(published.len(), 100);
            assert!(published
                .iter()
                .all(|(topic, m)| topic == "orders.federated" && *m == message));
        }
    }

    #[tokio::test]
    async fn publish_failure_does_not_block_other_publishers() {
        let failing = CapturingBroker::new(true);
        let healthy = CapturingBroker::new(false);
        let forwarder = forwarder(1.0, &[failing.clone(), healthy.clone()]);

        forwarder
            .on_message("orders", Message::new(b"m".to_vec()))
            .await
            .expect("failures are contained");

        assert_eq!(failing.published().len(), 1);
        assert_eq!(healthy.published().len(), 1);
    }

    #[tokio::test]
    async fn partial_rate_thins_traffic() {
        let publisher = CapturingBroker::new(false);
        let forwarder = forwarder(0.25, &[publisher.clone()]);

        for _ in 0..2_000 {
            forwarder
                .on_message("orders", Message::new(b"m".to_vec()))
                .await
                .expect("handler never fails");
        }

        let forwarded = publisher.published().len();
        assert!((350..=650).contains(&forwarded), "forwarded {forwarded}");
    }
}
