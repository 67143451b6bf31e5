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

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use topic_federation::{
    Broker, BrokerError, BrokerErrorKind, Message, MessageHandler, SubscribeOptions, Subscription,
};
use tracing::debug;

/// Broker capability calls a [`FailingBroker`] can be told to refuse or to
/// hang on.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FailurePoint {
    Init,
    Connect,
    Subscribe,
    Publish,
    Disconnect,
    Unsubscribe,
}

/// Broker double that fails the configured calls and counts every call.
pub struct FailingBroker {
    name: String,
    failures: HashSet<FailurePoint>,
    stalls: HashSet<FailurePoint>,
    publishes: Arc<AtomicUsize>,
    disconnects: Arc<AtomicUsize>,
    unsubscribes: Arc<AtomicUsize>,
}

impl FailingBroker {
    pub fn new(name: &str, failures: &[FailurePoint]) -> Self {
        Self {
            name: name.to_string(),
            failures: failures.iter().copied().collect(),
            stalls: HashSet::new(),
            publishes: Arc::new(AtomicUsize::new(0)),
            disconnects: Arc::new(AtomicUsize::new(0)),
            unsubscribes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Makes `point` never return.
    pub fn stalling(mut self, point: FailurePoint) -> Self {
        self.stalls.insert(point);
        self
    }

    /// Publish calls attempted, failed ones included.
    pub fn publishes(&self) -> usize {
        self.publishes.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    /// Unsubscribe calls across every subscription this broker handed out.
    pub fn unsubscribes(&self) -> usize {
        self.unsubscribes.load(Ordering::SeqCst)
    }

    async fn check(&self, point: FailurePoint) -> Result<(), BrokerError> {
        if self.stalls.contains(&point) {
            debug!("{}: stalling {point:?}", self.name);
            std::future::pending::<()>().await;
        }
        if self.failures.contains(&point) {
            debug!("{}: failing {point:?}", self.name);
            return Err(BrokerError::new(
                BrokerErrorKind::Unavailable,
                format!("{} refuses {point:?}", self.name),
            ));
        }
        Ok(())
    }
}

struct FailingSubscription {
    topic: String,
    fail: bool,
    unsubscribes: Arc<AtomicUsize>,
}

#[async_trait]
impl Subscription for FailingSubscription {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn unsubscribe(&self) -> Result<(), BrokerError> {
        self.unsubscribes.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(BrokerError::new(
                BrokerErrorKind::Internal,
                "failing to unsubscribe",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Broker for FailingBroker {
    async fn init(&self) -> Result<(), BrokerError> {
        self.check(FailurePoint::Init).await
    }

    async fn connect(&self) -> Result<(), BrokerError> {
        self.check(FailurePoint::Connect).await
    }

    async fn disconnect(&self) -> Result<(), BrokerError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.check(FailurePoint::Disconnect).await
    }

    async fn publish(&self, _topic: &str, _message: Message) -> Result<(), BrokerError> {
        self.publishes.fetch_add(1, Ordering::SeqCst);
        self.check(FailurePoint::Publish).await
    }

    async fn subscribe(
        &self,
        topic: &str,
        _handler: Arc<dyn MessageHandler>,
        _options: SubscribeOptions,
    ) -> Result<Box<dyn Subscription>, BrokerError> {
        self.check(FailurePoint::Subscribe).await?;
        Ok(Box::new(FailingSubscription {
            topic: topic.to_string(),
            fail: self.failures.contains(&FailurePoint::Unsubscribe),
            unsubscribes: self.unsubscribes.clone(),
        }))
    }

    fn address(&self) -> String {
        self.name.clone()
    }

    fn identity(&self) -> &str {
        "failing"
    }
}
