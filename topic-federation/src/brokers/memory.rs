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

//! In-process broker backend.
//!
//! Every [`MemoryBroker`] attaches to one host of a shared [`MemoryHub`];
//! brokers attached to the same host see each other's topics. Handlers run on
//! the publishing task once the hub lock has been released, so a publish
//! returns only after every handler it reached has returned.

use crate::broker::{
    Broker, BrokerError, BrokerErrorKind, Message, MessageHandler, SubscribeOptions, Subscription,
};
use crate::observability::fields;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};
use uuid::Uuid;

pub const MEMORY_PLUGIN: &str = "memory";

const COMPONENT: &str = "memory_broker";

struct MemorySubscriber {
    id: Uuid,
    owner: Uuid,
    group: Option<String>,
    handler: Arc<dyn MessageHandler>,
}

#[derive(Default)]
struct HostState {
    connections: usize,
    topics: HashMap<String, Vec<MemorySubscriber>>,
    // (topic, group) -> next member to deliver to
    group_cursors: HashMap<(String, String), usize>,
}

#[derive(Default)]
struct HubState {
    hosts: HashMap<String, HostState>,
    unreachable: HashSet<String>,
}

/// Shared in-process message fabric keyed by host name.
#[derive(Clone, Default)]
pub struct MemoryHub {
    inner: Arc<Mutex<HubState>>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks a host as refusing (or accepting again) new connections.
    pub fn set_unreachable(&self, host: &str, unreachable: bool) {
        let mut state = self.lock();
        if unreachable {
            state.unreachable.insert(host.to_string());
        } else {
            state.unreachable.remove(host);
        }
    }

    /// Number of brokers currently connected to `host`.
    pub fn connections(&self, host: &str) -> usize {
        self.lock()
            .hosts
            .get(host)
            .map(|h| h.connections)
            .unwrap_or(0)
    }

    /// Number of live subscriptions for `topic` on `host`.
    pub fn subscriber_count(&self, host: &str, topic: &str) -> usize {
        self.lock()
            .hosts
            .get(host)
            .and_then(|h| h.topics.get(topic))
            .map(Vec::len)
            .unwrap_or(0)
    }

    fn attach(&self, hosts: &[String]) -> Result<String, BrokerError> {
        let mut state = self.lock();
        let host = hosts
            .iter()
            .find(|host| !state.unreachable.contains(host.as_str()))
            .cloned()
            .ok_or_else(|| {
                BrokerError::new(
                    BrokerErrorKind::Unavailable,
                    format!("no reachable host in [{}]", fields::format_hosts(hosts)),
                )
            })?;

        state.hosts.entry(host.clone()).or_default().connections += 1;
        Ok(host)
    }

    fn detach(&self, host: &str, owner: Uuid) {
        let mut state = self.lock();
        if let Some(host_state) = state.hosts.get_mut(host) {
            host_state.connections = host_state.connections.saturating_sub(1);
            for subscribers in host_state.topics.values_mut() {
                subscribers.retain(|s| s.owner != owner);
            }
            host_state.topics.retain(|_, subscribers| !subscribers.is_empty());
        }
    }

    fn add_subscriber(&self, host: &str, topic: &str, subscriber: MemorySubscriber) {
        self.lock()
            .hosts
            .entry(host.to_string())
            .or_default()
            .topics
            .entry(topic.to_string())
            .or_default()
            .push(subscriber);
    }

    fn remove_subscriber(&self, host: &str, topic: &str, id: Uuid) -> bool {
        let mut state = self.lock();
        let Some(host_state) = state.hosts.get_mut(host) else {
            return false;
        };
        let Some(subscribers) = host_state.topics.get_mut(topic) else {
            return false;
        };

        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        let removed = subscribers.len() != before;
        if subscribers.is_empty() {
            host_state.topics.remove(topic);
        }
        removed
    }

    /// Handlers a publish on `topic` reaches: every plain subscriber plus one
    /// member per consumer group, rotating through the group.
    fn targets(&self, host: &str, topic: &str) -> Vec<Arc<dyn MessageHandler>> {
        let mut state = self.lock();
        let Some(host_state) = state.hosts.get_mut(host) else {
            return Vec::new();
        };
        let Some(subscribers) = host_state.topics.get(topic) else {
            return Vec::new();
        };

        let mut targets = Vec::new();
        let mut groups: Vec<(&str, Vec<&MemorySubscriber>)> = Vec::new();
        for subscriber in subscribers {
            match subscriber.group.as_deref() {
                None => targets.push(subscriber.handler.clone()),
                Some(group) => match groups.iter_mut().find(|(name, _)| *name == group) {
                    Some((_, members)) => members.push(subscriber),
                    None => groups.push((group, vec![subscriber])),
                },
            }
        }

        let mut picks = Vec::with_capacity(groups.len());
        for (group, members) in groups {
            let cursor = host_state
                .group_cursors
                .get(&(topic.to_string(), group.to_string()))
                .copied()
                .unwrap_or(0);
            picks.push((group.to_string(), cursor));
            targets.push(members[cursor % members.len()].handler.clone());
        }
        for (group, cursor) in picks {
            host_state
                .group_cursors
                .insert((topic.to_string(), group), cursor.wrapping_add(1));
        }

        targets
    }
}

#[derive(Default)]
struct MemoryBrokerState {
    initialised: bool,
    host: Option<String>,
}

/// Broker handle attached to a [`MemoryHub`].
pub struct MemoryBroker {
    id: Uuid,
    hub: MemoryHub,
    hosts: Vec<String>,
    state: Mutex<MemoryBrokerState>,
}

impl MemoryBroker {
    pub fn new(hub: MemoryHub, hosts: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            hub,
            hosts,
            state: Mutex::new(MemoryBrokerState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryBrokerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Host the broker is attached to, once connected.
    pub fn connected_host(&self) -> Option<String> {
        self.lock().host.clone()
    }

    fn require_host(&self) -> Result<String, BrokerError> {
        self.connected_host().ok_or_else(|| {
            BrokerError::new(
                BrokerErrorKind::NotConnected,
                format!("{MEMORY_PLUGIN} broker [{}] is not connected", self.address()),
            )
        })
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn init(&self) -> Result<(), BrokerError> {
        if self.hosts.is_empty() {
            return Err(BrokerError::new(
                BrokerErrorKind::InvalidArgument,
                "no hosts configured",
            ));
        }

        self.lock().initialised = true;
        Ok(())
    }

    async fn connect(&self) -> Result<(), BrokerError> {
        let mut state = self.lock();
        if !state.initialised {
            return Err(BrokerError::new(
                BrokerErrorKind::InvalidArgument,
                "broker has not been initialised",
            ));
        }
        if state.host.is_some() {
            return Ok(());
        }

        let host = self.hub.attach(&self.hosts)?;
        debug!(
            component = COMPONENT,
            addr = host.as_str(),
            "memory broker connected"
        );
        state.host = Some(host);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BrokerError> {
        let host = self.lock().host.take();
        if let Some(host) = host {
            self.hub.detach(&host, self.id);
            debug!(
                component = COMPONENT,
                addr = host.as_str(),
                "memory broker disconnected"
            );
        }
        Ok(())
    }

    async fn publish(&self, topic: &str, message: Message) -> Result<(), BrokerError> {
        let host = self.require_host()?;

        for handler in self.hub.targets(&host, topic) {
            if let Err(err) = handler.on_message(topic, message.clone()).await {
                trace!(
                    component = COMPONENT,
                    addr = host.as_str(),
                    topic,
                    err = %err,
                    "subscriber handler returned an error"
                );
            }
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        topic: &str,
        handler: Arc<dyn MessageHandler>,
        options: SubscribeOptions,
    ) -> Result<Box<dyn Subscription>, BrokerError> {
        let host = self.require_host()?;
        let id = Uuid::new_v4();

        self.hub.add_subscriber(
            &host,
            topic,
            MemorySubscriber {
                id,
                owner: self.id,
                group: options.group,
                handler,
            },
        );

        Ok(Box::new(MemorySubscription {
            hub: self.hub.clone(),
            host,
            topic: topic.to_string(),
            id,
        }))
    }

    fn address(&self) -> String {
        fields::format_hosts(&self.hosts)
    }

    fn identity(&self) -> &str {
        MEMORY_PLUGIN
    }
}

struct MemorySubscription {
    hub: MemoryHub,
    host: String,
    topic: String,
    id: Uuid,
}

#[async_trait]
impl Subscription for MemorySubscription {
    fn topic(&self) -> &str {
        &self.topic
    }

    // Unsubscribing twice, or after the broker disconnected, is a no-op.
    async fn unsubscribe(&self) -> Result<(), BrokerError> {
        self.hub.remove_subscriber(&self.host, &self.topic, self.id);
        Ok(())
    }
}
