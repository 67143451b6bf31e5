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

//! Capability contract shared by every broker backend.
//!
//! The federation engine only ever talks to brokers through [`Broker`], so a
//! backend is free to speak any wire protocol as long as it can connect,
//! publish raw payloads and hand received payloads to a [`MessageHandler`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Coarse classification of a broker call failure.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum BrokerErrorKind {
    InvalidArgument,
    NotConnected,
    Unavailable,
    NotFound,
    Internal,
}

/// Status returned by every broker capability call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BrokerError {
    kind: BrokerErrorKind,
    message: String,
}

impl BrokerError {
    pub fn new(kind: BrokerErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> BrokerErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for BrokerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for BrokerError {}

/// Opaque message carried across regions. The body is never inspected.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Message {
    pub header: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Message {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            header: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.header.insert(key.into(), value.into());
        self
    }
}

/// Construction parameters handed to a plugin constructor.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BrokerOptions {
    pub hosts: Vec<String>,
}

impl BrokerOptions {
    pub fn with_hosts(hosts: &[String]) -> Self {
        Self {
            hosts: hosts.to_vec(),
        }
    }
}

/// Per-subscription options.
///
/// A `group` asks backends that support consumer groups to deliver each message
/// to a single member of the group.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SubscribeOptions {
    pub group: Option<String>,
}

impl SubscribeOptions {
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            group: Some(name.into()),
        }
    }
}

/// Callback invoked by a broker for every message received on a subscription.
///
/// Brokers may invoke handlers concurrently; implementations must not assume
/// any ordering across topics or brokers.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn on_message(&self, topic: &str, message: Message) -> Result<(), BrokerError>;
}

/// Handle to a live subscription.
#[async_trait]
pub trait Subscription: Send + Sync {
    fn topic(&self) -> &str;

    async fn unsubscribe(&self) -> Result<(), BrokerError>;
}

/// Capability contract for a regional broker backend.
///
/// Connecting is two-phase: [`Broker::init`] performs local initialisation and
/// [`Broker::connect`] reaches out to the network. None of the calls carry a
/// timeout; a stalled backend stalls the calling task.
#[async_trait]
pub trait Broker: Send + Sync {
    async fn init(&self) -> Result<(), BrokerError>;

    async fn connect(&self) -> Result<(), BrokerError>;

    async fn disconnect(&self) -> Result<(), BrokerError>;

    async fn publish(&self, topic: &str, message: Message) -> Result<(), BrokerError>;

    async fn subscribe(
        &self,
        topic: &str,
        handler: Arc<dyn MessageHandler>,
        options: SubscribeOptions,
    ) -> Result<Box<dyn Subscription>, BrokerError>;

    /// Address of the broker, for logs.
    fn address(&self) -> String;

    /// Plugin name the broker was built from.
    fn identity(&self) -> &str;
}
