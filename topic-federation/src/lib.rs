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

//! # topic-federation
//!
//! `topic-federation` bridges selected topics between regional message brokers.
//! Every message a subscriber region receives on a bridged topic is thinned by the
//! topic's rate and republished into each publisher region under the topic name
//! with a `.federated` suffix.
//!
//! The topology (topics, rates, regions and the brokers of each region) is read
//! from a [`ConfigSource`] and reloaded whenever the source reports a change.
//!
//! ## Quick start
//!
//! ```
//! use serde_json::json;
//! use std::sync::Arc;
//! use topic_federation::{BrokerRegistry, Federator, MemoryHub, MemorySource, Thinner};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let source = Arc::new(MemorySource::new(json!({
//!     "federation": {
//!         "topics": { "orders": { "rate": 1.0, "publish": ["eu"], "subscribe": ["us"] } },
//!         "brokers": {
//!             "us": { "memory": { "hosts": ["us-1"] } },
//!             "eu": { "memory": { "hosts": ["eu-1"] } }
//!         }
//!     }
//! })));
//!
//! let hub = MemoryHub::new();
//! let federator = Federator::new(
//!     "quick-start",
//!     BrokerRegistry::with_defaults(hub.clone()),
//!     source,
//!     Thinner::from_entropy(),
//! );
//!
//! federator.load().await.unwrap();
//! federator.start().await;
//! assert!(federator.is_running().await);
//! assert_eq!(hub.subscriber_count("us-1", "orders"), 1);
//!
//! federator.stop().await;
//! federator.drained().await;
//! assert_eq!(hub.subscriber_count("us-1", "orders"), 0);
//! # });
//! ```
//!
//! ## Internal architecture map
//!
//! - Registry: plugin name to broker constructor
//! - Topology: validated config model and the reserved suffix
//! - Pool: connected broker handles per region
//! - Bridge: subscriptions, rate thinning and republishing
//! - Federator: start/stop/update lifecycle under a single lock
//! - Watch: config change loop with a bounded retry budget
//!
//! ## Observability model
//!
//! Library code emits `tracing` events carrying `event` and `component` fields and
//! never installs a global subscriber. Binaries and tests initialize
//! `tracing_subscriber` once at process boundaries.

pub mod bridge;
pub mod broker;
pub mod brokers;
pub mod config;
pub mod error;
pub mod federator;
pub mod introspection;
#[doc(hidden)]
pub mod observability;
pub mod pool;
pub mod registry;
pub mod topology;
pub mod watch;

pub use bridge::thinning::Thinner;
pub use bridge::{BridgeEngine, BridgeReport, FEDERATION_QUEUE_GROUP};
pub use broker::{
    Broker, BrokerError, BrokerErrorKind, BrokerOptions, Message, MessageHandler,
    SubscribeOptions, Subscription,
};
pub use brokers::memory::{MemoryBroker, MemoryHub, MEMORY_PLUGIN};
pub use config::{ConfigSource, ConfigWatcher, FileSource, MemorySource};
pub use error::FederationError;
pub use federator::{Federator, FederatorState};
pub use pool::RegionBrokerPool;
pub use registry::{BrokerConstructor, BrokerRegistry};
pub use topology::{
    ConnectionParams, TopicSpec, Topology, FEDERATED_TOPIC_SUFFIX, FEDERATION_CONFIG_PATH,
};
pub use watch::WatchPolicy;
