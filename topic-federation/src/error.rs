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

use crate::broker::BrokerError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Phase of the two-phase broker connect.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConnectPhase {
    Init,
    Connect,
}

impl Display for ConnectPhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectPhase::Init => write!(f, "initialising"),
            ConnectPhase::Connect => write!(f, "connecting to"),
        }
    }
}

/// Failures raised by the federation engine.
///
/// Config and watcher failures are returned to the caller. Broker, topic and
/// subscription failures are logged where they happen and contained there.
#[derive(Debug)]
pub enum FederationError {
    ConfigInvalid(String),
    ConfigSource(String),
    UnknownBrokerPlugin(String),
    BrokerConnectFailure {
        plugin: String,
        address: String,
        phase: ConnectPhase,
        source: BrokerError,
    },
    TopicMisconfigured(String),
    SubscribeFailure {
        topic: String,
        broker: String,
        source: BrokerError,
    },
    PublishFailure {
        topic: String,
        broker: String,
        source: BrokerError,
    },
    WatcherFailure(String),
    WatcherExhausted {
        attempts: usize,
    },
}

impl Display for FederationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FederationError::ConfigInvalid(reason) => write!(f, "invalid config: {reason}"),
            FederationError::ConfigSource(reason) => {
                write!(f, "error reading config: {reason}")
            }
            FederationError::UnknownBrokerPlugin(plugin) => write!(f, "unknown plugin {plugin}"),
            FederationError::BrokerConnectFailure {
                plugin,
                address,
                phase,
                source,
            } => write!(f, "error {phase} {plugin} [{address}]: {source}"),
            FederationError::TopicMisconfigured(topic) => {
                write!(f, "cannot federate {topic}: it has the federated extension")
            }
            FederationError::SubscribeFailure {
                topic,
                broker,
                source,
            } => write!(f, "failed to subscribe to {topic} on {broker}: {source}"),
            FederationError::PublishFailure {
                topic,
                broker,
                source,
            } => write!(f, "error publishing to {broker} for topic {topic}: {source}"),
            FederationError::WatcherFailure(reason) => write!(f, "config watcher failed: {reason}"),
            FederationError::WatcherExhausted { attempts } => {
                write!(f, "config watcher is dead after {attempts} attempts")
            }
        }
    }
}

impl Error for FederationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FederationError::BrokerConnectFailure { source, .. }
            | FederationError::SubscribeFailure { source, .. }
            | FederationError::PublishFailure { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConnectPhase, FederationError};
    use crate::broker::{BrokerError, BrokerErrorKind};
    use std::error::Error;

    #[test]
    fn connect_failure_exposes_phase_and_source() {
        let error = FederationError::BrokerConnectFailure {
            plugin: "memory".to_string(),
            address: "a".to_string(),
            phase: ConnectPhase::Init,
            source: BrokerError::new(BrokerErrorKind::InvalidArgument, "no hosts"),
        };

        assert_eq!(
            error.to_string(),
            "error initialising memory [a]: InvalidArgument: no hosts"
        );
        assert!(error.source().is_some());
    }

    #[test]
    fn topic_misconfigured_has_no_source() {
        let error = FederationError::TopicMisconfigured("orders.federated".to_string());

        assert!(error.to_string().contains("orders.federated"));
        assert!(error.source().is_none());
    }
}
