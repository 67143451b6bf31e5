/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
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

//! Canonical structured field keys and value-format helpers.

use crate::broker::{Broker, Message};

pub const EVENT: &str = "event";
pub const COMPONENT: &str = "component";
pub const FEDERATOR: &str = "federator";

pub const REGION: &str = "region";
pub const PLUGIN: &str = "plugin";
pub const ADDR: &str = "addr";
pub const TOPIC: &str = "topic";
pub const FEDERATED_TOPIC: &str = "federated_topic";
pub const RATE: &str = "rate";
pub const GROUP: &str = "group";

pub const BODY_LEN: &str = "body_len";
pub const HEADER_KEYS: &str = "header_keys";

pub const RETRIES: &str = "retries";
pub const REASON: &str = "reason";
pub const ERR: &str = "err";

pub const NONE: &str = "none";
pub const REASON_RATE_NOT_POSITIVE: &str = "rate_not_positive";
pub const REASON_FEDERATED_SUFFIX: &str = "federated_suffix";
pub const REASON_REGION_NOT_CONFIGURED: &str = "region_not_configured";
pub const REASON_ABOVE_RATE: &str = "draw_above_rate";

/// Renders a host list the way broker addresses are shown in logs.
pub fn format_hosts(hosts: &[String]) -> String {
    if hosts.is_empty() {
        NONE.to_string()
    } else {
        hosts.join(",")
    }
}

/// `plugin@address` label for a broker handle.
pub fn format_broker(broker: &dyn Broker) -> String {
    format!("{}@{}", broker.identity(), broker.address())
}

/// Sorted, comma-joined header keys of a message.
pub fn format_header_keys(message: &Message) -> String {
    if message.header.is_empty() {
        return NONE.to_string();
    }

    let mut keys: Vec<&str> = message.header.keys().map(String::as_str).collect();
    keys.sort_unstable();
    keys.join(",")
}

#[cfg(test)]
mod tests {
    use super::{format_header_keys, format_hosts, NONE};
    use crate::broker::Message;

    #[test]
    fn format_hosts_joins_in_configured_order() {
        let hosts = vec!["b:4222".to_string(), "a:4222".to_string()];

        assert_eq!(format_hosts(&hosts), "b:4222,a:4222");
    }

    #[test]
    fn format_hosts_returns_none_when_empty() {
        assert_eq!(format_hosts(&[]), NONE);
    }

    #[test]
    fn format_header_keys_is_sorted_and_stable() {
        let message = Message::new(Vec::new())
            .with_header("x-trace", "1")
            .with_header("content-type", "raw");

        assert_eq!(format_header_keys(&message), "content-type,x-trace");
        assert_eq!(format_header_keys(&Message::default()), NONE);
    }
}
