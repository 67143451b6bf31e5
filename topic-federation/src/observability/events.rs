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

//! Canonical structured event names used across `topic-federation`.

// Region broker pool events.
pub const REGION_SETUP_START: &str = "region_setup_start";
pub const REGION_BROKER_ADDED: &str = "region_broker_added";
pub const REGION_BROKER_SKIPPED: &str = "region_broker_skipped";
pub const REGION_TEARDOWN: &str = "region_teardown";
pub const REGION_DISCONNECT_FAILED: &str = "region_disconnect_failed";

// Bridge wiring events.
pub const TOPIC_RATE_TOO_LOW: &str = "topic_rate_too_low";
pub const TOPIC_SUBSCRIBE_START: &str = "topic_subscribe_start";
pub const TOPIC_MISCONFIGURED: &str = "topic_misconfigured";
pub const TOPIC_REGION_UNKNOWN: &str = "topic_region_unknown";
pub const SUBSCRIBE_OK: &str = "subscribe_ok";
pub const SUBSCRIBE_FAILED: &str = "subscribe_failed";
pub const UNSUBSCRIBE_OK: &str = "unsubscribe_ok";
pub const UNSUBSCRIBE_FAILED: &str = "unsubscribe_failed";

// Forwarding events.
pub const FORWARD_RECEIVE: &str = "forward_receive";
pub const FORWARD_THINNED: &str = "forward_thinned";
pub const FORWARD_PUBLISH_OK: &str = "forward_publish_ok";
pub const FORWARD_PUBLISH_FAILED: &str = "forward_publish_failed";

// Lifecycle events.
pub const FEDERATOR_START: &str = "federator_start";
pub const FEDERATOR_STARTED: &str = "federator_started";
pub const FEDERATOR_ALREADY_RUNNING: &str = "federator_already_running";
pub const FEDERATOR_NO_TOPOLOGY: &str = "federator_no_topology";
pub const FEDERATOR_ABANDONED_START: &str = "federator_abandoned_start";
pub const FEDERATOR_STOP: &str = "federator_stop";
pub const FEDERATOR_NOT_RUNNING: &str = "federator_not_running";
pub const FEDERATOR_UPDATE_START: &str = "federator_update_start";
pub const FEDERATOR_UPDATE_REJECTED: &str = "federator_update_rejected";
pub const FEDERATOR_UPDATE_OK: &str = "federator_update_ok";

// Config watch events.
pub const WATCH_OPEN: &str = "watch_open";
pub const WATCH_WAITING: &str = "watch_waiting";
pub const WATCH_CHANGE: &str = "watch_change";
pub const WATCH_FAILED: &str = "watch_failed";
pub const WATCH_EXHAUSTED: &str = "watch_exhausted";
