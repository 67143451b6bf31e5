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

mod failing_broker;
pub use failing_broker::{FailingBroker, FailurePoint};
mod recording_handler;
pub use recording_handler::{RecordedMessage, RecordingHandler};
mod scripted_config;
pub use scripted_config::{ScriptedConfigSource, WatchStep};
mod topology_fixtures;
pub use topology_fixtures::{
    connected_client, mem_registry, orders_document, orders_topology_with, MEM_PLUGIN,
};

use std::sync::Once;

static INIT_LOGGING: Once = Once::new();

/// Installs a test subscriber once per process; honours `RUST_LOG`.
pub fn init_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
