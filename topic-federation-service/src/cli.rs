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

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use topic_federation::config::{DEFAULT_CONFIG_FILE, DEFAULT_POLL_INTERVAL};
use topic_federation::watch::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_INTERVAL};
use topic_federation::{FileSource, WatchPolicy};

#[derive(Parser, Debug)]
#[command(name = "federation-srv", about = "Bridges topics between regional brokers")]
pub(crate) struct FederationArgs {
    /// Source to read the config from, e.g. `file` or `file:/etc/federation.json`
    #[arg(long, env = "CONFIG_SOURCE", default_value = "file")]
    pub(crate) config_source: String,

    /// How often the config file is polled for changes
    #[arg(long, value_name = "MILLIS", default_value_t = DEFAULT_POLL_INTERVAL.as_millis() as u64)]
    pub(crate) poll_interval_ms: u64,

    /// Consecutive watcher failures tolerated before exiting
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    pub(crate) watch_retries: usize,

    /// Delay before retrying a failed config watcher
    #[arg(long, value_name = "MILLIS", default_value_t = DEFAULT_RETRY_INTERVAL.as_millis() as u64)]
    pub(crate) watch_retry_interval_ms: u64,

    /// Validate the config, print the topology and exit
    #[arg(long)]
    pub(crate) check: bool,
}

/// Where the config document is read from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum SourceSpec {
    File(PathBuf),
}

impl SourceSpec {
    /// Parses `scheme[:location]`. Schemes other than `file` fall back to the
    /// file source with the given location.
    pub(crate) fn parse(spec: &str) -> Self {
        let mut parts = spec.splitn(2, ':');
        let _scheme = parts.next();
        let location = parts
            .next()
            .filter(|location| !location.is_empty())
            .unwrap_or(DEFAULT_CONFIG_FILE);

        SourceSpec::File(PathBuf::from(location))
    }

    pub(crate) fn scheme(spec: &str) -> &str {
        spec.split(':').next().unwrap_or_default()
    }
}

impl FederationArgs {
    pub(crate) fn source(&self) -> SourceSpec {
        SourceSpec::parse(&self.config_source)
    }

    pub(crate) fn file_source(&self) -> FileSource {
        let SourceSpec::File(path) = self.source();
        FileSource::new(path).with_poll_interval(Duration::from_millis(self.poll_interval_ms))
    }

    pub(crate) fn watch_policy(&self) -> WatchPolicy {
        WatchPolicy {
            max_retries: self.watch_retries,
            retry_interval: Duration::from_millis(self.watch_retry_interval_ms),
        }
    }
}
