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

use crate::config::{parse_document, ConfigSource, ConfigWatcher};
use crate::error::FederationError;
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_CONFIG_FILE: &str = "federation.json";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// JSON5 config file on local disk.
pub struct FileSource {
    path: PathBuf,
    poll_interval: Duration,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

async fn read_contents(path: &Path) -> std::io::Result<String> {
    tokio::fs::read_to_string(path).await
}

#[async_trait]
impl ConfigSource for FileSource {
    async fn read(&self) -> Result<Value, FederationError> {
        let contents = read_contents(&self.path).await.map_err(|e| {
            FederationError::ConfigSource(format!(
                "unable to read config file {}: {e}",
                self.path.display()
            ))
        })?;

        parse_document(&contents, &self.path.display().to_string())
    }

    async fn watch(&self) -> Result<Box<dyn ConfigWatcher>, FederationError> {
        let last_seen = read_contents(&self.path).await.ok();

        Ok(Box::new(FileWatcher {
            path: self.path.clone(),
            poll_interval: self.poll_interval,
            last_seen,
        }))
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

/// Polls a file and reports a change whenever its contents differ from the
/// last contents seen.
pub struct FileWatcher {
    path: PathBuf,
    poll_interval: Duration,
    last_seen: Option<String>,
}

#[async_trait]
impl ConfigWatcher for FileWatcher {
    async fn next(&mut self) -> Result<(), FederationError> {
        loop {
            tokio::time::sleep(self.poll_interval).await;

            let contents = read_contents(&self.path).await.map_err(|e| {
                FederationError::WatcherFailure(format!(
                    "unable to read {}: {e}",
                    self.path.display()
                ))
            })?;

            if self.last_seen.as_deref() != Some(contents.as_str()) {
                debug!(path = %self.path.display(), "config file changed");
                self.last_seen = Some(contents);
                return Ok(());
            }
        }
    }
}
