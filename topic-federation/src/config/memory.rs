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

use crate::config::{ConfigSource, ConfigWatcher};
use crate::error::FederationError;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;

/// In-process config document; [`MemorySource::set`] wakes every watcher.
pub struct MemorySource {
    document: watch::Sender<Value>,
}

impl MemorySource {
    pub fn new(document: Value) -> Self {
        let (document, _) = watch::channel(document);
        Self { document }
    }

    /// Replaces the document and notifies watchers.
    pub fn set(&self, document: Value) {
        self.document.send_replace(document);
    }
}

#[async_trait]
impl ConfigSource for MemorySource {
    async fn read(&self) -> Result<Value, FederationError> {
        Ok(self.document.borrow().clone())
    }

    async fn watch(&self) -> Result<Box<dyn ConfigWatcher>, FederationError> {
        Ok(Box::new(MemoryWatcher {
            changes: self.document.subscribe(),
        }))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

pub struct MemoryWatcher {
    changes: watch::Receiver<Value>,
}

#[async_trait]
impl ConfigWatcher for MemoryWatcher {
    async fn next(&mut self) -> Result<(), FederationError> {
        self.changes
            .changed()
            .await
            .map_err(|_| FederationError::WatcherFailure("config source dropped".to_string()))
    }
}
