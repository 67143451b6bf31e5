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

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use topic_federation::{ConfigSource, ConfigWatcher, FederationError};

/// One scripted outcome of `ConfigWatcher::next`.
#[derive(Clone, Debug)]
pub enum WatchStep {
    /// Replace the document, then report a change.
    Change(Value),
    /// Report a watcher failure.
    Fail,
}

/// Config source whose watcher replays a fixed script, then waits forever.
pub struct ScriptedConfigSource {
    document: Arc<Mutex<Value>>,
    script: Mutex<Option<VecDeque<WatchStep>>>,
    fail_watch: bool,
}

impl ScriptedConfigSource {
    pub fn new(document: Value, script: Vec<WatchStep>) -> Self {
        Self {
            document: Arc::new(Mutex::new(document)),
            script: Mutex::new(Some(script.into())),
            fail_watch: false,
        }
    }

    /// Source whose `watch()` call itself fails.
    pub fn unwatchable(document: Value) -> Self {
        Self {
            document: Arc::new(Mutex::new(document)),
            script: Mutex::new(None),
            fail_watch: true,
        }
    }
}

#[async_trait]
impl ConfigSource for ScriptedConfigSource {
    async fn read(&self) -> Result<Value, FederationError> {
        Ok(self.document.lock().await.clone())
    }

    async fn watch(&self) -> Result<Box<dyn ConfigWatcher>, FederationError> {
        if self.fail_watch {
            return Err(FederationError::WatcherFailure(
                "scripted source refuses to watch".to_string(),
            ));
        }

        let steps = self.script.lock().await.take().unwrap_or_default();
        Ok(Box::new(ScriptedWatcher {
            document: self.document.clone(),
            steps,
        }))
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

struct ScriptedWatcher {
    document: Arc<Mutex<Value>>,
    steps: VecDeque<WatchStep>,
}

#[async_trait]
impl ConfigWatcher for ScriptedWatcher {
    async fn next(&mut self) -> Result<(), FederationError> {
        match self.steps.pop_front() {
            Some(WatchStep::Change(document)) => {
                *self.document.lock().await = document;
                Ok(())
            }
            Some(WatchStep::Fail) => Err(FederationError::WatcherFailure(
                "scripted watcher failure".to_string(),
            )),
            None => std::future::pending().await,
        }
    }
}
