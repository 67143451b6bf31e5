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

//! External config sources the federator reads its topology from.

mod file;
mod memory;

pub use file::{FileSource, FileWatcher, DEFAULT_CONFIG_FILE, DEFAULT_POLL_INTERVAL};
pub use memory::{MemorySource, MemoryWatcher};

use crate::error::FederationError;
use async_trait::async_trait;
use serde_json::Value;

/// A config document that can be read wholesale and watched for changes.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Reads the current document.
    async fn read(&self) -> Result<Value, FederationError>;

    /// Opens a watcher reporting subsequent changes to the document.
    async fn watch(&self) -> Result<Box<dyn ConfigWatcher>, FederationError>;

    /// Human readable origin of the document, for logs.
    fn describe(&self) -> String;
}

/// Change notifications from a [`ConfigSource`].
#[async_trait]
pub trait ConfigWatcher: Send {
    /// Blocks until the next change. An error leaves the watcher usable; the
    /// caller decides whether to retry.
    async fn next(&mut self) -> Result<(), FederationError>;
}

/// Parses a JSON5 document into a JSON value.
pub(crate) fn parse_document(text: &str, origin: &str) -> Result<Value, FederationError> {
    json5::from_str(text)
        .map_err(|e| FederationError::ConfigSource(format!("unable to parse {origin}: {e}")))
}
