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
use std::sync::Arc;
use tokio::sync::Mutex;
use topic_federation::{BrokerError, Message, MessageHandler};
use tracing::debug;

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedMessage {
    pub topic: String,
    pub message: Message,
}

/// Handler that stores every message it is given.
#[derive(Clone, Default)]
pub struct RecordingHandler {
    message_store: Arc<Mutex<Vec<RecordedMessage>>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn messages(&self) -> Vec<RecordedMessage> {
        self.message_store.lock().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.message_store.lock().await.len()
    }
}

#[async_trait]
impl MessageHandler for RecordingHandler {
    async fn on_message(&self, topic: &str, message: Message) -> Result<(), BrokerError> {
        debug!("recording message on {topic}: {} bytes", message.body.len());
        self.message_store.lock().await.push(RecordedMessage {
            topic: topic.to_string(),
            message,
        });
        Ok(())
    }
}
