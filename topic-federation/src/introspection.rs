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

//! Read-only view of the active topology, for diagnostics.

use crate::error::FederationError;
use crate::federator::Federator;
use crate::topology::Topology;
use serde_json::Value;

/// Serializes `topology` to the same shape it is configured in.
pub fn topology_document(topology: &Topology) -> Result<Value, FederationError> {
    serde_json::to_value(topology)
        .map_err(|e| FederationError::ConfigInvalid(format!("unable to serialize topology: {e}")))
}

/// Pretty printed JSON rendering of `topology`.
pub fn render_topology(topology: &Topology) -> Result<String, FederationError> {
    serde_json::to_string_pretty(topology)
        .map_err(|e| FederationError::ConfigInvalid(format!("unable to serialize topology: {e}")))
}

/// Document of the topology `federator` currently holds, if any.
pub async fn snapshot(federator: &Federator) -> Result<Option<Value>, FederationError> {
    federator
        .topology()
        .await
        .as_ref()
        .map(topology_document)
        .transpose()
}
