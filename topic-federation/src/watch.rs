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

//! Config watch loop with a bounded retry budget.

use backon::{BackoffBuilder, ConstantBuilder};
use crate::config::ConfigWatcher;
use crate::error::FederationError;
use crate::federator::Federator;
use crate::observability::events;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const DEFAULT_MAX_RETRIES: usize = 4;
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

const COMPONENT: &str = "watch";

/// How many consecutive watcher failures are tolerated, and how long to back
/// off between them.
///
/// Each failure takes the next delay of a constant backoff of `max_retries`
/// steps; the failure that finds the schedule empty ends the loop, so the
/// default tolerates four failures and exits on the fifth.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WatchPolicy {
    pub max_retries: usize,
    pub retry_interval: Duration,
}

impl Default for WatchPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

/// Applies every config change to `federator` until the watcher fails more
/// than the policy allows in a row. A successful change resets the budget.
pub async fn watch_loop(
    federator: Arc<Federator>,
    mut watcher: Box<dyn ConfigWatcher>,
    policy: WatchPolicy,
) -> Result<(), FederationError> {
    let schedule = || {
        ConstantBuilder::default()
            .with_delay(policy.retry_interval)
            .with_max_times(policy.max_retries)
            .build()
    };
    let mut delays = schedule();
    let mut failures = 0usize;

    loop {
        debug!(
            event = events::WATCH_WAITING,
            component = COMPONENT,
            federator = federator.name(),
            failures,
            "waiting for config change"
        );

        match watcher.next().await {
            Ok(()) => {
                info!(
                    event = events::WATCH_CHANGE,
                    component = COMPONENT,
                    federator = federator.name(),
                    "config changed"
                );
                if let Err(err) = federator.update().await {
                    debug!(
                        event = events::FEDERATOR_UPDATE_REJECTED,
                        component = COMPONENT,
                        federator = federator.name(),
                        err = %err,
                        "config change not applied"
                    );
                }
                delays = schedule();
                failures = 0;
            }
            Err(err) => {
                failures += 1;
                let Some(delay) = delays.next() else {
                    error!(
                        event = events::WATCH_EXHAUSTED,
                        component = COMPONENT,
                        federator = federator.name(),
                        failures,
                        err = %err,
                        "config watcher failed too many times"
                    );
                    return Err(FederationError::WatcherExhausted { attempts: failures });
                };

                warn!(
                    event = events::WATCH_FAILED,
                    component = COMPONENT,
                    federator = federator.name(),
                    failures,
                    err = %err,
                    "config watcher failed; retrying in {delay:?}"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
