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

use crate::bridge::thinning::Thinner;
use crate::bridge::{BridgeEngine, BridgeReport};
use crate::config::ConfigSource;
use crate::error::FederationError;
use crate::observability::events;
use crate::pool::RegionBrokerPool;
use crate::registry::BrokerRegistry;
use crate::topology::Topology;
use crate::watch::{watch_loop, WatchPolicy};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

const FEDERATOR_TAG: &str = "Federator:";
const COMPONENT: &str = "federator";

/// Lifecycle state of a [`Federator`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FederatorState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Everything created by one `start()` and torn down by the next `stop()`.
struct Generation {
    exit: CancellationToken,
    waiters: TaskTracker,
    pool: RegionBrokerPool,
    report: BridgeReport,
}

struct EngineState {
    state: FederatorState,
    topology: Option<Topology>,
    generation: Option<Generation>,
    // Waiters of stopped generations, kept until they drain.
    retired: Vec<TaskTracker>,
}

/// Bridges topics across regional brokers according to the topology read
/// from a [`ConfigSource`].
///
/// All lifecycle transitions and every read of the active topology go through
/// one lock, so there is never more than one live generation of broker
/// connections and subscriptions.
pub struct Federator {
    name: String,
    registry: BrokerRegistry,
    bridge: BridgeEngine,
    source: Arc<dyn ConfigSource>,
    engine: Mutex<EngineState>,
}

impl Federator {
    pub fn new(
        name: &str,
        registry: BrokerRegistry,
        source: Arc<dyn ConfigSource>,
        thinner: Thinner,
    ) -> Self {
        let name = format!("{FEDERATOR_TAG}{name}");
        debug!(federator = name.as_str(), "federator created");

        Self {
            name,
            registry,
            bridge: BridgeEngine::new(thinner),
            source,
            engine: Mutex::new(EngineState {
                state: FederatorState::Stopped,
                topology: None,
                generation: None,
                retired: Vec::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn state(&self) -> FederatorState {
        self.engine.lock().await.state
    }

    pub async fn is_running(&self) -> bool {
        self.state().await == FederatorState::Running
    }

    /// Snapshot of the active topology, for introspection only.
    pub async fn topology(&self) -> Option<Topology> {
        self.engine.lock().await.topology.clone()
    }

    /// Wiring outcome of the running generation.
    pub async fn report(&self) -> Option<BridgeReport> {
        let engine = self.engine.lock().await;
        if engine.state != FederatorState::Running {
            return None;
        }
        engine
            .generation
            .as_ref()
            .map(|generation| generation.report.clone())
    }

    /// Reads and validates the topology from the config source.
    async fn fetch(&self) -> Result<Topology, FederationError> {
        let document = self.source.read().await?;
        Topology::extract(&document)
    }

    /// Reads the topology and stores it without starting. A failure leaves
    /// the stored topology untouched.
    pub async fn load(&self) -> Result<(), FederationError> {
        let topology = self.fetch().await?;
        self.engine.lock().await.topology = Some(topology);
        Ok(())
    }

    /// Connects the region pools and wires every bridged topic. No-op when
    /// already running or when no topology has been loaded.
    ///
    /// The generation is stored before the first broker connects. If this
    /// future is dropped partway, the engine stays `Starting` and whatever was
    /// connected is torn down by the next `stop()` or `start()`.
    pub async fn start(&self) {
        let mut engine = self.engine.lock().await;
        if engine.state == FederatorState::Running {
            debug!(
                event = events::FEDERATOR_ALREADY_RUNNING,
                component = COMPONENT,
                federator = self.name.as_str(),
                "federator already running"
            );
            return;
        }

        let Some(topology) = engine.topology.clone() else {
            warn!(
                event = events::FEDERATOR_NO_TOPOLOGY,
                component = COMPONENT,
                federator = self.name.as_str(),
                "no topology loaded; not starting"
            );
            return;
        };

        if engine.generation.is_some() {
            warn!(
                event = events::FEDERATOR_ABANDONED_START,
                component = COMPONENT,
                federator = self.name.as_str(),
                "tearing down an unfinished start"
            );
            self.teardown(&mut engine).await;
        }

        info!(
            event = events::FEDERATOR_START,
            component = COMPONENT,
            federator = self.name.as_str(),
            "starting federator"
        );
        engine.state = FederatorState::Starting;

        let generation = engine.generation.insert(Generation {
            exit: CancellationToken::new(),
            waiters: TaskTracker::new(),
            pool: RegionBrokerPool::default(),
            report: BridgeReport::default(),
        });
        generation
            .pool
            .connect_regions(&topology, &self.registry)
            .await;
        generation.report = self
            .bridge
            .wire(
                &topology,
                &generation.pool,
                &generation.exit,
                &generation.waiters,
            )
            .await;

        info!(
            event = events::FEDERATOR_STARTED,
            component = COMPONENT,
            federator = self.name.as_str(),
            brokers = generation.pool.broker_count(),
            subscriptions = generation.report.subscriptions,
            failed_subscriptions = generation.report.failed_subscriptions,
            "federator running"
        );
        engine.state = FederatorState::Running;
    }

    /// Fires the stop signal and disconnects every broker. No-op when nothing
    /// was started. Unsubscribe waiters finish in the background; see
    /// [`Federator::drained`].
    pub async fn stop(&self) {
        let mut engine = self.engine.lock().await;
        if engine.generation.is_none() {
            debug!(
                event = events::FEDERATOR_NOT_RUNNING,
                component = COMPONENT,
                federator = self.name.as_str(),
                "federator not running"
            );
            return;
        }

        info!(
            event = events::FEDERATOR_STOP,
            component = COMPONENT,
            federator = self.name.as_str(),
            "stopping federator"
        );
        self.teardown(&mut engine).await;
    }

    async fn teardown(&self, engine: &mut EngineState) {
        engine.state = FederatorState::Stopping;

        if let Some(generation) = engine.generation.take() {
            generation.exit.cancel();
            generation.waiters.close();
            generation.pool.disconnect_all().await;

            engine
                .retired
                .retain(|waiters| !(waiters.is_closed() && waiters.is_empty()));
            engine.retired.push(generation.waiters);
        }

        engine.state = FederatorState::Stopped;
    }

    /// Re-reads the topology and swaps it in: stop, replace, start. When the
    /// new topology is invalid the running instance is left untouched.
    pub async fn update(&self) -> Result<(), FederationError> {
        info!(
            event = events::FEDERATOR_UPDATE_START,
            component = COMPONENT,
            federator = self.name.as_str(),
            "updating federator config"
        );

        let topology = match self.fetch().await {
            Ok(topology) => topology,
            Err(err) => {
                warn!(
                    event = events::FEDERATOR_UPDATE_REJECTED,
                    component = COMPONENT,
                    federator = self.name.as_str(),
                    err = %err,
                    "keeping current topology"
                );
                return Err(err);
            }
        };

        self.stop().await;
        self.engine.lock().await.topology = Some(topology);
        self.start().await;

        info!(
            event = events::FEDERATOR_UPDATE_OK,
            component = COMPONENT,
            federator = self.name.as_str(),
            "federator config updated"
        );
        Ok(())
    }

    /// Waits until every unsubscribe waiter of every stopped generation has
    /// finished.
    pub async fn drained(&self) {
        let retired = {
            let mut engine = self.engine.lock().await;
            engine
                .retired
                .retain(|waiters| !(waiters.is_closed() && waiters.is_empty()));
            engine.retired.clone()
        };

        for waiters in retired {
            waiters.wait().await;
        }
    }

    /// Opens the config watcher, loads and starts the initial topology, then
    /// spawns the watch loop.
    ///
    /// An invalid initial topology is returned as an error and nothing is
    /// started. The returned task only finishes when the watcher is beyond
    /// recovery.
    pub async fn run(
        self: &Arc<Self>,
        policy: WatchPolicy,
    ) -> Result<JoinHandle<Result<(), FederationError>>, FederationError> {
        info!(
            event = events::WATCH_OPEN,
            component = COMPONENT,
            federator = self.name.as_str(),
            source = %self.source.describe(),
            "watching config source"
        );

        let watcher = self.source.watch().await?;
        self.load().await?;
        self.start().await;

        Ok(tokio::spawn(watch_loop(self.clone(), watcher, policy)))
    }
}
