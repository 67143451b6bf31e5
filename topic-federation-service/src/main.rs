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

mod cli;

use crate::cli::{FederationArgs, SourceSpec};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use topic_federation::introspection::render_topology;
use topic_federation::{
    BrokerRegistry, ConfigSource, FederationError, Federator, MemoryHub, Thinner, Topology,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const SERVICE_NAME: &str = "federation-srv";

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    info!("Started {SERVICE_NAME}");

    let args = FederationArgs::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(err = %err, "{SERVICE_NAME} exiting");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: FederationArgs) -> Result<(), FederationError> {
    let scheme = SourceSpec::scheme(&args.config_source);
    if !scheme.is_empty() && scheme != "file" {
        warn!("Unknown config source {scheme}; falling back to file");
    }

    let source = args.file_source();
    info!("Using file source: {}", source.path().display());

    if args.check {
        let topology = Topology::extract(&source.read().await?)?;
        for (topic, region) in topology.unconfigured_regions() {
            warn!("topic {topic} names region {region} which has no brokers");
        }
        println!("{}", render_topology(&topology)?);
        return Ok(());
    }

    let registry = BrokerRegistry::with_defaults(MemoryHub::new());
    info!("Registered broker plugins: {:?}", registry.plugins());

    let federator = Arc::new(Federator::new(
        SERVICE_NAME,
        registry,
        Arc::new(source),
        Thinner::from_entropy(),
    ));

    let mut watch = federator.run(args.watch_policy()).await?;

    let outcome = tokio::select! {
        joined = &mut watch => match joined {
            Ok(result) => result,
            Err(join_err) => Err(FederationError::WatcherFailure(format!(
                "watch task ended abnormally: {join_err}"
            ))),
        },
        signal = tokio::signal::ctrl_c() => {
            if let Err(err) = signal {
                warn!("unable to listen for shutdown signal: {err}");
            }
            info!("Shutting down {SERVICE_NAME}");
            Ok(())
        }
    };

    watch.abort();

    federator.stop().await;
    federator.drained().await;

    outcome
}
