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

//! Federation topology: which topics are bridged between which regions, and
//! which brokers make up each region.

use crate::error::FederationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Key of the federation section inside a config document.
pub const FEDERATION_CONFIG_PATH: &str = "federation";

/// Appended to a topic name when it is republished into another region.
pub const FEDERATED_TOPIC_SUFFIX: &str = ".federated";

/// Plugin name -> connection parameters, for one region.
pub type RegionBrokers = BTreeMap<String, ConnectionParams>;

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Topology {
    /// topic name -> topic config
    #[serde(default)]
    pub topics: BTreeMap<String, TopicSpec>,
    /// region -> brokers
    #[serde(default)]
    pub brokers: BTreeMap<String, RegionBrokers>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TopicSpec {
    /// Probability that a received message is republished.
    #[serde(default)]
    pub rate: f64,
    /// Regions the topic is republished into.
    #[serde(default)]
    pub publish: BTreeSet<String>,
    /// Regions the topic is read from.
    #[serde(default)]
    pub subscribe: BTreeSet<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConnectionParams {
    #[serde(default)]
    pub hosts: Vec<String>,
}

impl Topology {
    /// Extracts and validates a topology from a raw config document.
    ///
    /// The federation section is read from the `federation` key when present,
    /// otherwise the document itself is taken as the section. Loops between
    /// regions are not detected.
    pub fn extract(document: &Value) -> Result<Self, FederationError> {
        let section = document.get(FEDERATION_CONFIG_PATH).unwrap_or(document);

        let topology: Topology = serde_json::from_value(section.clone())
            .map_err(|e| FederationError::ConfigInvalid(format!("error reading config {e}")))?;

        topology.validate()?;
        Ok(topology)
    }

    /// Parses a JSON5 config document and extracts the topology from it.
    pub fn parse(text: &str) -> Result<Self, FederationError> {
        let document: Value = json5::from_str(text)
            .map_err(|e| FederationError::ConfigInvalid(format!("error parsing config {e}")))?;
        Self::extract(&document)
    }

    pub fn validate(&self) -> Result<(), FederationError> {
        if self.topics.is_empty() {
            return Err(FederationError::ConfigInvalid(
                "no topics found to federate".to_string(),
            ));
        }

        if self.brokers.is_empty() {
            return Err(FederationError::ConfigInvalid(
                "no brokers found to federate".to_string(),
            ));
        }

        Ok(())
    }

    /// Regions named by a topic but absent from `brokers`, as `(topic, region)` pairs.
    pub fn unconfigured_regions(&self) -> Vec<(&str, &str)> {
        self.topics
            .iter()
            .flat_map(|(name, spec)| {
                spec.publish
                    .iter()
                    .chain(spec.subscribe.iter())
                    .filter(|region| !self.brokers.contains_key(region.as_str()))
                    .map(move |region| (name.as_str(), region.as_str()))
            })
            .collect()
    }
}

impl TopicSpec {
    pub fn is_bridged(&self) -> bool {
        self.rate > 0.0
    }
}

pub fn is_federated_topic(topic: &str) -> bool {
    topic.ends_with(FEDERATED_TOPIC_SUFFIX)
}

pub fn federated_topic_name(topic: &str) -> String {
    format!("{topic}{FEDERATED_TOPIC_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::{federated_topic_name, is_federated_topic, Topology};
    use crate::error::FederationError;
    use serde_json::json;

    fn orders_document() -> serde_json::Value {
        json!({
            "topics": {
                "orders": { "rate": 1.0, "publish": ["eu"], "subscribe": ["us"] }
            },
            "brokers": {
                "us": { "memory": { "hosts": ["a"] } },
                "eu": { "memory": { "hosts": ["b"] } }
            }
        })
    }

    #[test]
    fn extract_reads_top_level_section() {
        let topology = Topology::extract(&orders_document()).expect("valid topology");

        let orders = &topology.topics["orders"];
        assert_eq!(orders.rate, 1.0);
        assert!(orders.publish.contains("eu"));
        assert!(orders.subscribe.contains("us"));
        assert_eq!(topology.brokers["us"]["memory"].hosts, vec!["a".to_string()]);
    }

    #[test]
    fn extract_prefers_federation_key() {
        let document = json!({ "federation": orders_document(), "unrelated": true });

        let topology = Topology::extract(&document).expect("valid topology");
        assert_eq!(topology.topics.len(), 1);
    }

    #[test]
    fn empty_topics_are_rejected() {
        let document = json!({
            "topics": {},
            "brokers": { "us": { "memory": { "hosts": ["a"] } } }
        });

        assert!(matches!(
            Topology::extract(&document),
            Err(FederationError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn empty_brokers_are_rejected() {
        let document = json!({
            "topics": { "orders": { "rate": 1.0, "publish": ["eu"], "subscribe": ["us"] } }
        });

        assert!(matches!(
            Topology::extract(&document),
            Err(FederationError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn schema_mismatch_is_rejected() {
        let document = json!({
            "topics": { "orders": { "rate": "fast" } },
            "brokers": { "us": { "memory": { "hosts": ["a"] } } }
        });
        assert!(matches!(
            Topology::extract(&document),
            Err(FederationError::ConfigInvalid(_))
        ));

        let document = json!({
            "topics": { "orders": { "rate": 1.0, "replicas": 3 } },
            "brokers": { "us": { "memory": { "hosts": ["a"] } } }
        });
        assert!(Topology::extract(&document).is_err());
    }

    #[test]
    fn parse_accepts_json5() {
        let text = r#"{
            // bridged every 10th message
            federation: {
                topics: { orders: { rate: 0.1, publish: ['eu'], subscribe: ['us'] } },
                brokers: { us: { memory: { hosts: ['a'] } }, eu: { memory: { hosts: ['b'] } } },
            },
        }"#;

        let topology = Topology::parse(text).expect("json5 topology");
        assert_eq!(topology.topics["orders"].rate, 0.1);
    }

    #[test]
    fn integer_rate_and_missing_lists_are_accepted() {
        let document = json!({
            "topics": { "audit": { "rate": 1 } },
            "brokers": { "us": { "memory": {} } }
        });

        let topology = Topology::extract(&document).expect("valid topology");
        assert!(topology.topics["audit"].is_bridged());
        assert!(topology.topics["audit"].publish.is_empty());
        assert!(topology.brokers["us"]["memory"].hosts.is_empty());
    }

    #[test]
    fn non_positive_rate_is_not_bridged() {
        let mut document = orders_document();
        document["topics"]["orders"]["rate"] = json!(0.0);
        let topology = Topology::extract(&document).expect("valid topology");
        assert!(!topology.topics["orders"].is_bridged());

        document["topics"]["orders"]["rate"] = json!(-0.5);
        let topology = Topology::extract(&document).expect("valid topology");
        assert!(!topology.topics["orders"].is_bridged());
    }

    #[test]
    fn unconfigured_regions_are_reported_not_rejected() {
        let mut document = orders_document();
        document["topics"]["orders"]["publish"] = json!(["eu", "apac"]);

        let topology = Topology::extract(&document).expect("missing region is not fatal");
        assert_eq!(topology.unconfigured_regions(), vec![("orders", "apac")]);
    }

    #[test]
    fn federated_suffix_helpers() {
        assert_eq!(federated_topic_name("orders"), "orders.federated");
        assert!(is_federated_topic("orders.federated"));
        assert!(!is_federated_topic("orders"));
        assert!(!is_federated_topic("orders.federated.audit"));
    }
}
