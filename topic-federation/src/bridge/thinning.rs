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

//! Statistical thinning of forwarded traffic.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex, PoisonError};

/// Random source deciding whether a received message is forwarded.
///
/// Clones share one generator, so a seeded `Thinner` yields one reproducible
/// sequence of draws across every handler it was handed to.
#[derive(Clone)]
pub struct Thinner {
    rng: Arc<Mutex<StdRng>>,
}

impl Thinner {
    pub fn from_entropy() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    pub fn from_rng(rng: StdRng) -> Self {
        Self {
            rng: Arc::new(Mutex::new(rng)),
        }
    }

    /// Uniform draw in `[0, 1)`.
    pub fn draw(&self) -> f64 {
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen::<f64>()
    }

    /// Draws once and admits the message unless the draw exceeds `rate`.
    pub fn admits(&self, rate: f64) -> bool {
        self.draw() <= rate
    }
}

impl Default for Thinner {
    fn default() -> Self {
        Self::from_entropy()
    }
}

#[cfg(test)]
mod tests {
    use super::Thinner;

    #[test]
    fn full_rate_always_admits() {
        let thinner = Thinner::seeded(7);

        assert!((0..10_000).all(|_| thinner.admits(1.0)));
    }

    #[test]
    fn zero_rate_almost_never_admits() {
        let thinner = Thinner::seeded(7);

        let admitted = (0..10_000).filter(|_| thinner.admits(0.0)).count();
        assert!(admitted <= 1);
    }

    #[test]
    fn half_rate_admits_roughly_half() {
        let thinner = Thinner::seeded(42);

        let admitted = (0..10_000).filter(|_| thinner.admits(0.5)).count();
        assert!((4_500..=5_500).contains(&admitted), "admitted {admitted}");
    }

    #[test]
    fn same_seed_gives_same_sequence() {
        let left = Thinner::seeded(1234);
        let right = Thinner::seeded(1234);

        let left_draws: Vec<f64> = (0..16).map(|_| left.draw()).collect();
        let right_draws: Vec<f64> = (0..16).map(|_| right.draw()).collect();
        assert_eq!(left_draws, right_draws);
    }

    #[test]
    fn clones_share_one_generator() {
        let thinner = Thinner::seeded(99);
        let reference = Thinner::seeded(99);
        let clone = thinner.clone();

        let interleaved = [thinner.draw(), clone.draw(), thinner.draw()];
        let sequential = [reference.draw(), reference.draw(), reference.draw()];
        assert_eq!(interleaved, sequential);
    }
}
