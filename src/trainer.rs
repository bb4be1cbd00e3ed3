/**
 * SVPOI
 * Copyright (C) 2018 Sebastian Schelter
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

use std::time::Instant;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_derive::Serialize;

use crate::config::TrainerConfig;
use crate::error::{Error, Result};
use crate::math;
use crate::signal::{Factors, PhotoSignal, RatingSignal, Signal, SocialSignal};
use crate::types::{DenseMatrix, RatingMatrix, SparseMatrix};

/// Loss and learning rate of a finished epoch. Field names will be used in JSON.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct EpochReport {
    pub epoch: usize,
    pub loss: f64,
    /// Loss of the previous epoch minus this loss, absent for the first epoch.
    pub delta_loss: Option<f64>,
    /// Learning rate applied in this epoch.
    pub learn_rate: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    Converged,
    MaxIterationsReached,
}

#[derive(Clone, Debug)]
pub struct TrainingSummary {
    pub epochs: Vec<EpochReport>,
    pub stop_reason: StopReason,
}

impl TrainingSummary {
    pub fn final_loss(&self) -> Option<f64> {
        self.epochs.last().map(|report| report.loss)
    }
}

/// Full-batch gradient descent over the rating, social and photo signals, which share the
/// user and item factors.
pub struct Trainer<'a> {
    config: &'a TrainerConfig,
    signals: Vec<Box<dyn Signal + 'a>>,
    factors: Factors,
    learn_rate: f64,
    last_loss: Option<f64>,
    previous_loss: Option<f64>,
    epoch: usize,
    min_rate: f64,
    max_rate: f64,
}

impl<'a> Trainer<'a> {

    /// Allocates and initializes the factors and wires up the signals. Without `photos` the
    /// photo signal is left out and the photo factors keep their initial values.
    pub fn setup(
        config: &'a TrainerConfig,
        ratings: &'a RatingMatrix,
        social: &'a SparseMatrix,
        photos: Option<&'a DenseMatrix>,
    ) -> Result<Self> {

        let num_users = ratings.num_users();
        let num_items = ratings.num_items();

        if !(ratings.max_rate() > ratings.min_rate()) {
            return Err(Error::InvalidData(format!(
                "rating scale [{}, {}] is empty", ratings.min_rate(), ratings.max_rate())));
        }

        if social.num_rows() != num_users || social.num_columns() != num_users {
            return Err(Error::DimensionMismatch(format!(
                "social matrix is {}x{}, expected {}x{}",
                social.num_rows(), social.num_columns(), num_users, num_users)));
        }

        if let Some(photos) = photos {
            if photos.num_rows() != num_items || photos.num_columns() != config.feature_dimension {
                return Err(Error::DimensionMismatch(format!(
                    "photo matrix is {}x{}, expected {}x{}",
                    photos.num_rows(), photos.num_columns(), num_items, config.feature_dimension)));
            }
        }

        let factors = initial_factors(config, num_users, num_items);

        let mut signals: Vec<Box<dyn Signal + 'a>> = Vec::with_capacity(3);
        signals.push(Box::new(RatingSignal::new(ratings, config.reg_user, config.reg_item)));
        signals.push(
            Box::new(SocialSignal::new(social, config.reg_rate_social, config.reg_user_social)));

        if let Some(photos) = photos {
            signals.push(
                Box::new(PhotoSignal::new(photos, config.reg_photo, config.reg_item_photo)));
        }

        info!("Set up training of {} factors for {} users and {} items from {} ratings, \
            {} social links and {} photo features per item",
            config.num_factors, num_users, num_items, ratings.matrix().len(), social.len(),
            photos.map(|photos| photos.num_columns()).unwrap_or(0));

        Ok(Trainer {
            config,
            signals,
            factors,
            learn_rate: config.learn_rate,
            last_loss: None,
            previous_loss: None,
            epoch: 0,
            min_rate: ratings.min_rate(),
            max_rate: ratings.max_rate(),
        })
    }

    pub fn factors(&self) -> &Factors {
        &self.factors
    }

    pub fn into_factors(self) -> Factors {
        self.factors
    }

    pub fn learn_rate(&self) -> f64 {
        self.learn_rate
    }

    /// Predicted rating on the scale of the training data, `None` for unknown indices.
    pub fn predict(&self, user: usize, item: usize) -> Option<f64> {
        if user >= self.factors.user.num_rows() || item >= self.factors.item.num_rows() {
            return None;
        }

        let prediction = DenseMatrix::row_dot(&self.factors.user, user, &self.factors.item, item);

        Some(math::denormalize(math::logistic(prediction), self.min_rate, self.max_rate))
    }

    /// Runs epochs until the loss converges (if early stopping is enabled) or the configured
    /// number of iterations is reached.
    pub fn train(&mut self) -> Result<TrainingSummary> {

        let mut epochs = Vec::with_capacity(self.config.num_iterations);

        while self.epoch < self.config.num_iterations {
            let report = self.run_epoch()?;
            let converged = self.is_converged(&report);

            epochs.push(report);

            if converged && self.config.early_stop {
                info!("Converged after {} epochs", self.epoch);
                return Ok(TrainingSummary { epochs, stop_reason: StopReason::Converged });
            }

            self.update_learn_rate();
        }

        Ok(TrainingSummary { epochs, stop_reason: StopReason::MaxIterationsReached })
    }

    /// Computes the gradients of all signals with respect to the current factors and applies
    /// them at once.
    pub fn run_epoch(&mut self) -> Result<EpochReport> {

        let epoch_start = Instant::now();
        let epoch = self.epoch + 1;

        let mut gradients = self.factors.zeros_like();
        let mut loss = 0.0;

        for signal in self.signals.iter() {
            let signal_loss = signal.accumulate(&self.factors, &mut gradients);
            debug!("Epoch {}: {} loss {}", epoch, signal.name(), signal_loss);
            loss += signal_loss;
        }

        loss *= 0.5;

        // The factors of the last finite epoch are kept
        if !loss.is_finite() {
            return Err(Error::Divergence { epoch, loss });
        }

        self.factors = self.factors.descend(&gradients, self.learn_rate);
        self.epoch = epoch;

        let report = EpochReport {
            epoch: self.epoch,
            loss,
            delta_loss: self.last_loss.map(|last_loss| last_loss - loss),
            learn_rate: self.learn_rate,
        };

        self.previous_loss = self.last_loss;
        self.last_loss = Some(loss);

        info!("Epoch {}: loss = {}, delta_loss = {:?}, learn_rate = {}, {}ms", report.epoch,
            report.loss, report.delta_loss, report.learn_rate, epoch_start.elapsed().as_millis());

        Ok(report)
    }

    fn is_converged(&self, report: &EpochReport) -> bool {
        match report.delta_loss {
            Some(delta_loss) => delta_loss.abs() < self.config.convergence_threshold,
            None => false,
        }
    }

    /// Bold driver (grow the rate while the loss decreases, halve it otherwise) or a fixed
    /// decay, capped by the optional maximum rate.
    fn update_learn_rate(&mut self) {

        if self.config.bold_driver && self.epoch > 1 {
            if let (Some(previous), Some(current)) = (self.previous_loss, self.last_loss) {
                self.learn_rate *= if previous.abs() > current.abs() { 1.05 } else { 0.5 };
            }
        } else if self.config.decay > 0.0 && self.config.decay < 1.0 {
            self.learn_rate *= self.config.decay;
        }

        if let Some(max_learn_rate) = self.config.max_learn_rate {
            if self.learn_rate > max_learn_rate {
                self.learn_rate = max_learn_rate;
            }
        }

        debug!("Learning rate after epoch {}: {}", self.epoch, self.learn_rate);
    }
}

/// Uniform initialization in `[0, init_range)` from a single seeded generator, in the order
/// user, item, user-social, item-photo.
fn initial_factors(config: &TrainerConfig, num_users: usize, num_items: usize) -> Factors {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let num_factors = config.num_factors;
    let range = config.init_range;

    let user = DenseMatrix::random(num_users, num_factors, range, &mut rng);
    let item = DenseMatrix::random(num_items, num_factors, range, &mut rng);
    let user_social = DenseMatrix::random(num_users, num_factors, range, &mut rng);
    let item_photo = DenseMatrix::random(config.feature_dimension, num_factors, range, &mut rng);

    Factors { user, item, user_social, item_photo }
}
