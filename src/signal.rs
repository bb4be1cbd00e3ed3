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

use crate::math;
use crate::types::{DenseMatrix, DenseVector, RatingMatrix, SparseMatrix};

/// The four latent factor matrices learned jointly. The same shape is used for the gradients
/// accumulated during an epoch.
#[derive(Clone, Debug, PartialEq)]
pub struct Factors {
    /// numUsers x K
    pub user: DenseMatrix,
    /// numItems x K
    pub item: DenseMatrix,
    /// numUsers x K, the trusted-user side of the social signal
    pub user_social: DenseMatrix,
    /// featureDimension x K
    pub item_photo: DenseMatrix,
}

impl Factors {

    /// Zero matrices with the same shapes as `self`.
    pub fn zeros_like(&self) -> Factors {
        Factors {
            user: DenseMatrix::new(self.user.num_rows(), self.user.num_columns()),
            item: DenseMatrix::new(self.item.num_rows(), self.item.num_columns()),
            user_social: DenseMatrix::new(
                self.user_social.num_rows(), self.user_social.num_columns()),
            item_photo: DenseMatrix::new(
                self.item_photo.num_rows(), self.item_photo.num_columns()),
        }
    }

    /// One gradient descent step, `factors + gradients * (-learn_rate)` for all four matrices.
    pub fn descend(&self, gradients: &Factors, learn_rate: f64) -> Factors {
        Factors {
            user: self.user.add(&gradients.user.scale(-learn_rate)),
            item: self.item.add(&gradients.item.scale(-learn_rate)),
            user_social: self.user_social.add(&gradients.user_social.scale(-learn_rate)),
            item_photo: self.item_photo.add(&gradients.item_photo.scale(-learn_rate)),
        }
    }
}

/// A data source the factors have to explain. Implementations read the current factors only,
/// accumulate their partial derivatives into `gradients` and return their (unhalved) loss.
pub trait Signal {
    fn name(&self) -> &'static str;

    fn accumulate(&self, factors: &Factors, gradients: &mut Factors) -> f64;
}

/// Logistic fit of the min-max normalized ratings by `user . item`.
pub struct RatingSignal<'a> {
    ratings: &'a RatingMatrix,
    reg_user: f64,
    reg_item: f64,
}

impl<'a> RatingSignal<'a> {
    pub fn new(ratings: &'a RatingMatrix, reg_user: f64, reg_item: f64) -> Self {
        RatingSignal { ratings, reg_user, reg_item }
    }
}

impl<'a> Signal for RatingSignal<'a> {

    fn name(&self) -> &'static str {
        "rating"
    }

    fn accumulate(&self, factors: &Factors, gradients: &mut Factors) -> f64 {

        let min_rate = self.ratings.min_rate();
        let max_rate = self.ratings.max_rate();
        let num_factors = factors.user.num_columns();

        let mut loss = 0.0;

        for (user, item, rating) in self.ratings.matrix().iter() {

            let prediction = DenseMatrix::row_dot(&factors.user, user, &factors.item, item);
            let error = math::logistic(prediction) - math::normalize(rating, min_rate, max_rate);
            let gradient = math::logistic_gradient(prediction) * error;

            loss += error * error;

            for factor in 0..num_factors {
                let user_value = factors.user.get(user, factor);
                let item_value = factors.item.get(item, factor);

                gradients.user.add_at(user, factor,
                    gradient * item_value + self.reg_user * user_value);
                gradients.item.add_at(item, factor,
                    gradient * user_value + self.reg_item * item_value);

                loss += self.reg_user * user_value * user_value +
                    self.reg_item * item_value * item_value;
            }
        }

        loss
    }
}

/// Confidence of a trust edge from a user with `out_degree` outgoing edges to a user with
/// `in_degree` incoming edges, always in [0,1].
pub fn social_weight(out_degree: u32, in_degree: u32) -> f64 {
    let denominator = out_degree as f64 + in_degree as f64;

    if denominator == 0.0 {
        return 0.0;
    }

    let weight = (in_degree as f64 / denominator).sqrt();

    if weight.is_finite() { weight } else { 0.0 }
}

/// Logistic fit of the degree weighted trust strengths by `user . user_social`.
pub struct SocialSignal<'a> {
    social: &'a SparseMatrix,
    in_degrees: DenseVector,
    out_degrees: DenseVector,
    reg_rate_social: f64,
    reg_user_social: f64,
}

impl<'a> SocialSignal<'a> {

    /// Counts the in- and out-degrees of all users once, they stay fixed for the whole run.
    pub fn new(social: &'a SparseMatrix, reg_rate_social: f64, reg_user_social: f64) -> Self {
        let in_degrees = (0..social.num_columns())
            .map(|user| social.column_size(user) as u32)
            .collect();
        let out_degrees = (0..social.num_rows())
            .map(|user| social.row_size(user) as u32)
            .collect();

        SocialSignal { social, in_degrees, out_degrees, reg_rate_social, reg_user_social }
    }

    pub fn weight(&self, user: usize, trusted_user: usize) -> f64 {
        social_weight(self.out_degrees[user], self.in_degrees[trusted_user])
    }
}

impl<'a> Signal for SocialSignal<'a> {

    fn name(&self) -> &'static str {
        "social"
    }

    fn accumulate(&self, factors: &Factors, gradients: &mut Factors) -> f64 {

        let num_factors = factors.user.num_columns();
        let mut loss = 0.0;

        for (user, trusted_user, strength) in self.social.iter() {

            if strength <= 0.0 {
                continue;
            }

            let prediction =
                DenseMatrix::row_dot(&factors.user, user, &factors.user_social, trusted_user);
            let error = math::logistic(prediction) - self.weight(user, trusted_user) * strength;
            let gradient = self.reg_rate_social * math::logistic_gradient(prediction) * error;

            loss += self.reg_rate_social * error * error;

            for factor in 0..num_factors {
                let user_value = factors.user.get(user, factor);
                let social_value = factors.user_social.get(trusted_user, factor);

                gradients.user.add_at(user, factor, gradient * social_value);
                gradients.user_social.add_at(trusted_user, factor,
                    gradient * user_value + self.reg_user_social * social_value);

                loss += self.reg_user_social * social_value * social_value;
            }
        }

        loss
    }
}

/// Logistic fit of every photo feature of every item by `item . item_photo`.
pub struct PhotoSignal<'a> {
    photos: &'a DenseMatrix,
    reg_photo: f64,
    reg_item_photo: f64,
}

impl<'a> PhotoSignal<'a> {
    pub fn new(photos: &'a DenseMatrix, reg_photo: f64, reg_item_photo: f64) -> Self {
        PhotoSignal { photos, reg_photo, reg_item_photo }
    }
}

impl<'a> Signal for PhotoSignal<'a> {

    fn name(&self) -> &'static str {
        "photo"
    }

    fn accumulate(&self, factors: &Factors, gradients: &mut Factors) -> f64 {

        const WEIGHT: f64 = 1.0;

        let num_factors = factors.item.num_columns();
        let mut loss = 0.0;

        for item in 0..self.photos.num_rows() {
            for feature in 0..self.photos.num_columns() {

                let prediction =
                    DenseMatrix::row_dot(&factors.item, item, &factors.item_photo, feature);
                let error = math::logistic(prediction) - WEIGHT * self.photos.get(item, feature);
                let gradient = self.reg_photo * math::logistic_gradient(prediction) * error;

                loss += self.reg_photo * error * error;

                for factor in 0..num_factors {
                    let item_value = factors.item.get(item, factor);
                    let photo_value = factors.item_photo.get(feature, factor);

                    gradients.item.add_at(item, factor, gradient * photo_value);
                    gradients.item_photo.add_at(feature, factor,
                        gradient * item_value + self.reg_item_photo * photo_value);

                    loss += self.reg_item_photo * photo_value * photo_value;
                }
            }
        }

        loss
    }
}


#[cfg(test)]
mod tests {

    use crate::math;
    use crate::signal::{self, Factors, PhotoSignal, RatingSignal, Signal, SocialSignal};
    use crate::types::{DenseMatrix, RatingMatrix, SparseMatrix};

    fn close_enough_to(value: f64, expected: f64) -> bool {
        (value - expected).abs() < 1e-12
    }

    fn factors(user: &[f64], item: &[f64], user_social: &[f64], item_photo: &[f64]) -> Factors {
        let matrix = |values: &[f64]| {
            let mut matrix = DenseMatrix::new(values.len(), 1);
            for (row, value) in values.iter().enumerate() {
                matrix.set(row, 0, *value);
            }
            matrix
        };

        Factors {
            user: matrix(user),
            item: matrix(item),
            user_social: matrix(user_social),
            item_photo: matrix(item_photo),
        }
    }

    #[test]
    fn social_weight_edge_cases() {
        assert_eq!(signal::social_weight(0, 0), 0.0);
        assert_eq!(signal::social_weight(0, 3), 1.0);
        assert_eq!(signal::social_weight(5, 0), 0.0);
        assert!(close_enough_to(signal::social_weight(1, 1), 0.5_f64.sqrt()));
    }

    #[test]
    fn degrees_are_counted_from_stored_entries() {
        let social = SparseMatrix::from_entries(3, 3,
            vec![(0, 1, 1.0), (0, 2, 1.0), (2, 1, -1.0)]).unwrap();

        let signal = SocialSignal::new(&social, 0.1, 0.1);

        // out(0) = 2, in(1) = 2
        assert!(close_enough_to(signal.weight(0, 1), 0.5_f64.sqrt()));
        // out(0) = 2, in(2) = 1
        assert!(close_enough_to(signal.weight(0, 2), (1.0_f64 / 3.0).sqrt()));
    }

    #[test]
    fn rating_gradient_and_loss() {
        let ratings = RatingMatrix::with_bounds(
            SparseMatrix::from_entries(1, 1, vec![(0, 0, 5.0)]).unwrap(), 1.0, 5.0);

        let current = factors(&[0.5], &[2.0], &[0.0], &[0.0]);
        let mut gradients = current.zeros_like();

        let loss = RatingSignal::new(&ratings, 0.1, 0.2).accumulate(&current, &mut gradients);

        let error = math::logistic(1.0) - 1.0;
        let gradient = math::logistic_gradient(1.0) * error;

        assert!(close_enough_to(loss, error * error + 0.1 * 0.25 + 0.2 * 4.0));
        assert!(close_enough_to(gradients.user.get(0, 0), gradient * 2.0 + 0.1 * 0.5));
        assert!(close_enough_to(gradients.item.get(0, 0), gradient * 0.5 + 0.2 * 2.0));
        assert_eq!(gradients.user_social.get(0, 0), 0.0);
    }

    #[test]
    fn non_positive_links_are_skipped() {
        let social = SparseMatrix::from_entries(2, 2, vec![(0, 1, -2.0)]).unwrap();

        let current = factors(&[1.0, 1.0], &[1.0], &[1.0, 1.0], &[1.0]);
        let mut gradients = current.zeros_like();

        let loss = SocialSignal::new(&social, 0.5, 0.5).accumulate(&current, &mut gradients);

        assert_eq!(loss, 0.0);
        assert_eq!(gradients, current.zeros_like());
    }

    #[test]
    fn social_gradient_and_loss() {
        let social = SparseMatrix::from_entries(2, 2, vec![(0, 1, 1.0)]).unwrap();

        let current = factors(&[0.5, 0.0], &[0.0], &[0.0, 3.0], &[0.0]);
        let mut gradients = current.zeros_like();

        let loss = SocialSignal::new(&social, 0.5, 0.25).accumulate(&current, &mut gradients);

        // out(0) = 1, in(1) = 1
        let error = math::logistic(1.5) - 0.5_f64.sqrt();
        let gradient = 0.5 * math::logistic_gradient(1.5) * error;

        assert!(close_enough_to(loss, 0.5 * error * error + 0.25 * 9.0));
        assert!(close_enough_to(gradients.user.get(0, 0), gradient * 3.0));
        assert!(close_enough_to(gradients.user_social.get(1, 0), gradient * 0.5 + 0.25 * 3.0));
        assert_eq!(gradients.user.get(1, 0), 0.0);
    }

    #[test]
    fn photo_gradient_covers_all_items_and_features() {
        let mut photos = DenseMatrix::new(2, 2);
        photos.set_row(0, &[0.1, 0.2]).unwrap();
        photos.set_row(1, &[0.3, 0.4]).unwrap();

        let current = factors(&[0.0], &[1.0, 2.0], &[0.0], &[0.5, -0.5]);
        let mut gradients = current.zeros_like();

        let loss = PhotoSignal::new(&photos, 0.1, 0.01).accumulate(&current, &mut gradients);

        let mut expected_loss = 0.0;
        for item in 0..2 {
            for feature in 0..2 {
                let prediction = current.item.get(item, 0) * current.item_photo.get(feature, 0);
                let error = math::logistic(prediction) - photos.get(item, feature);
                let photo_value = current.item_photo.get(feature, 0);
                expected_loss += 0.1 * error * error + 0.01 * photo_value * photo_value;
            }
        }

        assert!(close_enough_to(loss, expected_loss));
        assert!(gradients.item.get(0, 0) != 0.0);
        assert!(gradients.item.get(1, 0) != 0.0);
        assert!(gradients.item_photo.get(0, 0) != 0.0);
        assert!(gradients.item_photo.get(1, 0) != 0.0);
        assert_eq!(gradients.user.get(0, 0), 0.0);
    }

    #[test]
    fn descend() {
        let current = factors(&[1.0], &[1.0], &[1.0], &[1.0]);
        let gradients = factors(&[2.0], &[0.0], &[-2.0], &[10.0]);

        let next = current.descend(&gradients, 0.5);

        assert_eq!(next, factors(&[0.0], &[1.0], &[2.0], &[-4.0]));
    }
}
