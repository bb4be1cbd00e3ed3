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

/// Sigmoid function, maps a raw prediction into (0,1).
#[inline(always)]
pub fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Derivative of the sigmoid at `x`.
#[inline(always)]
pub fn logistic_gradient(x: f64) -> f64 {
    let y = logistic(x);
    y * (1.0 - y)
}

/// Min-max scaling of a rating into [0,1]. The caller guarantees `max > min`.
#[inline(always)]
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    (value - min) / (max - min)
}

/// Inverse of `normalize`, maps a value in [0,1] back onto the rating scale.
#[inline(always)]
pub fn denormalize(value: f64, min: f64, max: f64) -> f64 {
    min + value * (max - min)
}
