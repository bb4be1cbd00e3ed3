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

use fnv::FnvHashMap;
use rand::Rng;

use crate::error::{Error, Result};

pub type DenseVector = Vec<u32>;

pub fn new_dense_vector(dimensions: usize) -> DenseVector {
    vec![0; dimensions]
}

/// Row-major dense matrix of doubles.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseMatrix {
    num_rows: usize,
    num_columns: usize,
    data: Vec<f64>,
}

impl DenseMatrix {

    /// Creates a matrix filled with zeros.
    pub fn new(num_rows: usize, num_columns: usize) -> Self {
        DenseMatrix { num_rows, num_columns, data: vec![0.0; num_rows * num_columns] }
    }

    /// Creates a matrix with entries drawn uniformly from `[0, range)`, consuming the random
    /// number generator in row-major order.
    pub fn random<R: Rng>(num_rows: usize, num_columns: usize, range: f64, rng: &mut R) -> Self {
        let data = (0..num_rows * num_columns)
            .map(|_| rng.gen::<f64>() * range)
            .collect();

        DenseMatrix { num_rows, num_columns, data }
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    #[inline(always)]
    pub fn get(&self, row: usize, column: usize) -> f64 {
        self.data[row * self.num_columns + column]
    }

    #[inline(always)]
    pub fn set(&mut self, row: usize, column: usize, value: f64) {
        self.data[row * self.num_columns + column] = value;
    }

    /// Accumulates `delta` into a single entry.
    #[inline(always)]
    pub fn add_at(&mut self, row: usize, column: usize, delta: f64) {
        self.data[row * self.num_columns + column] += delta;
    }

    #[inline(always)]
    pub fn row(&self, row: usize) -> &[f64] {
        let start = row * self.num_columns;
        &self.data[start..start + self.num_columns]
    }

    /// Overwrites a full row.
    pub fn set_row(&mut self, row: usize, values: &[f64]) -> Result<()> {
        if row >= self.num_rows || values.len() != self.num_columns {
            return Err(Error::DimensionMismatch(format!(
                "cannot set row {} of length {} in a {}x{} matrix",
                row, values.len(), self.num_rows, self.num_columns)));
        }

        let start = row * self.num_columns;
        self.data[start..start + self.num_columns].copy_from_slice(values);

        Ok(())
    }

    /// Returns a new matrix holding `self * factor`.
    pub fn scale(&self, factor: f64) -> DenseMatrix {
        DenseMatrix {
            num_rows: self.num_rows,
            num_columns: self.num_columns,
            data: self.data.iter().map(|value| value * factor).collect(),
        }
    }

    /// Returns the elementwise sum of both matrices, which must have the same shape.
    pub fn add(&self, other: &DenseMatrix) -> DenseMatrix {
        assert_eq!((self.num_rows, self.num_columns), (other.num_rows, other.num_columns),
            "matrices of different shape cannot be added");

        DenseMatrix {
            num_rows: self.num_rows,
            num_columns: self.num_columns,
            data: self.data.iter().zip(other.data.iter()).map(|(a, b)| a + b).collect(),
        }
    }

    /// Dot product of row `row_a` of `a` and row `row_b` of `b`.
    #[inline(always)]
    pub fn row_dot(a: &DenseMatrix, row_a: usize, b: &DenseMatrix, row_b: usize) -> f64 {
        assert_eq!(a.num_columns, b.num_columns, "rows of different length");

        a.row(row_a).iter()
            .zip(b.row(row_b).iter())
            .map(|(x, y)| x * y)
            .sum()
    }
}

/// Immutable sparse matrix, stored as one column-sorted list of entries per row. Iteration
/// visits rows in ascending order and columns in ascending order within a row.
#[derive(Clone, Debug)]
pub struct SparseMatrix {
    rows: Vec<Vec<(u32, f64)>>,
    column_sizes: DenseVector,
    num_columns: usize,
    num_entries: usize,
}

impl SparseMatrix {

    /// Builds a matrix from `(row, column, value)` triples. Later duplicates overwrite earlier
    /// ones, exact zeros are not stored.
    pub fn from_entries<I>(num_rows: usize, num_columns: usize, entries: I) -> Result<Self>
        where I: IntoIterator<Item=(u32, u32, f64)> {

        let mut staged: Vec<FnvHashMap<u32, f64>> =
            vec![FnvHashMap::with_capacity_and_hasher(0, Default::default()); num_rows];

        for (row, column, value) in entries {
            if row as usize >= num_rows || column as usize >= num_columns {
                return Err(Error::DimensionMismatch(format!(
                    "entry ({}, {}) outside of a {}x{} matrix",
                    row, column, num_rows, num_columns)));
            }

            staged[row as usize].insert(column, value);
        }

        let mut column_sizes = new_dense_vector(num_columns);
        let mut num_entries = 0;

        let rows: Vec<Vec<(u32, f64)>> = staged.into_iter()
            .map(|row| {
                let mut entries: Vec<(u32, f64)> = row.into_iter().collect();
                entries.sort_unstable_by_key(|&(column, _)| column);

                for &(column, _) in entries.iter() {
                    column_sizes[column as usize] += 1;
                }
                num_entries += entries.len();

                entries
            })
            .collect();

        Ok(SparseMatrix { rows, column_sizes, num_columns, num_entries })
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.num_entries
    }

    pub fn is_empty(&self) -> bool {
        self.num_entries == 0
    }

    /// Number of stored entries in a row, the out-degree for adjacency matrices.
    pub fn row_size(&self, row: usize) -> usize {
        self.rows[row].len()
    }

    /// Number of stored entries in a column, the in-degree for adjacency matrices.
    pub fn column_size(&self, column: usize) -> usize {
        self.column_sizes[column] as usize
    }

    pub fn get(&self, row: usize, column: usize) -> Option<f64> {
        let entries = &self.rows[row];
        entries.binary_search_by_key(&(column as u32), |&(c, _)| c)
            .ok()
            .map(|index| entries[index].1)
    }

    pub fn iter<'a>(&'a self) -> impl Iterator<Item=(usize, usize, f64)> + 'a {
        self.rows.iter()
            .enumerate()
            .flat_map(|(row, entries)| {
                entries.iter().map(move |&(column, value)| (row, column as usize, value))
            })
    }
}

/// Sparse rating matrix together with the bounds of the rating scale.
#[derive(Clone, Debug)]
pub struct RatingMatrix {
    matrix: SparseMatrix,
    min_rate: f64,
    max_rate: f64,
}

impl RatingMatrix {

    /// Wraps the ratings, the scale bounds are taken from the smallest and largest rating.
    pub fn new(matrix: SparseMatrix) -> Self {
        let (min_rate, max_rate) = matrix.iter()
            .fold((std::f64::INFINITY, std::f64::NEG_INFINITY), |(min, max), (_, _, value)| {
                (min.min(value), max.max(value))
            });

        RatingMatrix { matrix, min_rate, max_rate }
    }

    /// Wraps the ratings using an explicitly known rating scale.
    pub fn with_bounds(matrix: SparseMatrix, min_rate: f64, max_rate: f64) -> Self {
        RatingMatrix { matrix, min_rate, max_rate }
    }

    pub fn matrix(&self) -> &SparseMatrix {
        &self.matrix
    }

    pub fn min_rate(&self) -> f64 {
        self.min_rate
    }

    pub fn max_rate(&self) -> f64 {
        self.max_rate
    }

    pub fn num_users(&self) -> usize {
        self.matrix.num_rows()
    }

    pub fn num_items(&self) -> usize {
        self.matrix.num_columns()
    }
}
