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

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can abort ingestion or training.
#[derive(Error, Debug)]
pub enum Error {
    /// A required option is missing or has an invalid value.
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// A photo feature line for a known item could not be parsed.
    #[error("Parse error in {}:{}: {}", .path.display(), .line, .message)]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    /// The loss became NaN or infinite.
    #[error("Training diverged in epoch {epoch}, loss = {loss}")]
    Divergence { epoch: usize, loss: f64 },
}

pub type Result<T> = std::result::Result<T, Error>;
