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

use std::fs;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::str;
use std::time::Instant;

use fnv::FnvHashMap;
use log::{debug, info};

use crate::config::{self, Properties};
use crate::error::{Error, Result};
use crate::stats::DataDictionary;
use crate::types::DenseMatrix;

/// Size of the read buffer for feature files.
pub const BUFFER_SIZE: usize = 1024 * 1024;

/// Resolves the root directory of the photo feature files from `dfs.data.dir` and
/// `data.appender.photo.path`. Returns `None` if no photo path is configured.
pub fn photo_root(properties: &Properties) -> Option<PathBuf> {
    let photo_path = properties.get(config::PHOTO_PATH)?;
    let data_dir = properties.get(config::DATA_DIR).unwrap_or("");

    Some(Path::new(data_dir).join(photo_path))
}

/// Reads the photo features of all items if a photo path is configured.
pub fn read_photo_features(
    properties: &Properties,
    data_dict: &DataDictionary,
    feature_dimension: usize,
) -> Result<Option<DenseMatrix>> {

    match photo_root(properties) {
        Some(root) => {
            let reader = PhotoFeatureReader::new(data_dict, feature_dimension);
            Ok(Some(reader.read(&root)?))
        },
        None => {
            info!("No photo path configured, training without photo features");
            Ok(None)
        }
    }
}

/// Streams `<item-id> <comma-separated-features>` lines from a tree of text files into a dense
/// item by feature matrix. Lines of unknown items are ignored.
pub struct PhotoFeatureReader<'a> {
    item_dict: &'a FnvHashMap<String, u32>,
    num_items: usize,
    feature_dimension: usize,
    buffer_size: usize,
}

impl<'a> PhotoFeatureReader<'a> {

    pub fn new(data_dict: &'a DataDictionary, feature_dimension: usize) -> Self {
        PhotoFeatureReader {
            item_dict: data_dict.item_dict(),
            num_items: data_dict.num_items(),
            feature_dimension,
            buffer_size: BUFFER_SIZE,
        }
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    /// Reads every regular file below `root` (or `root` itself if it is a file).
    pub fn read(&self, root: &Path) -> Result<DenseMatrix> {

        let start = Instant::now();

        let mut files = Vec::new();
        collect_files(root, &mut files)?;

        let mut photo_matrix = DenseMatrix::new(self.num_items, self.feature_dimension);
        let mut num_rows_written = 0;

        for file in files.iter() {
            num_rows_written += self.read_file(file, &mut photo_matrix)?;
        }

        info!("Read {} photo feature rows from {} files below {} in {}ms",
            num_rows_written, files.len(), root.display(), start.elapsed().as_millis());

        Ok(photo_matrix)
    }

    fn read_file(&self, path: &Path, photo_matrix: &mut DenseMatrix) -> Result<usize> {

        debug!("Reading photo features from {}", path.display());

        let mut file = File::open(path)?;
        let mut buffer = vec![0u8; self.buffer_size];

        // Bytes after the last line break seen so far, the read may have ended mid-line
        let mut carried: Vec<u8> = Vec::new();

        let mut line_number = 0;
        let mut num_rows_written = 0;

        loop {
            let len = match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(len) => len,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };

            carried.extend_from_slice(&buffer[..len]);

            if let Some(last_break) = carried.iter().rposition(|&byte| is_line_break(byte)) {
                let fragment = carried.split_off(last_break + 1);
                let complete = std::mem::replace(&mut carried, fragment);

                num_rows_written +=
                    self.parse_lines(path, &complete, &mut line_number, photo_matrix)?;
            }
        }

        // The file does not end with a line break
        if !carried.is_empty() {
            num_rows_written += self.parse_lines(path, &carried, &mut line_number, photo_matrix)?;
        }

        Ok(num_rows_written)
    }

    fn parse_lines(
        &self,
        path: &Path,
        bytes: &[u8],
        line_number: &mut usize,
        photo_matrix: &mut DenseMatrix,
    ) -> Result<usize> {

        let mut num_rows_written = 0;

        for line in bytes.split(|&byte| is_line_break(byte)).filter(|line| !line.is_empty()) {
            *line_number += 1;

            if self.parse_line(path, *line_number, line, photo_matrix)? {
                num_rows_written += 1;
            }
        }

        Ok(num_rows_written)
    }

    fn parse_line(
        &self,
        path: &Path,
        line_number: usize,
        line: &[u8],
        photo_matrix: &mut DenseMatrix,
    ) -> Result<bool> {

        let (item, rest) = split_first_token(line);

        // Ids that are not valid UTF-8 cannot be in the dictionary
        let row = match str::from_utf8(item).ok().and_then(|item| self.item_dict.get(item)) {
            Some(&row) => row as usize,
            None => return Ok(false),
        };

        let parse_error = |message: String| Error::Parse {
            path: path.to_path_buf(),
            line: line_number,
            message,
        };

        let rest = str::from_utf8(rest)
            .map_err(|e| parse_error(format!("feature vector is not valid UTF-8: {}", e)))?;

        let features = rest.split_ascii_whitespace().next()
            .ok_or_else(|| parse_error("missing feature vector".to_string()))?;

        let values = features.split(',')
            .map(|value| {
                value.trim().parse::<f64>()
                    .map_err(|e| parse_error(format!("invalid feature value '{}': {}", value, e)))
            })
            .collect::<Result<Vec<f64>>>()?;

        if values.len() != self.feature_dimension {
            return Err(parse_error(format!("expected {} features, found {}",
                self.feature_dimension, values.len())));
        }

        photo_matrix.set_row(row, &values)?;

        Ok(true)
    }
}

/// Splits off the first whitespace separated token, skipping leading whitespace.
fn split_first_token(line: &[u8]) -> (&[u8], &[u8]) {
    let start = line.iter().position(|byte| !byte.is_ascii_whitespace()).unwrap_or(line.len());
    let line = &line[start..];
    let end = line.iter().position(|byte| byte.is_ascii_whitespace()).unwrap_or(line.len());

    line.split_at(end)
}

#[inline(always)]
fn is_line_break(byte: u8) -> bool {
    byte == b'\n' || byte == b'\r'
}

/// Collects all regular files below `path` in sorted order, without following directory links.
fn collect_files(path: &Path, files: &mut Vec<PathBuf>) -> Result<()> {

    if fs::symlink_metadata(path)?.is_dir() {
        let mut entries = fs::read_dir(path)?
            .map(|entry| entry.map(|entry| entry.path()))
            .collect::<std::io::Result<Vec<PathBuf>>>()?;
        entries.sort();

        for entry in entries.iter() {
            collect_files(entry, files)?;
        }
    } else if fs::metadata(path)?.is_file() {
        files.push(path.to_path_buf());
    }

    Ok(())
}
