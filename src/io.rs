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

use std::fs::File;
use std::io::prelude::*;
use std::io::stdout;
use std::path::Path;

use log::{debug, info};
use serde_derive::Deserialize;

use crate::error::Result;
use crate::stats::DataDictionary;
use crate::trainer::EpochReport;
use crate::types::{RatingMatrix, SparseMatrix};

/// A single line of the rating file.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct RatingRecord {
    pub user: String,
    pub item: String,
    pub rating: f64,
}

/// A single line of the social file, `user` trusts `trusted_user` with the given strength.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct SocialRecord {
    pub user: String,
    pub trusted_user: String,
    pub strength: f64,
}

/// Creates a reader for tab separated input without headers.
pub fn tsv_reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .from_reader(input)
}

pub fn read_ratings<R: Read>(input: R) -> Result<Vec<RatingRecord>> {
    let mut reader = tsv_reader(input);
    let mut ratings = Vec::new();

    for record in reader.deserialize() {
        ratings.push(record?);
    }

    Ok(ratings)
}

pub fn read_social<R: Read>(input: R) -> Result<Vec<SocialRecord>> {
    let mut reader = tsv_reader(input);
    let mut links = Vec::new();

    for record in reader.deserialize() {
        links.push(record?);
    }

    Ok(links)
}

pub fn read_ratings_file<P: AsRef<Path>>(path: P) -> Result<Vec<RatingRecord>> {
    read_ratings(File::open(path)?)
}

pub fn read_social_file<P: AsRef<Path>>(path: P) -> Result<Vec<SocialRecord>> {
    read_social(File::open(path)?)
}

/// Builds the rating matrix in inner indices. All users and items must be known to the
/// dictionary, which holds when it was built from the same records.
pub fn rating_matrix(ratings: &[RatingRecord], data_dict: &DataDictionary) -> Result<RatingMatrix> {

    let entries = ratings.iter()
        .filter_map(|record| {
            match (data_dict.user_index(&record.user), data_dict.item_index(&record.item)) {
                (Some(user), Some(item)) => Some((user, item, record.rating)),
                _ => None,
            }
        });

    let matrix = SparseMatrix::from_entries(data_dict.num_users(), data_dict.num_items(), entries)?;

    Ok(RatingMatrix::new(matrix))
}

/// Builds the square user by user trust matrix. Links between users which never rated
/// anything are skipped.
pub fn social_matrix(links: &[SocialRecord], data_dict: &DataDictionary) -> Result<SparseMatrix> {

    let num_users = data_dict.num_users();
    let mut num_skipped = 0;

    let mut entries = Vec::with_capacity(links.len());

    for link in links.iter() {
        match (data_dict.user_index(&link.user), data_dict.user_index(&link.trusted_user)) {
            (Some(user), Some(trusted_user)) => entries.push((user, trusted_user, link.strength)),
            _ => {
                debug!("Skipping link {} -> {} with unknown user", link.user, link.trusted_user);
                num_skipped += 1;
            }
        }
    }

    if num_skipped > 0 {
        info!("Skipped {} of {} social links between unknown users", num_skipped, links.len());
    }

    SparseMatrix::from_entries(num_users, num_users, entries)
}

/// Output one JSON line per epoch. If a `report_path` is supplied, we write to a file at the
/// specified path, otherwise, we output to stdout.
pub fn write_epoch_reports(reports: &[EpochReport], report_path: Option<String>) -> Result<()> {

    let mut out: Box<dyn Write> = match report_path {
        Some(path) => Box::new(File::create(&Path::new(&path))?),
        _ => Box::new(stdout())
    };

    for report in reports.iter() {
        writeln!(out, "{}", serde_json::to_string(report)?)?;
    }

    out.flush()?;

    Ok(())
}


#[cfg(test)]
mod tests {

    use crate::io;
    use crate::stats::DataDictionary;

    const RATINGS: &str = "alice\tcafe\t4\nbob\tmuseum\t2.5\nalice\tmuseum\t5\n";
    const SOCIAL: &str = "alice\tbob\t1\nbob\tdave\t1\nbob\talice\t0.5\n";

    #[test]
    fn read_tab_separated_ratings() {
        let ratings = io::read_ratings(RATINGS.as_bytes()).unwrap();

        assert_eq!(ratings.len(), 3);
        assert_eq!(ratings[1].user, "bob");
        assert_eq!(ratings[1].item, "museum");
        assert_eq!(ratings[1].rating, 2.5);
    }

    #[test]
    fn malformed_rating_is_an_error() {
        assert!(io::read_ratings("alice\tcafe\tgreat\n".as_bytes()).is_err());
    }

    #[test]
    fn matrices_in_inner_indices() {
        let ratings = io::read_ratings(RATINGS.as_bytes()).unwrap();
        let links = io::read_social(SOCIAL.as_bytes()).unwrap();

        let data_dict = DataDictionary::from_ratings(&ratings);

        let rating_matrix = io::rating_matrix(&ratings, &data_dict).unwrap();
        assert_eq!(rating_matrix.num_users(), 2);
        assert_eq!(rating_matrix.num_items(), 2);
        assert_eq!(rating_matrix.min_rate(), 2.5);
        assert_eq!(rating_matrix.max_rate(), 5.0);
        assert_eq!(rating_matrix.matrix().get(0, 1), Some(5.0));

        // dave never rated anything, so bob -> dave is dropped
        let social_matrix = io::social_matrix(&links, &data_dict).unwrap();
        assert_eq!(social_matrix.num_rows(), 2);
        assert_eq!(social_matrix.num_columns(), 2);
        assert_eq!(social_matrix.len(), 2);
        assert_eq!(social_matrix.get(1, 0), Some(0.5));
    }

    #[test]
    fn zero_ratings_and_links_are_kept() {
        let ratings = io::read_ratings("alice\tcafe\t0\nbob\tcafe\t5\nalice\tmuseum\t3\n".as_bytes())
            .unwrap();
        let links = io::read_social("alice\tbob\t0\n".as_bytes()).unwrap();

        let data_dict = DataDictionary::from_ratings(&ratings);

        let rating_matrix = io::rating_matrix(&ratings, &data_dict).unwrap();
        assert_eq!(rating_matrix.matrix().len(), 3);
        assert_eq!(rating_matrix.min_rate(), 0.0);
        assert_eq!(rating_matrix.max_rate(), 5.0);
        assert_eq!(rating_matrix.matrix().get(0, 0), Some(0.0));

        let social_matrix = io::social_matrix(&links, &data_dict).unwrap();
        assert_eq!(social_matrix.len(), 1);
        assert_eq!(social_matrix.get(0, 1), Some(0.0));
        assert_eq!(social_matrix.row_size(0), 1);
        assert_eq!(social_matrix.column_size(1), 1);
    }
}
