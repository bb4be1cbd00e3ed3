use std::time::Instant;

use log::info;

pub mod config;
pub mod error;
pub mod io;
pub mod math;
pub mod photo;
pub mod signal;
pub mod stats;
pub mod trainer;
pub mod types;

pub use crate::config::{Properties, TrainerConfig};
pub use crate::error::{Error, Result};
pub use crate::signal::Factors;
pub use crate::trainer::{EpochReport, StopReason, Trainer, TrainingSummary};

use crate::io::{RatingRecord, SocialRecord};
use crate::stats::DataDictionary;

/// Learned factors together with the dictionary to map raw ids to their rows.
pub struct Model {
    pub data_dict: DataDictionary,
    pub factors: Factors,
    pub summary: TrainingSummary,
}

/// Builds the id dictionary and input matrices, reads the photo features (if a photo path is
/// configured) and trains all factors.
pub fn fit(
    ratings: &[RatingRecord],
    links: &[SocialRecord],
    properties: &Properties,
) -> Result<Model> {

    let config = TrainerConfig::from_properties(properties)?;

    let data_dict = DataDictionary::from_ratings(ratings);

    info!("Found {} ratings between {} users and {} items, {} social links",
        data_dict.num_ratings(), data_dict.num_users(), data_dict.num_items(), links.len());

    let rating_matrix = io::rating_matrix(ratings, &data_dict)?;
    let social_matrix = io::social_matrix(links, &data_dict)?;
    let photo_matrix = photo::read_photo_features(properties, &data_dict, config.feature_dimension)?;

    let training_start = Instant::now();

    let mut trainer =
        Trainer::setup(&config, &rating_matrix, &social_matrix, photo_matrix.as_ref())?;
    let summary = trainer.train()?;

    info!("{} epochs, {}ms training time, stopped with {:?}",
        summary.epochs.len(), training_start.elapsed().as_millis(), summary.stop_reason);

    Ok(Model { data_dict, factors: trainer.into_factors(), summary })
}
