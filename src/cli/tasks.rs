//! Built-in demo tasks, registered at compile time

use crate::data::{Column, Row, Schema, TextFormat};
use crate::error::Result;
use crate::feature_engineering::{CategoricalEncoder, ColumnConcatenator, ColumnCopier, TextFeaturizer};
use crate::pipeline::PipelineConfig;
use crate::training::{BoostingConfig, TrainerConfig};

/// A named pipeline with a few records to score after training
pub struct Task {
    pub name: &'static str,
    pub description: &'static str,
    pub config: fn() -> Result<PipelineConfig>,
    pub samples: fn() -> Vec<Row>,
}

pub static TASKS: &[Task] = &[
    Task {
        name: "sentiment",
        description: "Binary toxicity classifier over Wikipedia talk-page comments (TSV)",
        config: sentiment_config,
        samples: sentiment_samples,
    },
    Task {
        name: "taxi-fare",
        description: "Taxi fare regression from trip attributes (CSV)",
        config: taxi_fare_config,
        samples: taxi_fare_samples,
    },
];

pub fn find(name: &str) -> Option<&'static Task> {
    TASKS.iter().find(|t| t.name == name)
}

pub fn sentiment_config() -> Result<PipelineConfig> {
    let schema = Schema::new(vec![
        Column::boolean("Label", 0),
        Column::text("SentimentText", 1),
    ])?;
    let trainer = TrainerConfig::binary_classifier().with_params(
        BoostingConfig::default()
            .with_num_trees(50)
            .with_num_leaves(50)
            .with_min_datapoints_in_leaf(20),
    );
    Ok(PipelineConfig::new(schema, trainer)
        .with_format(TextFormat::tsv())
        .with_transform(TextFeaturizer::new("SentimentText", "Features")))
}

fn sentiment_samples() -> Vec<Row> {
    vec![
        Row::new().with("SentimentText", "This is a very rude movie"),
        Row::new().with(
            "SentimentText",
            "He is the best, and the article should say that.",
        ),
    ]
}

pub fn taxi_fare_config() -> Result<PipelineConfig> {
    let schema = Schema::new(vec![
        Column::categorical("VendorId", 0),
        Column::categorical("RateCode", 1),
        Column::numeric("PassengerCount", 2),
        Column::numeric("TripTime", 3),
        Column::numeric("TripDistance", 4),
        Column::categorical("PaymentType", 5),
        Column::numeric("FareAmount", 6),
    ])?;
    Ok(PipelineConfig::new(schema, TrainerConfig::regressor())
        .with_format(TextFormat::csv())
        .with_transform(ColumnCopier::new("FareAmount", "Label"))
        .with_transform(CategoricalEncoder::new("VendorId", "VendorIdEncoded"))
        .with_transform(CategoricalEncoder::new("RateCode", "RateCodeEncoded"))
        .with_transform(CategoricalEncoder::new("PaymentType", "PaymentTypeEncoded"))
        .with_transform(ColumnConcatenator::new(
            &[
                "VendorIdEncoded",
                "RateCodeEncoded",
                "PassengerCount",
                "TripTime",
                "TripDistance",
                "PaymentTypeEncoded",
            ],
            "Features",
        )))
}

fn taxi_fare_samples() -> Vec<Row> {
    vec![Row::new()
        .with("VendorId", "VTS")
        .with("RateCode", "1")
        .with("PassengerCount", 1.0)
        .with("TripTime", 1140.0)
        .with("TripDistance", 3.75)
        .with("PaymentType", "CRD")]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_names_unique() {
        let mut names: Vec<&str> = TASKS.iter().map(|t| t.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), TASKS.len());
    }

    #[test]
    fn test_every_task_builds() {
        for task in TASKS {
            let config = (task.config)().unwrap();
            let pipeline = config.build().unwrap();
            for sample in (task.samples)() {
                for column in pipeline.feature_inputs() {
                    assert!(sample.contains(column), "{} sample lacks {}", task.name, column);
                }
            }
        }
    }

    #[test]
    fn test_find() {
        assert!(find("taxi-fare").is_some());
        assert!(find("nope").is_none());
    }
}
