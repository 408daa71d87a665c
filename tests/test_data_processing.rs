//! Integration tests for data processing: loading, schema checks, and feature transforms

mod common;

use kolosal_pipeline::data;
use kolosal_pipeline::feature_engineering::{FeatureTransform, FittedTransform};
use kolosal_pipeline::prelude::*;

fn taxi_schema() -> Schema {
    kolosal_pipeline::cli::tasks::taxi_fare_config()
        .unwrap()
        .schema
}

fn sentiment_schema() -> Schema {
    Schema::new(vec![
        Column::boolean("Label", 0),
        Column::text("SentimentText", 1),
    ])
    .unwrap()
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_load_taxi_csv() {
    let file = common::taxi_csv(25, 0);
    let dataset = DatasetLoader::new(taxi_schema())
        .with_format(TextFormat::csv())
        .load(file.path())
        .unwrap();

    assert_eq!(dataset.len(), 25);
    let first = &dataset.rows()[0];
    assert_eq!(first.get("VendorId"), Some(&Value::Text("CMT".to_string())));
    assert_eq!(first.get("TripDistance"), Some(&Value::Number(0.5)));
    assert_eq!(first.get("RateCode"), Some(&Value::Text("1".to_string())));
}

#[test]
fn test_free_load_function() {
    let file = common::write_file(
        ".tsv",
        None,
        &["1\tyou are rude".to_string(), "0\tthanks".to_string()],
    );
    let dataset = data::load(file.path(), &sentiment_schema(), '\t', false).unwrap();
    assert_eq!(dataset.len(), 2);
    assert_eq!(dataset.rows()[0].get("Label"), Some(&Value::Bool(true)));
}

#[test]
fn test_load_skips_blank_lines_and_crlf() {
    let file = common::write_file(
        ".tsv",
        Some("Sentiment\tSentimentText"),
        &[
            "1\tgo away\r".to_string(),
            String::new(),
            "0\tnice work\r".to_string(),
        ],
    );
    let dataset = DatasetLoader::new(sentiment_schema())
        .with_format(TextFormat::tsv())
        .load(file.path())
        .unwrap();

    assert_eq!(dataset.len(), 2);
    assert_eq!(
        dataset.rows()[1].get("SentimentText"),
        Some(&Value::Text("nice work".to_string()))
    );
}

#[test]
fn test_quoted_field_keeps_delimiter() {
    let file = common::write_file(
        ".csv",
        None,
        &["1,\"rude, and loud\"".to_string()],
    );
    let dataset = DatasetLoader::new(sentiment_schema())
        .with_delimiter(',')
        .with_header(false)
        .load(file.path())
        .unwrap();
    assert_eq!(
        dataset.rows()[0].get("SentimentText"),
        Some(&Value::Text("rude, and loud".to_string()))
    );
}

#[test]
fn test_parse_error_reports_row_and_column() {
    let mut lines = common::taxi_lines(3, 0);
    lines[2] = "VTS,1,1,abc,2.0,CRD,9.5".to_string();
    let file = common::write_file(".csv", Some(common::TAXI_HEADER), &lines);

    let err = DatasetLoader::new(taxi_schema())
        .load(file.path())
        .unwrap_err();
    match err {
        KolosalError::ParseError { row, column, value, .. } => {
            assert_eq!(row, 2);
            assert_eq!(column, "TripTime");
            assert_eq!(value, "abc");
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn test_quoted_field_across_lines() {
    let file = common::write_file(
        ".tsv",
        Some("Sentiment\tSentimentText"),
        &["1\t\"rude\nand loud\"".to_string(), "0\tthanks".to_string()],
    );
    let dataset = DatasetLoader::new(sentiment_schema())
        .with_format(TextFormat::tsv())
        .load(file.path())
        .unwrap();

    assert_eq!(dataset.len(), 2);
    assert_eq!(
        dataset.rows()[0].get("SentimentText"),
        Some(&Value::Text("rude\nand loud".to_string()))
    );
    assert_eq!(dataset.rows()[1].get("Label"), Some(&Value::Bool(false)));
}

#[test]
fn test_non_finite_fare_rejected() {
    let mut lines = common::taxi_lines(10, 0);
    lines[5] = "VTS,1,1,600,2.0,CRD,NaN".to_string();
    let file = common::write_file(".csv", Some(common::TAXI_HEADER), &lines);

    let config = kolosal_pipeline::cli::tasks::taxi_fare_config().unwrap();
    match lifecycle::train(file.path(), &config).unwrap_err() {
        KolosalError::ParseError { row, column, value, .. } => {
            assert_eq!(row, 5);
            assert_eq!(column, "FareAmount");
            assert_eq!(value, "NaN");
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn test_non_finite_record_rejected_at_predict() {
    let file = common::taxi_csv(30, 0);
    let config = kolosal_pipeline::cli::tasks::taxi_fare_config().unwrap();
    let model = lifecycle::train(file.path(), &config).unwrap();

    let mut trip = common_trip();
    trip.insert("TripDistance", f64::INFINITY);
    assert!(matches!(
        model.predict(&trip).unwrap_err(),
        KolosalError::SchemaMismatch(_)
    ));
}

#[test]
fn test_short_row_is_schema_mismatch() {
    let file = common::write_file(".csv", None, &["VTS,1,1".to_string()]);
    let err = DatasetLoader::new(taxi_schema())
        .with_header(false)
        .load(file.path())
        .unwrap_err();
    assert!(matches!(err, KolosalError::SchemaMismatch(_)));
}

#[test]
fn test_missing_dataset_is_dataset_io() {
    let err = DatasetLoader::new(taxi_schema())
        .load("/definitely/not/here.csv")
        .unwrap_err();
    assert!(matches!(err, KolosalError::DatasetIo { .. }));
}

#[test]
fn test_header_only_loads_zero_rows() {
    let file = common::write_file(".csv", Some(common::TAXI_HEADER), &[]);
    let dataset = DatasetLoader::new(taxi_schema()).load(file.path()).unwrap();
    assert!(dataset.is_empty());
}

// ============================================================================
// Transforms over loaded rows
// ============================================================================

#[test]
fn test_one_hot_over_loaded_rows() {
    let file = common::taxi_csv(10, 0);
    let dataset = DatasetLoader::new(taxi_schema()).load(file.path()).unwrap();

    let encoder = CategoricalEncoder::new("PaymentType", "PaymentTypeEncoded");
    let fitted = encoder.fit(dataset.rows()).unwrap();
    assert_eq!(fitted.categories(), &["CRD".to_string(), "CSH".to_string()]);

    let mut row = dataset.rows()[1].clone();
    fitted.apply(&mut row).unwrap();
    assert_eq!(
        row.get("PaymentTypeEncoded"),
        Some(&Value::Vector(vec![0.0, 1.0]))
    );
}

#[test]
fn test_reject_policy_refuses_unseen_category() {
    let file = common::taxi_csv(10, 0);
    let dataset = DatasetLoader::new(taxi_schema()).load(file.path()).unwrap();

    let fitted = CategoricalEncoder::new("VendorId", "VendorIdEncoded")
        .with_oov_policy(OovPolicy::Reject)
        .fit(dataset.rows())
        .unwrap();
    let mut row = Row::new().with("VendorId", "XYZ");
    let err = fitted.apply(&mut row).unwrap_err();
    assert!(matches!(err, KolosalError::UnknownCategory { .. }));
}

#[test]
fn test_text_featurizer_over_loaded_rows() {
    let file = common::sentiment_tsv(20);
    let dataset = DatasetLoader::new(sentiment_schema())
        .with_format(TextFormat::tsv())
        .load(file.path())
        .unwrap();

    let fitted = TextFeaturizer::new("SentimentText", "Features")
        .with_max_features(50)
        .fit(dataset.rows())
        .unwrap();
    assert!(fitted.vocabulary_size() <= 50);
    assert!(fitted.feature_names().contains(&"rude".to_string()));

    let mut row = dataset.rows()[0].clone();
    fitted.apply(&mut row).unwrap();
    let vector = row.get("Features").and_then(Value::as_vector).unwrap();
    let norm: f64 = vector.iter().map(|v| v * v).sum::<f64>().sqrt();
    assert!((norm - 1.0).abs() < 1e-9);
}

#[test]
fn test_concatenation_width_matches_parts() {
    let file = common::taxi_csv(30, 0);
    let config = kolosal_pipeline::cli::tasks::taxi_fare_config().unwrap();
    let model = lifecycle::train(file.path(), &config).unwrap();

    // two vendors, one rate code, three numerics, two payment types
    assert_eq!(model.num_features(), 2 + 1 + 3 + 2);
    let features = model.transform(&common_trip()).unwrap();
    assert_eq!(features.len(), model.num_features());
    assert_eq!(&features[2..6], &[1.0, 1.0, 1140.0, 3.75]);
}

fn common_trip() -> Row {
    Row::new()
        .with("VendorId", "VTS")
        .with("RateCode", "1")
        .with("PassengerCount", 1.0)
        .with("TripTime", 1140.0)
        .with("TripDistance", 3.75)
        .with("PaymentType", "CRD")
}

#[test]
fn test_transform_missing_input_is_schema_mismatch() {
    let file = common::taxi_csv(30, 0);
    let config = kolosal_pipeline::cli::tasks::taxi_fare_config().unwrap();
    let model = lifecycle::train(file.path(), &config).unwrap();

    let partial = Row::new().with("VendorId", "VTS");
    let err = model.predict(&partial).unwrap_err();
    assert!(matches!(err, KolosalError::SchemaMismatch(_)));
}

// ============================================================================
// Pipeline declarations
// ============================================================================

#[test]
fn test_pipeline_rejects_unknown_transform_input() {
    let config = PipelineConfig::new(sentiment_schema(), TrainerConfig::binary_classifier())
        .with_transform(TextFeaturizer::new("Comment", "Features"));
    assert!(matches!(
        config.build().unwrap_err(),
        KolosalError::SchemaMismatch(_)
    ));
}

#[test]
fn test_pipeline_rejects_wrong_label_kind() {
    // Regression over a boolean label
    let config = PipelineConfig::new(sentiment_schema(), TrainerConfig::regressor())
        .with_transform(TextFeaturizer::new("SentimentText", "Features"));
    assert!(matches!(
        config.build().unwrap_err(),
        KolosalError::LabelTypeMismatch { .. }
    ));
}

#[test]
fn test_fit_rejects_constant_label() {
    let lines: Vec<String> = (0..20).map(|i| format!("1\tcomment number {i}")).collect();
    let file = common::write_file(".tsv", None, &lines);
    let config = PipelineConfig::new(sentiment_schema(), TrainerConfig::binary_classifier())
        .with_format(TextFormat::tsv().with_header(false))
        .with_transform(TextFeaturizer::new("SentimentText", "Features"));

    let err = lifecycle::train(file.path(), &config).unwrap_err();
    assert!(matches!(err, KolosalError::ConstantLabel(_)));
}

#[test]
fn test_config_json_roundtrip_keeps_steps() {
    let config = kolosal_pipeline::cli::tasks::taxi_fare_config().unwrap();
    let json = config.to_json_string().unwrap();
    assert!(json.contains("\"OneHot\""));
    assert!(json.contains("\"Concatenate\""));

    let parsed = PipelineConfig::from_json_str(&json).unwrap();
    assert_eq!(parsed.transforms.len(), 5);
    assert_eq!(parsed, config);
}

#[test]
fn test_config_json_garbage_is_config_error() {
    let err = PipelineConfig::from_json_str("{ not json").unwrap_err();
    assert!(matches!(err, KolosalError::ConfigError(_)));
}
