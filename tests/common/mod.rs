//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::io::Write;
use tempfile::NamedTempFile;

pub const TAXI_HEADER: &str =
    "vendor_id,rate_code,passenger_count,trip_time_in_secs,trip_distance,payment_type,fare_amount";

/// Fare as a smooth function of distance and time, plus a small vendor effect
pub fn taxi_fare(vendor: &str, time: f64, distance: f64) -> f64 {
    let vendor_effect = if vendor == "CMT" { 0.3 } else { 0.0 };
    2.5 + 2.5 * distance + 0.0028 * time + vendor_effect
}

/// `n` taxi rows on a distance/time grid (distance 0.5..10 miles, time 120..2970 s)
pub fn taxi_lines(n: usize, offset: usize) -> Vec<String> {
    (offset..offset + n)
        .map(|i| {
            let distance = 0.5 + (i % 20) as f64 * 0.5;
            let time = 120.0 + ((i / 20) % 20) as f64 * 150.0;
            let vendor = if i % 3 == 0 { "CMT" } else { "VTS" };
            let payment = if i % 2 == 0 { "CRD" } else { "CSH" };
            let passengers = 1 + i % 4;
            format!(
                "{},1,{},{},{},{},{:.2}",
                vendor,
                passengers,
                time,
                distance,
                payment,
                taxi_fare(vendor, time, distance)
            )
        })
        .collect()
}

pub fn write_file(suffix: &str, header: Option<&str>, lines: &[String]) -> NamedTempFile {
    let mut file = NamedTempFile::with_suffix(suffix).unwrap();
    if let Some(header) = header {
        writeln!(file, "{}", header).unwrap();
    }
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file.flush().unwrap();
    file
}

pub fn taxi_csv(n: usize, offset: usize) -> NamedTempFile {
    write_file(".csv", Some(TAXI_HEADER), &taxi_lines(n, offset))
}

const TOXIC: [&str; 5] = ["idiot", "stupid", "awful", "pathetic", "clueless"];
const KIND: [&str; 5] = ["helpful", "careful", "thoughtful", "patient", "generous"];

/// Balanced toxicity corpus. Toxic comments always say "rude"; friendly ones
/// always mention "the best" and the article.
pub fn sentiment_lines(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| {
            let word = i / 2;
            if i % 2 == 0 {
                format!(
                    "1\tthis {} edit is rude and {}",
                    TOXIC[word % 5],
                    TOXIC[(word + 2) % 5]
                )
            } else {
                format!(
                    "0\the is the best {} editor, the article is {}",
                    KIND[word % 5],
                    KIND[(word + 3) % 5]
                )
            }
        })
        .collect()
}

pub fn sentiment_tsv(n: usize) -> NamedTempFile {
    write_file(".tsv", Some("Sentiment\tSentimentText"), &sentiment_lines(n))
}
