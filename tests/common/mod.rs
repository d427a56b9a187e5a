//! Shared fixtures for integration tests

#![allow(dead_code)]

use credit_score_ml::data::{Dataset, Observation, Schema};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::fmt::Write as _;

/// Rows whose label follows V1; the other ratios are unrelated noise
pub fn separable(n: usize) -> Dataset {
    let rows = (0..n)
        .map(|i| {
            let label = i % 2 == 0;
            let mut ratios: Vec<f64> = (0..13)
                .map(|j| ((i * 37 + j * 11) % 17) as f64 / 17.0)
                .collect();
            ratios[0] = if label { 0.8 } else { 0.2 } + (i % 5) as f64 * 0.01;
            let cnae = ["4711", "6201", "4120"][i % 3];
            Observation::new(ratios, cnae, label)
        })
        .collect();
    Dataset::new(Schema::credit_scoring(), rows)
}

/// The same rows rendered as CSV with a header line
pub fn to_csv(data: &Dataset, delimiter: char) -> String {
    let schema = data.schema();
    let header: Vec<&str> = schema.columns().iter().map(|c| c.name.as_str()).collect();
    let mut out = header.join(&delimiter.to_string());
    out.push('\n');
    for obs in data.observations() {
        for v in &obs.ratios {
            if v.is_nan() {
                write!(out, "?{}", delimiter).unwrap();
            } else {
                write!(out, "{}{}", v, delimiter).unwrap();
            }
        }
        writeln!(out, "{}{}{}", obs.cnae, delimiter, u8::from(obs.label)).unwrap();
    }
    out
}

/// Seeded random ratios with balanced labels and CNAE in {A, B}
pub fn random_balanced(n: usize, seed: u64) -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut labels: Vec<bool> = (0..n).map(|i| i < n / 2).collect();
    labels.shuffle(&mut rng);

    let rows = labels
        .into_iter()
        .map(|label| {
            let ratios = (0..13).map(|_| rng.gen_range(-1.0..1.0)).collect();
            let cnae = if rng.gen_bool(0.5) { "A" } else { "B" };
            Observation::new(ratios, cnae, label)
        })
        .collect();
    Dataset::new(Schema::credit_scoring(), rows)
}

/// `separable` with V2 pushed to the edges of the f64 range on some rows
pub fn with_extreme_ratios(n: usize) -> Dataset {
    let base = separable(n);
    let rows = base
        .observations()
        .iter()
        .enumerate()
        .map(|(i, obs)| {
            let mut obs = obs.clone();
            match i % 4 {
                0 => obs.ratios[1] = 1.7e308,
                1 => obs.ratios[1] = -1.7e308,
                _ => {}
            }
            obs
        })
        .collect();
    Dataset::new(Schema::credit_scoring(), rows)
}
