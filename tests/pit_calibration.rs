//! Calibration tests for PIT histograms.
//!
//! Observations drawn from each forecast's own predictive distribution
//! must give an approximately uniform histogram; biased or overconfident
//! forecasts must not.

use quantile_ensembles::core::{ForecastKey, Observation, Observations, SampleForecast};
use quantile_ensembles::scoring::{pit_histogram, pit_uniformity, PitConfig, ScoreField};
use rand::prelude::*;
use statrs::distribution::{ContinuousCDF, Normal};

const N_TARGETS: i64 = 2000;
const N_DRAWS: usize = 500;

/// One forecast per target day for `model`, with observations drawn from
/// `truth_sd`-scaled noise around each forecast's centre.
fn calibration_set(
    model: &str,
    forecast_sd: f64,
    truth_shift: f64,
    truth_sd: f64,
    seed: u64,
) -> (Vec<SampleForecast>, Observations) {
    let mut rng = StdRng::seed_from_u64(seed);
    let forecast_dist = Normal::new(0.0, forecast_sd).unwrap();
    let truth_dist = Normal::new(truth_shift, truth_sd).unwrap();

    let mut forecasts = Vec::new();
    let mut observations = Vec::new();
    for target_day in 1..=N_TARGETS {
        let centre = 50.0 + 10.0 * (target_day as f64 / 30.0).sin();
        let draws = (0..N_DRAWS)
            .map(|_| centre + forecast_dist.inverse_cdf(rng.gen_range(1e-9..1.0 - 1e-9)))
            .collect();
        let key = ForecastKey::new(model, target_day - 1, target_day).unwrap();
        forecasts.push(SampleForecast::from_values(key, draws).unwrap());
        observations.push(Observation {
            day: target_day,
            value: centre + truth_dist.inverse_cdf(rng.gen_range(1e-9..1.0 - 1e-9)),
        });
    }
    (forecasts, Observations::new(observations).unwrap())
}

#[test]
fn calibrated_forecasts_give_uniform_pit() {
    let (forecasts, obs) = calibration_set("calibrated", 4.0, 0.0, 4.0, 11);
    let hist = pit_histogram(&forecasts, &obs, &PitConfig::new(10).with_seed(5)).unwrap();

    assert_eq!(hist.len(), 1);
    assert_eq!(hist[0].n, N_TARGETS as usize);
    for bin in &hist[0].bins {
        assert!(
            (bin.density - 1.0).abs() < 0.25,
            "bin {} has density {}",
            bin.mid,
            bin.density
        );
    }

    let test = pit_uniformity(&hist[0]).unwrap();
    assert!(test.p_value > 1e-4, "p-value {}", test.p_value);
}

#[test]
fn overconfident_forecasts_give_u_shape() {
    let (forecasts, obs) = calibration_set("narrow", 1.0, 0.0, 4.0, 12);
    let hist = pit_histogram(&forecasts, &obs, &PitConfig::new(10).with_seed(5)).unwrap();

    let bins = &hist[0].bins;
    assert!(bins[0].density > 2.0 && bins[9].density > 2.0);
    assert!(bins[4].density < 0.5 && bins[5].density < 0.5);
    assert!(pit_uniformity(&hist[0]).unwrap().p_value < 1e-6);
}

#[test]
fn biased_forecasts_give_skewed_pit() {
    // observations systematically above the forecasts pile up in the top bins
    let (forecasts, obs) = calibration_set("low", 4.0, 4.0, 4.0, 13);
    let hist = pit_histogram(&forecasts, &obs, &PitConfig::new(5).with_seed(5)).unwrap();

    let bins = &hist[0].bins;
    assert!(bins[4].count > 3 * bins[0].count);
}

#[test]
fn histograms_per_model() {
    let (mut forecasts, obs) = calibration_set("a", 4.0, 0.0, 4.0, 21);
    let (other, _) = calibration_set("b", 4.0, 0.0, 4.0, 22);
    forecasts.extend(other);

    let config = PitConfig::new(4)
        .with_group_by(vec![ScoreField::Model])
        .with_seed(1);
    let hist = pit_histogram(&forecasts, &obs, &config).unwrap();
    assert_eq!(hist.len(), 2);
    assert!(hist.iter().all(|h| h.n == N_TARGETS as usize));

    let pooled = pit_histogram(&forecasts, &obs, &config.clone().with_group_by(vec![])).unwrap();
    assert_eq!(pooled.len(), 1);
    assert_eq!(pooled[0].n, 2 * N_TARGETS as usize);
}
