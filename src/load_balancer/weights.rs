//! Weight normalization.
//!
//! Raw weights are relative; selection works on percentages. Each weight becomes
//! `raw / sum * 100`, rounded to 2 decimal places, so the set sums to 100 within
//! `0.01 * n`.

use url::Url;

use crate::config::ConfigError;
use crate::load_balancer::backend::Backend;

/// Turn `(address, raw_weight)` pairs into backends carrying percentage weights.
///
/// Fails if the list is empty, if any weight is negative or not finite, or if
/// the weights do not add up to a positive total.
pub fn normalize_weights(entries: Vec<(Url, f64)>) -> Result<Vec<Backend>, ConfigError> {
    if entries.is_empty() {
        return Err(ConfigError::Weights("no backends configured".into()));
    }
    if let Some((url, weight)) = entries
        .iter()
        .find(|(_, w)| !w.is_finite() || *w < 0.0)
    {
        return Err(ConfigError::Weights(format!(
            "weight {weight} for {url} must be a non-negative number"
        )));
    }

    let total: f64 = entries.iter().map(|(_, w)| w).sum();
    if !total.is_finite() || total <= 0.0 {
        return Err(ConfigError::Weights(format!(
            "weights must sum to a positive number, got {total}"
        )));
    }

    Ok(entries
        .into_iter()
        .map(|(address, raw_weight)| Backend {
            address,
            raw_weight,
            weight: round2(raw_weight / total * 100.0),
        })
        .collect())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(weights: &[f64]) -> Vec<(Url, f64)> {
        weights
            .iter()
            .enumerate()
            .map(|(i, w)| (Url::parse(&format!("http://10.0.0.{}:80", i + 1)).unwrap(), *w))
            .collect()
    }

    fn weights_of(backends: &[Backend]) -> Vec<f64> {
        backends.iter().map(|b| b.weight).collect()
    }

    #[test]
    fn normalizes_to_percentages() {
        let backends = normalize_weights(entries(&[7.0, 3.0])).unwrap();
        assert_eq!(weights_of(&backends), vec![70.0, 30.0]);
        assert_eq!(backends[0].raw_weight, 7.0);
    }

    #[test]
    fn rounds_to_two_decimals() {
        let backends = normalize_weights(entries(&[1.0, 1.0, 1.0])).unwrap();
        assert_eq!(weights_of(&backends), vec![33.33, 33.33, 33.33]);

        let backends = normalize_weights(entries(&[2.0, 1.0])).unwrap();
        assert_eq!(weights_of(&backends), vec![66.67, 33.33]);
    }

    #[test]
    fn sums_to_one_hundred_within_rounding() {
        let configs: &[&[f64]] = &[
            &[1.0],
            &[1.0, 1.0, 1.0],
            &[70.0, 30.0],
            &[0.1, 0.2, 0.3, 0.4],
            &[3.0, 7.0, 11.0, 13.0, 17.0, 19.0],
            &[1.0, 0.0, 5.5],
            &[1e-3, 2e6],
        ];
        for weights in configs {
            let backends = normalize_weights(entries(weights)).unwrap();
            let sum: f64 = backends.iter().map(|b| b.weight).sum();
            let tolerance = 0.01 * weights.len() as f64 + 1e-9;
            assert!((sum - 100.0).abs() <= tolerance, "{weights:?} summed to {sum}");
        }
    }

    #[test]
    fn preserves_order() {
        let backends = normalize_weights(entries(&[1.0, 2.0, 3.0])).unwrap();
        let hosts: Vec<_> = backends.iter().map(|b| b.address.host_str().unwrap().to_string()).collect();
        assert_eq!(hosts, vec!["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
    }

    #[test]
    fn rejects_empty_and_non_positive_totals() {
        assert!(matches!(normalize_weights(Vec::new()), Err(ConfigError::Weights(_))));
        assert!(matches!(normalize_weights(entries(&[0.0, 0.0])), Err(ConfigError::Weights(_))));
        assert!(matches!(normalize_weights(entries(&[-1.0, 2.0])), Err(ConfigError::Weights(_))));
        assert!(matches!(normalize_weights(entries(&[f64::INFINITY])), Err(ConfigError::Weights(_))));
        assert!(matches!(normalize_weights(entries(&[f64::MAX, f64::MAX])), Err(ConfigError::Weights(_))));
    }
}
