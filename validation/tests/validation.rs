//! Snapshot validation scenarios.

use fxrate_common::{Currency, CurrencyPair, RateRecord};
use fxrate_validation::{
    InconsistencyKind, IssueKind, ValidationConfig, ValidationEngine, ValidationEvent,
    ValidationMetadata,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn quote(base: &str, quote: &str, rate: Decimal) -> RateRecord {
    RateRecord::new(CurrencyPair::new(base, quote), rate).with_providers(["ecb", "fed"])
}

fn seed_history(engine: &ValidationEngine, base: &str, quote_ccy: &str, points: usize) {
    for i in 0..points {
        let rate = if i % 2 == 0 { dec!(1.09) } else { dec!(1.11) };
        engine.validate_single_rate(&quote(base, quote_ccy, rate));
    }
}

#[test]
fn triangular_arbitrage_is_reported_in_basis_points() {
    let engine = ValidationEngine::default();
    let snapshot = vec![
        quote("USD", "EUR", dec!(0.90)),
        quote("EUR", "GBP", dec!(0.85)),
        quote("GBP", "USD", dec!(1.35)),
    ];

    let result = engine.validate_rates(&snapshot, &ValidationMetadata::default());

    assert_eq!(result.arbitrage.len(), 1);
    let opportunity = &result.arbitrage[0];
    assert_eq!(opportunity.product, dec!(1.03275));
    assert_eq!(opportunity.profit_bps.round(), dec!(328));
    assert!(opportunity.profit_bps > dec!(327) && opportunity.profit_bps < dec!(328));
    assert_eq!(opportunity.path[0], Currency::eur());

    // Three clean rates plus the capped arbitrage bonus.
    assert_eq!(result.quality_score, 100.0);
    assert_eq!(engine.validation_stats().arbitrage_opportunities, 1);
}

#[test]
fn sudden_jump_is_flagged_as_anomaly() {
    let engine = ValidationEngine::default();
    let mut events = engine.subscribe();
    seed_history(&engine, "EUR", "USD", 20);

    let result = engine.validate_single_rate(&quote("EUR", "USD", dec!(1.50)));

    let z = result.z_score.expect("history is long enough");
    assert!(z > 3.0);
    assert!(result.is_anomaly());
    assert!(result.has_issue(IssueKind::RangeDeviation));
    assert!(result.quality_score <= 70.0);
    assert!(!result.is_valid);

    let mut anomaly_seen = false;
    while let Ok(event) = events.try_recv() {
        if let ValidationEvent::AnomalyDetected { pair, z_score, .. } = event {
            assert_eq!(pair, CurrencyPair::new("EUR", "USD"));
            assert!(z_score > 3.0);
            anomaly_seen = true;
        }
    }
    assert!(anomaly_seen);
    assert_eq!(engine.validation_stats().anomalies_detected, 1);
}

#[test]
fn short_history_skips_anomaly_checks() {
    let engine = ValidationEngine::default();
    seed_history(&engine, "EUR", "USD", 5);

    let result = engine.validate_single_rate(&quote("EUR", "USD", dec!(1.50)));

    assert!(result.is_valid);
    assert!(result.z_score.is_none());
    assert!(result.has_issue(IssueKind::InsufficientHistory));
    assert_eq!(engine.history_len(&CurrencyPair::new("EUR", "USD")), 6);
}

#[test]
fn inverted_spread_is_rejected_with_hard_error() {
    let engine = ValidationEngine::default();
    let snapshot = vec![
        quote("USD", "CHF", dec!(1.02)).with_bid_ask(dec!(1.05), dec!(1.00)),
        quote("USD", "EUR", dec!(0.92)),
    ];

    let result = engine.validate_rates(&snapshot, &ValidationMetadata::default());

    let rejected: Vec<_> = result.rejected().collect();
    assert_eq!(rejected.len(), 1);
    assert!(rejected[0].has_errors());
    assert!(rejected[0].has_issue(IssueKind::InvertedSpread));
    assert_eq!(result.quality_score, 50.0);
    assert!(!result.is_valid);
    assert!(result
        .recommendations
        .iter()
        .any(|r| r.contains("below threshold")));
}

#[test]
fn low_quality_provider_decays_toward_its_quality() {
    let engine = ValidationEngine::default();
    let poor = || {
        RateRecord::new(CurrencyPair::new("USD", "TRY"), dec!(32.5))
            .with_bid_ask(dec!(31.0), dec!(34.0))
            .with_timestamp(chrono::Utc::now() - chrono::Duration::minutes(30))
            .with_providers(["slowfeed"])
    };

    let mut previous = engine.provider_score("slowfeed");
    for _ in 0..30 {
        let result = engine.validate_rates(&[poor()], &ValidationMetadata::default());
        let score = result.provider_scores["slowfeed"];
        assert!(score < previous);
        assert!(score > 0.65 - 1e-9);
        previous = score;
    }

    let state = engine.provider_reliability("slowfeed").unwrap();
    assert_eq!(state.assessments, 30);
    assert!(state.recent_quality.iter().all(|q| *q == 65.0));
}

#[test]
fn inverse_pairs_must_agree() {
    let engine = ValidationEngine::default();
    let snapshot = vec![
        quote("EUR", "USD", dec!(1.10)),
        quote("USD", "EUR", dec!(0.95)),
    ];

    let result = engine.validate_rates(&snapshot, &ValidationMetadata::default());

    assert_eq!(result.inconsistencies.len(), 1);
    assert_eq!(result.inconsistencies[0].kind, InconsistencyKind::Inverse);
    assert_eq!(result.quality_score, 90.0);
    assert!(result
        .recommendations
        .iter()
        .any(|r| r.contains("inconsistencies")));
}

#[test]
fn thresholds_come_from_config() {
    let config = ValidationConfig {
        max_spread_percent: 0.1,
        min_provider_count: 1,
        ..ValidationConfig::default()
    };
    let engine = ValidationEngine::new(config);
    let record = RateRecord::new(CurrencyPair::new("USD", "EUR"), dec!(0.92))
        .with_bid_ask(dec!(0.919), dec!(0.921))
        .with_providers(["ecb"]);

    let result = engine.validate_single_rate(&record);

    assert!(result.has_issue(IssueKind::WideSpread));
    assert!(!result.has_issue(IssueKind::InsufficientProviders));
    assert_eq!(result.quality_score, 90.0);
}

#[test]
fn completion_event_carries_the_aggregate() {
    let engine = ValidationEngine::default();
    let mut events = engine.subscribe();

    engine.validate_rates(&[quote("USD", "EUR", dec!(0.92))], &ValidationMetadata::default());

    match events.try_recv() {
        Ok(ValidationEvent::ValidationCompleted {
            quality_score,
            is_valid,
            rate_count,
            ..
        }) => {
            assert_eq!(quality_score, 100.0);
            assert!(is_valid);
            assert_eq!(rate_count, 1);
        }
        other => panic!("unexpected event: {:?}", other),
    }

    let stats = engine.validation_stats();
    assert_eq!(stats.validations, 1);
    assert_eq!(stats.tracked_pairs, 1);
    assert_eq!(stats.tracked_providers, 2);
    assert_eq!(stats.last_quality_score, Some(100.0));
}

#[test]
fn results_and_events_serialize_for_downstream_consumers() {
    let engine = ValidationEngine::default();
    let mut events = engine.subscribe();
    seed_history(&engine, "EUR", "USD", 20);
    while events.try_recv().is_ok() {}

    let result = engine.validate_rates(
        &[quote("EUR", "USD", dec!(1.50))],
        &ValidationMetadata {
            source: Some("poller".to_string()),
            ..Default::default()
        },
    );
    assert!(result.elapsed <= std::time::Duration::from_secs(5));

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["source"], "poller");
    assert_eq!(json["rates"][0]["pair"], serde_json::to_value(CurrencyPair::new("EUR", "USD")).unwrap());
    assert!(json.get("elapsed").is_some());

    let anomaly = events.try_recv().unwrap();
    let json = serde_json::to_value(&anomaly).unwrap();
    assert_eq!(json["type"], "anomaly_detected");
    assert!(json["z_score"].as_f64().unwrap() > 3.0);

    let completed = serde_json::to_value(events.try_recv().unwrap()).unwrap();
    assert_eq!(completed["type"], "validation_completed");
    assert_eq!(completed["rate_count"], 1);
}
