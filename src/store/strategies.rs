use chrono::{DateTime, SecondsFormat, Utc};
use tracing::info;

use super::{KeyValueStore, StoreError};
use crate::core::{ActivatedStrategy, InvestmentParameters, ProjectedOutcome, round2};

pub const ACTIVATED_STRATEGIES_KEY: &str = "activatedStrategies";

pub fn activated_strategies<S>(store: &S) -> Result<Vec<ActivatedStrategy>, StoreError>
where
    S: KeyValueStore + ?Sized,
{
    match store.get(ACTIVATED_STRATEGIES_KEY)? {
        Some(raw) if !raw.trim().is_empty() => Ok(serde_json::from_str(&raw)?),
        _ => Ok(Vec::new()),
    }
}

pub fn activate<S>(
    store: &mut S,
    outcome: &ProjectedOutcome,
    params: &InvestmentParameters,
) -> Result<ActivatedStrategy, StoreError>
where
    S: KeyValueStore + ?Sized,
{
    activate_at(store, outcome, params, Utc::now())
}

/// Appends a strategy stamped with `at`. Identical activations are kept as
/// separate entries.
///
/// Read-modify-write with no locking of its own: concurrent callers must
/// share one owner of the store.
pub fn activate_at<S>(
    store: &mut S,
    outcome: &ProjectedOutcome,
    params: &InvestmentParameters,
    at: DateTime<Utc>,
) -> Result<ActivatedStrategy, StoreError>
where
    S: KeyValueStore + ?Sized,
{
    let mut strategies = activated_strategies(store)?;
    let strategy = ActivatedStrategy {
        symbol: params.instrument_symbol().to_string(),
        name: params.instrument_name().to_string(),
        monthly_investment: params.monthly_contribution(),
        investment_period: params.horizon_months(),
        activation_date: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        expected_return_percent: round2(outcome.return_percent()),
    };
    strategies.push(strategy.clone());
    store.set(ACTIVATED_STRATEGIES_KEY, serde_json::to_string(&strategies)?)?;

    info!(
        symbol = %strategy.symbol,
        months = strategy.investment_period,
        expected_return = strategy.expected_return_percent,
        total = strategies.len(),
        "strategy activated"
    );
    Ok(strategy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{project_contributions, summarize};
    use crate::store::{JsonFileStore, MemoryStore, scratch_path};
    use chrono::TimeZone;

    fn sample() -> (InvestmentParameters, ProjectedOutcome) {
        let params = InvestmentParameters::new("ETH", Some("Ethereum".to_string()), 8.0, 100.0, 12)
            .expect("valid params");
        let outcome = summarize(&project_contributions(&params).expect("projection"))
            .expect("outcome");
        (params, outcome)
    }

    #[test]
    fn activation_appends_record_with_metadata() {
        let (params, outcome) = sample();
        let mut store = MemoryStore::new();
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();

        let strategy = activate_at(&mut store, &outcome, &params, at).expect("activate");
        assert_eq!(strategy.symbol, "ETH");
        assert_eq!(strategy.name, "Ethereum");
        assert_eq!(strategy.monthly_investment, 100.0);
        assert_eq!(strategy.investment_period, 12);
        assert_eq!(strategy.activation_date, "2024-03-01T12:30:00.000Z");
        assert_eq!(strategy.expected_return_percent, 6.37);

        let stored = activated_strategies(&store).expect("list");
        assert_eq!(stored, vec![strategy]);
    }

    #[test]
    fn activating_twice_keeps_both_entries() {
        let (params, outcome) = sample();
        let mut store = MemoryStore::new();
        assert!(activated_strategies(&store).expect("list").is_empty());

        activate(&mut store, &outcome, &params).expect("first");
        assert_eq!(activated_strategies(&store).expect("list").len(), 1);
        activate(&mut store, &outcome, &params).expect("second");
        assert_eq!(activated_strategies(&store).expect("list").len(), 2);
    }

    #[test]
    fn persisted_list_uses_dashboard_field_names() {
        let (params, outcome) = sample();
        let mut store = MemoryStore::new();
        activate(&mut store, &outcome, &params).expect("activate");

        let raw = store
            .get(ACTIVATED_STRATEGIES_KEY)
            .expect("get")
            .expect("list present");
        assert!(raw.starts_with('['));
        assert!(raw.contains("\"monthlyInvestment\":100.0"));
        assert!(raw.contains("\"investmentPeriod\":12"));
        assert!(raw.contains("\"activationDate\""));
        assert!(raw.contains("\"expectedReturn\":6.37"));
    }

    #[test]
    fn existing_entries_survive_activation() {
        let (params, outcome) = sample();
        let mut store = MemoryStore::new();
        store
            .set(
                ACTIVATED_STRATEGIES_KEY,
                r#"[{"symbol":"BTC","name":"Bitcoin","monthlyInvestment":50,"investmentPeriod":6,
                    "activationDate":"2023-01-01T00:00:00.000Z","expectedReturn":3.5}]"#
                    .to_string(),
            )
            .expect("seed");

        activate(&mut store, &outcome, &params).expect("activate");
        let stored = activated_strategies(&store).expect("list");
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].symbol, "BTC");
        assert_eq!(stored[0].expected_return_percent, 3.5);
        assert_eq!(stored[1].symbol, "ETH");
    }

    #[test]
    fn browser_written_list_with_text_returns_is_extended() {
        let (params, outcome) = sample();
        let mut store = MemoryStore::new();
        store
            .set(
                ACTIVATED_STRATEGIES_KEY,
                r#"[{"symbol":"BTC","name":"Bitcoin","monthlyInvestment":100,"investmentPeriod":12,
                    "activationDate":"2024-03-01T12:30:00.000Z","expectedReturn":"6.37"}]"#
                    .to_string(),
            )
            .expect("seed");

        activate(&mut store, &outcome, &params).expect("activate");
        let stored = activated_strategies(&store).expect("list");
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].expected_return_percent, 6.37);

        let raw = store
            .get(ACTIVATED_STRATEGIES_KEY)
            .expect("get")
            .expect("list present");
        assert!(!raw.contains("\"6.37\""));
    }

    #[test]
    fn activation_works_through_file_store() {
        let (params, outcome) = sample();
        let path = scratch_path("strategies");
        let mut store = JsonFileStore::new(&path);
        activate(&mut store, &outcome, &params).expect("activate");
        activate(&mut store, &outcome, &params).expect("activate");

        let reopened = JsonFileStore::new(&path);
        assert_eq!(activated_strategies(&reopened).expect("list").len(), 2);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn corrupt_list_is_reported_not_overwritten() {
        let (params, outcome) = sample();
        let mut store = MemoryStore::new();
        store
            .set(ACTIVATED_STRATEGIES_KEY, "{broken".to_string())
            .expect("seed");
        let err = activate(&mut store, &outcome, &params).expect_err("must fail");
        assert!(matches!(err, StoreError::Serialization(_)));
        assert_eq!(
            store.get(ACTIVATED_STRATEGIES_KEY).expect("get").as_deref(),
            Some("{broken")
        );
    }
}
