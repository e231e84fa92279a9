use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use super::error::ProjectionError;

/// Longest horizon accepted, one century of monthly periods.
pub const MAX_HORIZON_MONTHS: u32 = 1200;

/// Phase label used by the contribution projection.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Accumulation,
    #[serde(rename = "Bull Run")]
    BullRun,
    Maturity,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Accumulation => "Accumulation",
            Phase::BullRun => "Bull Run",
            Phase::Maturity => "Maturity",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Phase label used by the market-cycle curve. Deliberately separate from
/// [`Phase`]: the two simulations name their third phase differently.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum MarketPhase {
    Accumulation,
    #[serde(rename = "Bull Run")]
    BullRun,
    #[serde(rename = "Peak/Consolidation")]
    PeakConsolidation,
}

impl MarketPhase {
    pub fn label(self) -> &'static str {
        match self {
            MarketPhase::Accumulation => "Accumulation",
            MarketPhase::BullRun => "Bull Run",
            MarketPhase::PeakConsolidation => "Peak/Consolidation",
        }
    }
}

impl fmt::Display for MarketPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Validated inputs for one roadmap. Construct through [`InvestmentParameters::new`]
/// so every simulation can rely on the invariants.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentParameters {
    instrument_symbol: String,
    instrument_name: String,
    baseline_annual_rate: f64,
    monthly_contribution: f64,
    horizon_months: u32,
}

impl InvestmentParameters {
    pub fn new(
        instrument_symbol: impl Into<String>,
        instrument_name: Option<String>,
        baseline_annual_rate: f64,
        monthly_contribution: f64,
        horizon_months: u32,
    ) -> Result<Self, ProjectionError> {
        let instrument_symbol = instrument_symbol.into().trim().to_string();
        if instrument_symbol.is_empty() {
            return Err(ProjectionError::invalid("symbol must not be empty"));
        }

        if !monthly_contribution.is_finite() || monthly_contribution <= 0.0 {
            return Err(ProjectionError::invalid("monthly investment must be > 0"));
        }

        if horizon_months == 0 {
            return Err(ProjectionError::invalid("investment period must be >= 1"));
        }

        if horizon_months > MAX_HORIZON_MONTHS {
            return Err(ProjectionError::invalid(format!(
                "investment period must be <= {MAX_HORIZON_MONTHS}"
            )));
        }

        if !baseline_annual_rate.is_finite() {
            return Err(ProjectionError::invalid("allocation must be a finite number"));
        }

        if 1.0 + baseline_annual_rate / 100.0 < 0.0 {
            return Err(ProjectionError::invalid("allocation must be >= -100"));
        }

        let instrument_name = instrument_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| instrument_symbol.clone());

        Ok(Self {
            instrument_symbol,
            instrument_name,
            baseline_annual_rate,
            monthly_contribution,
            horizon_months,
        })
    }

    pub fn instrument_symbol(&self) -> &str {
        &self.instrument_symbol
    }

    pub fn instrument_name(&self) -> &str {
        &self.instrument_name
    }

    /// Annual allocation figure in percent, e.g. `8.0` for 8%.
    pub fn baseline_annual_rate(&self) -> f64 {
        self.baseline_annual_rate
    }

    pub fn monthly_contribution(&self) -> f64 {
        self.monthly_contribution
    }

    pub fn horizon_months(&self) -> u32 {
        self.horizon_months
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionRecord {
    pub period: u32,
    pub cumulative_contribution: f64,
    pub projected_value: f64,
    /// Fraction applied this period, e.g. `0.0064` for 0.64%.
    pub period_return_rate: f64,
    pub phase: Phase,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketCycleRecord {
    pub period: u32,
    pub market_value: f64,
    pub bull_run_probability: f64,
    pub market_phase: MarketPhase,
    pub potential_return: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedOutcome {
    pub total_invested: f64,
    pub projected_value: f64,
    pub profit: f64,
}

impl ProjectedOutcome {
    /// Profit as a percentage of the capital put in.
    pub fn return_percent(&self) -> f64 {
        if self.total_invested <= 0.0 {
            return 0.0;
        }
        self.profit / self.total_invested * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivatedStrategy {
    pub symbol: String,
    pub name: String,
    pub monthly_investment: f64,
    pub investment_period: u32,
    pub activation_date: String,
    #[serde(
        rename = "expectedReturn",
        alias = "expectedReturnPercent",
        deserialize_with = "number_or_numeric_text"
    )]
    pub expected_return_percent: f64,
}

/// Browser-written lists hold `expectedReturn` as `"6.37"` text.
fn number_or_numeric_text<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(v) => Ok(v),
        Raw::Text(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid expectedReturn '{text}'"))),
    }
}

/// Rounds to two decimal places for display.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
