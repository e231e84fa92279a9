use serde::Serialize;

use super::cycle::project_market_cycle;
use super::engine::{project_contributions, summarize};
use super::error::ProjectionError;
use super::types::{
    InvestmentParameters, MarketCycleRecord, MarketPhase, Phase, ProjectedOutcome,
    ProjectionRecord, round2,
};

/// Everything the roadmap view needs for one set of parameters.
#[derive(Debug, Clone)]
pub struct Roadmap {
    pub parameters: InvestmentParameters,
    pub projection: Vec<ProjectionRecord>,
    pub market_cycle: Vec<MarketCycleRecord>,
    pub outcome: ProjectedOutcome,
}

/// Projection record as shown on the chart: currency and percentages at 2 dp.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionRow {
    pub month: u32,
    pub total_investment: f64,
    pub projected_value: f64,
    pub monthly_return: f64,
    pub market_phase: Phase,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleRow {
    pub month: u32,
    pub market_value: f64,
    pub bull_run_probability: f64,
    pub market_phase: MarketPhase,
    pub potential_return: f64,
}

pub fn build_roadmap(parameters: InvestmentParameters) -> Result<Roadmap, ProjectionError> {
    let projection = project_contributions(&parameters)?;
    let market_cycle = project_market_cycle(parameters.horizon_months())?;
    let outcome = summarize(&projection)?;
    Ok(Roadmap {
        parameters,
        projection,
        market_cycle,
        outcome,
    })
}

impl Roadmap {
    /// Profit over capital in percent, rounded for display and persistence.
    pub fn expected_return_percent(&self) -> f64 {
        round2(self.outcome.return_percent())
    }

    pub fn projection_rows(&self) -> Vec<ProjectionRow> {
        self.projection
            .iter()
            .map(|r| ProjectionRow {
                month: r.period,
                total_investment: round2(r.cumulative_contribution),
                projected_value: round2(r.projected_value),
                monthly_return: round2(r.period_return_rate * 100.0),
                market_phase: r.phase,
            })
            .collect()
    }

    pub fn cycle_rows(&self) -> Vec<CycleRow> {
        self.market_cycle
            .iter()
            .map(|r| CycleRow {
                month: r.period,
                market_value: r.market_value,
                bull_run_probability: r.bull_run_probability,
                market_phase: r.market_phase,
                potential_return: round2(r.potential_return),
            })
            .collect()
    }
}
