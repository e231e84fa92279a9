use super::error::ProjectionError;
use super::types::{InvestmentParameters, Phase, ProjectedOutcome, ProjectionRecord};

const ACCUMULATION_CUTOFF: f64 = 0.3;
const BULL_RUN_CUTOFF: f64 = 0.7;

const ACCUMULATION_MULTIPLIER: f64 = 1.0;
const BULL_RUN_MULTIPLIER: f64 = 1.8;
const MATURITY_MULTIPLIER: f64 = 1.3;

/// Places `period` on the contribution timeline. Thresholds are the raw
/// `f64` products `0.3 * horizon` and `0.7 * horizon`, compared with `<`.
pub fn classify_phase(period: u32, horizon: u32) -> Phase {
    let period = period as f64;
    let horizon = horizon as f64;
    if period < horizon * ACCUMULATION_CUTOFF {
        Phase::Accumulation
    } else if period < horizon * BULL_RUN_CUTOFF {
        Phase::BullRun
    } else {
        Phase::Maturity
    }
}

/// Geometric monthly equivalent of an annual percentage rate.
pub fn baseline_monthly_rate(annual_rate_percent: f64) -> Result<f64, ProjectionError> {
    let growth = 1.0 + annual_rate_percent / 100.0;
    if !growth.is_finite() || growth < 0.0 {
        return Err(ProjectionError::invalid(format!(
            "annual rate {annual_rate_percent}% has no real monthly equivalent"
        )));
    }
    Ok(growth.powf(1.0 / 12.0) - 1.0)
}

pub fn phase_multiplier(phase: Phase) -> f64 {
    match phase {
        Phase::Accumulation => ACCUMULATION_MULTIPLIER,
        Phase::BullRun => BULL_RUN_MULTIPLIER,
        Phase::Maturity => MATURITY_MULTIPLIER,
    }
}

pub fn effective_period_rate(phase: Phase, baseline_monthly_rate: f64) -> f64 {
    baseline_monthly_rate * phase_multiplier(phase)
}

/// Month-by-month contribution projection, `horizon + 1` records long.
///
/// Period 0 is the starting snapshot with nothing invested. Every later
/// period adds the contribution first and then compounds the whole pot at
/// that period's phase-adjusted rate.
pub fn project_contributions(
    params: &InvestmentParameters,
) -> Result<Vec<ProjectionRecord>, ProjectionError> {
    let horizon = params.horizon_months();
    let contribution = params.monthly_contribution();
    let base_rate = baseline_monthly_rate(params.baseline_annual_rate())?;

    let mut records = Vec::with_capacity(horizon as usize + 1);
    let phase = classify_phase(0, horizon);
    records.push(ProjectionRecord {
        period: 0,
        cumulative_contribution: 0.0,
        projected_value: 0.0,
        period_return_rate: effective_period_rate(phase, base_rate),
        phase,
    });

    let mut projected_value = 0.0;
    for period in 1..=horizon {
        let phase = classify_phase(period, horizon);
        let rate = effective_period_rate(phase, base_rate);
        // Product rather than a running sum keeps the final total exact.
        let cumulative_contribution = contribution * period as f64;
        projected_value = (projected_value + contribution) * (1.0 + rate);

        records.push(ProjectionRecord {
            period,
            cumulative_contribution,
            projected_value,
            period_return_rate: rate,
            phase,
        });
    }

    Ok(records)
}

pub fn summarize(records: &[ProjectionRecord]) -> Result<ProjectedOutcome, ProjectionError> {
    let last = records.last().ok_or(ProjectionError::EmptyInput)?;
    Ok(ProjectedOutcome {
        total_invested: last.cumulative_contribution,
        projected_value: last.projected_value,
        profit: last.projected_value - last.cumulative_contribution,
    })
}
