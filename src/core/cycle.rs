use super::error::ProjectionError;
use super::types::{MAX_HORIZON_MONTHS, MarketCycleRecord, MarketPhase};

pub const MARKET_BASE_VALUE: f64 = 1000.0;

/// Hand-tuned market-cycle curve over `0..=horizon`.
///
/// Independent of the contribution projection: it shares the 30%/70% cut
/// points but has its own multiplier ramp, probability curve and phase
/// labels. Probabilities are reported raw, without clamping.
pub fn project_market_cycle(horizon: u32) -> Result<Vec<MarketCycleRecord>, ProjectionError> {
    if horizon == 0 {
        return Err(ProjectionError::invalid("investment period must be >= 1"));
    }
    if horizon > MAX_HORIZON_MONTHS {
        return Err(ProjectionError::invalid(format!(
            "investment period must be <= {MAX_HORIZON_MONTHS}"
        )));
    }

    let h = horizon as f64;
    let accumulation_end = h * 0.3;
    let bull_run_end = h * 0.7;
    let bull_run_span = h * 0.4;
    let peak_span = h * 0.3;

    let records = (0..=horizon)
        .map(|period| {
            let p = period as f64;
            let (multiplier, market_phase, probability) = if p < accumulation_end {
                let progress = p / accumulation_end;
                (
                    1.0 + progress * 0.5,
                    MarketPhase::Accumulation,
                    75.0 + progress * 15.0,
                )
            } else if p < bull_run_end {
                let progress = (p - accumulation_end) / bull_run_span;
                (1.5 + progress * 3.0, MarketPhase::BullRun, 90.0)
            } else {
                let progress = (p - bull_run_end) / peak_span;
                (
                    4.5 + progress * 0.5,
                    MarketPhase::PeakConsolidation,
                    85.0 - progress * 15.0,
                )
            };

            MarketCycleRecord {
                period,
                market_value: MARKET_BASE_VALUE * multiplier,
                bull_run_probability: probability,
                market_phase,
                potential_return: (multiplier - 1.0) * 100.0,
            }
        })
        .collect();

    Ok(records)
}
