mod cycle;
mod engine;
mod error;
mod report;
mod types;

pub use cycle::{MARKET_BASE_VALUE, project_market_cycle};
pub use engine::{
    baseline_monthly_rate, classify_phase, effective_period_rate, phase_multiplier,
    project_contributions, summarize,
};
pub use error::ProjectionError;
pub use report::{CycleRow, ProjectionRow, Roadmap, build_roadmap};
pub use types::{
    ActivatedStrategy, InvestmentParameters, MAX_HORIZON_MONTHS, MarketCycleRecord, MarketPhase,
    Phase, ProjectedOutcome, ProjectionRecord, round2,
};
