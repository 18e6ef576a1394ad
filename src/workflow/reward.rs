use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use super::payout::CalculationStatus;

/// Amounts a reward policy assigns to one achievement rate.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PolicyDecision {
    /// Name of the band the rate fell into
    #[schema(example = "Đạt chỉ tiêu")]
    pub band: String,
    #[schema(example = 500000.0)]
    pub reward_amount: f64,
    #[schema(example = 0.0)]
    pub penalty_amount: f64,
}

/// Maps an achievement rate (percent) to reward and penalty amounts.
pub trait RewardPolicy {
    fn lookup(&self, achievement_rate: f64) -> PolicyDecision;
}

impl<F> RewardPolicy for F
where
    F: Fn(f64) -> PolicyDecision,
{
    fn lookup(&self, achievement_rate: f64) -> PolicyDecision {
        self(achievement_rate)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalculationError {
    #[error("Target value must be greater than 0 to compute an achievement rate (got {0})")]
    InvalidTarget(f64),

    #[error("Actual value must be a finite number (got {0})")]
    InvalidActual(f64),

    #[error("Achievement rate for actual {actual} and target {target} is out of range")]
    RateOverflow { actual: f64, target: f64 },
}

/// Freshly computed outcome, always in the `calculated` state.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RewardPenaltyOutcome {
    /// Full precision percentage
    #[schema(example = 150.0)]
    pub achievement_rate: f64,
    #[schema(example = 2000000.0)]
    pub reward_amount: f64,
    #[schema(example = 0.0)]
    pub penalty_amount: f64,
    #[schema(example = 2000000.0)]
    pub net_amount: f64,
    pub status: CalculationStatus,
    pub notes: String,
}

/// Presentation rounding. Stored values keep full precision.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn achievement_rate(actual: f64, target: f64) -> Result<f64, CalculationError> {
    if !target.is_finite() || target <= 0.0 {
        return Err(CalculationError::InvalidTarget(target));
    }
    if !actual.is_finite() {
        return Err(CalculationError::InvalidActual(actual));
    }
    let rate = actual * 100.0 / target;
    if !rate.is_finite() {
        return Err(CalculationError::RateOverflow { actual, target });
    }
    Ok(rate)
}

pub fn calculate_reward_penalty<P>(
    actual: f64,
    target: f64,
    policy: &P,
) -> Result<RewardPenaltyOutcome, CalculationError>
where
    P: RewardPolicy + ?Sized,
{
    let rate = achievement_rate(actual, target)?;
    let decision = policy.lookup(rate);

    Ok(RewardPenaltyOutcome {
        achievement_rate: rate,
        reward_amount: decision.reward_amount,
        penalty_amount: decision.penalty_amount,
        net_amount: decision.reward_amount - decision.penalty_amount,
        status: CalculationStatus::Calculated,
        notes: format!(
            "Achievement {:.2}% ({} / {}) falls in band '{}'",
            rate, actual, target, decision.band
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stepped(rate: f64) -> PolicyDecision {
        let (band, reward, penalty) = if rate >= 100.0 {
            ("full", 1000.0, 0.0)
        } else if rate >= 80.0 {
            ("eighty", 300.0, 0.0)
        } else {
            ("below", 0.0, 200.0)
        };
        PolicyDecision {
            band: band.into(),
            reward_amount: reward,
            penalty_amount: penalty,
        }
    }

    #[test]
    fn over_target_hits_top_band() {
        let out = calculate_reward_penalty(150.0, 100.0, &stepped).unwrap();
        assert_eq!(out.achievement_rate, 150.0);
        assert_eq!(out.reward_amount, 1000.0);
        assert_eq!(out.net_amount, 1000.0);
        assert_eq!(out.status, CalculationStatus::Calculated);
        assert!(out.notes.contains("150.00%"));
        assert!(out.notes.contains("'full'"));
    }

    #[test]
    fn eighty_percent_band() {
        let out = calculate_reward_penalty(80.0, 100.0, &stepped).unwrap();
        assert_eq!(out.achievement_rate, 80.0);
        assert_eq!(out.reward_amount, 300.0);
        assert_eq!(out.penalty_amount, 0.0);
    }

    #[test]
    fn penalty_makes_net_negative() {
        let out = calculate_reward_penalty(10.0, 100.0, &stepped).unwrap();
        assert_eq!(out.net_amount, -200.0);
    }

    #[test]
    fn zero_target_fails() {
        assert_eq!(
            calculate_reward_penalty(42.0, 0.0, &stepped),
            Err(CalculationError::InvalidTarget(0.0))
        );
        assert!(calculate_reward_penalty(42.0, -5.0, &stepped).is_err());
        assert!(calculate_reward_penalty(f64::NAN, 10.0, &stepped).is_err());
        assert!(calculate_reward_penalty(1.0, f64::INFINITY, &stepped).is_err());
    }

    #[test]
    fn overflowing_rate_fails() {
        for (actual, target) in [(1e300, 1e-10), (f64::MAX, 1.0), (-f64::MAX, 0.5)] {
            assert_eq!(
                calculate_reward_penalty(actual, target, &stepped),
                Err(CalculationError::RateOverflow { actual, target })
            );
        }
    }

    #[test]
    fn same_inputs_same_output() {
        let a = calculate_reward_penalty(57.0, 100.0, &stepped).unwrap();
        let b = calculate_reward_penalty(57.0, 100.0, &stepped).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.achievement_rate, 57.0);
    }

    #[test]
    fn rate_keeps_full_precision() {
        let rate = achievement_rate(1.0, 3.0).unwrap();
        assert!(rate > 33.333 && rate < 33.334);
        assert_eq!(round2(rate), 33.33);
    }
}
