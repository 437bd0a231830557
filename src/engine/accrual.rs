use crate::domain::{Position, RewardRate, Timestamp, Valuation};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccrualError {
    #[error("reward arithmetic overflow")]
    Overflow,
}

/// Largest power of ten that fits in a u128.
const MAX_POW10: u32 = 38;

fn pow10(exp: u32) -> Result<u128, AccrualError> {
    10u128.checked_pow(exp).ok_or(AccrualError::Overflow)
}

/// Full 256-bit product of two u128 values as `(high, low)` words.
fn widening_mul(a: u128, b: u128) -> (u128, u128) {
    const MASK: u128 = u64::MAX as u128;
    let (a1, a0) = (a >> 64, a & MASK);
    let (b1, b0) = (b >> 64, b & MASK);

    let p00 = a0 * b0;
    let p01 = a0 * b1;
    let p10 = a1 * b0;
    let p11 = a1 * b1;

    let mid = (p00 >> 64) + (p01 & MASK) + (p10 & MASK);
    let low = (p00 & MASK) | (mid << 64);
    let high = p11 + (p01 >> 64) + (p10 >> 64) + (mid >> 64);
    (high, low)
}

/// `floor(a * b / d)` with a 256-bit intermediate.
///
/// `None` when `d` is zero or the quotient does not fit in a u128.
pub(crate) fn mul_div_floor(a: u128, b: u128, d: u128) -> Option<u128> {
    if d == 0 {
        return None;
    }
    let (high, low) = widening_mul(a, b);
    if high == 0 {
        return Some(low / d);
    }
    if high >= d {
        return None;
    }

    // Restoring long division of (high, low) by d, one bit of `low` at a time.
    let mut rem = high;
    let mut quotient = 0u128;
    for bit in (0..128).rev() {
        let carry = rem >> 127;
        rem = (rem << 1) | ((low >> bit) & 1);
        if carry == 1 || rem >= d {
            rem = rem.wrapping_sub(d);
            quotient |= 1u128 << bit;
        }
    }
    Some(quotient)
}

/// `floor(value / 10^exp)` for any exponent.
fn div_pow10(mut value: u128, mut exp: u32) -> u128 {
    while exp > 0 && value > 0 {
        let step = exp.min(MAX_POW10);
        value /= 10u128.pow(step);
        exp -= step;
    }
    value
}

/// Time-weighted reward calculator.
///
/// All arithmetic is integer and floors once per accrual window, so the sum of
/// rewards over split windows never exceeds the reward over the joined window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccrualEngine {
    /// Decimal precision of reward-token units.
    pub reward_decimals: u32,
}

impl AccrualEngine {
    pub fn new(reward_decimals: u32) -> Self {
        Self { reward_decimals }
    }

    /// USD value of `principal`, expressed at the valuation's price scale.
    pub fn usd_value(
        &self,
        principal: u128,
        decimals: u8,
        valuation: Valuation,
    ) -> Result<u128, AccrualError> {
        let exp = decimals as u32;
        if exp > MAX_POW10 {
            let scaled = mul_div_floor(principal, valuation.price, pow10(MAX_POW10)?)
                .ok_or(AccrualError::Overflow)?;
            return Ok(div_pow10(scaled, exp - MAX_POW10));
        }
        mul_div_floor(principal, valuation.price, pow10(exp)?).ok_or(AccrualError::Overflow)
    }

    /// Reward earned by `usd_value` (at `price_scale`) over `elapsed` seconds.
    pub fn reward_for_window(
        &self,
        usd_value: u128,
        price_scale: u32,
        rate: RewardRate,
        elapsed: u64,
    ) -> Result<u128, AccrualError> {
        if usd_value == 0 || elapsed == 0 || rate.mantissa == 0 {
            return Ok(0);
        }

        let factor = rate
            .mantissa
            .checked_mul(elapsed as u128)
            .ok_or(AccrualError::Overflow)?;

        // reward_decimals - price_scale - rate.scale, split by sign so the
        // result is floored exactly once.
        let up = self.reward_decimals as i64;
        let down = price_scale as i64 + rate.scale as i64;
        if up >= down {
            usd_value
                .checked_mul(factor)
                .and_then(|v| v.checked_mul(pow10((up - down) as u32).ok()?))
                .ok_or(AccrualError::Overflow)
        } else {
            let exp = (down - up) as u32;
            let first = exp.min(MAX_POW10);
            let scaled = mul_div_floor(usd_value, factor, pow10(first)?)
                .ok_or(AccrualError::Overflow)?;
            Ok(div_pow10(scaled, exp - first))
        }
    }

    /// Reward earned since `last_accrual_at`, not yet folded into the position.
    pub fn pending_reward(
        &self,
        position: &Position,
        rate: RewardRate,
        now: Timestamp,
    ) -> Result<u128, AccrualError> {
        if position.principal == 0 {
            return Ok(0);
        }
        let value = self.usd_value(position.principal, position.decimals, position.valuation)?;
        let elapsed = now.seconds_since(position.last_accrual_at);
        self.reward_for_window(value, position.valuation.scale, rate, elapsed)
    }

    /// What `accrued_reward` would become if settled at `now`.
    pub fn projected_reward(
        &self,
        position: &Position,
        rate: RewardRate,
        now: Timestamp,
    ) -> Result<u128, AccrualError> {
        position
            .accrued_reward
            .checked_add(self.pending_reward(position, rate, now)?)
            .ok_or(AccrualError::Overflow)
    }

    /// Fold pending reward into `accrued_reward` and move the accrual
    /// checkpoint to `now`. Returns the reward earned in this window.
    ///
    /// Must run before any change to principal or valuation.
    pub fn settle(
        &self,
        position: &mut Position,
        rate: RewardRate,
        now: Timestamp,
    ) -> Result<u128, AccrualError> {
        let earned = self.pending_reward(position, rate, now)?;
        position.accrued_reward = position
            .accrued_reward
            .checked_add(earned)
            .ok_or(AccrualError::Overflow)?;
        if now > position.last_accrual_at {
            position.last_accrual_at = now;
        }
        debug!(
            key = %position.key(),
            earned,
            accrued = position.accrued_reward,
            "Settled accrual"
        );
        Ok(earned)
    }

    /// [`settle`](Self::settle) for paths that must not fail, such as
    /// withdrawals. A reward too large to represent saturates at `u128::MAX`.
    pub fn settle_capped(&self, position: &mut Position, rate: RewardRate, now: Timestamp) -> u128 {
        let earned = match self.pending_reward(position, rate, now) {
            Ok(earned) => earned,
            Err(e) => {
                warn!(key = %position.key(), error = %e, "Pending reward capped");
                u128::MAX
            }
        };
        position.accrued_reward = position.accrued_reward.saturating_add(earned);
        if now > position.last_accrual_at {
            position.last_accrual_at = now;
        }
        earned
    }
}
