//! Staking rewards minted on shift, scaled down as more of the supply sits
//! outside circulation and as the price moves faster.

use soroban_fixed_point_math::FixedPoint;
use vault_types::{VaultError, SCALAR_7, WAD};

/// Inputs to [`calculate_rewards`]
#[derive(Clone, Debug, Default)]
pub struct RewardParams {
    /// Reserve backing the reward
    pub reserve_amount: i128,
    /// WAD
    pub imv: i128,
    pub circulating: i128,
    pub total_supply: i128,
    /// Relative spot move since the last shift, SCALAR_7
    pub volatility: i128,
    /// SCALAR_7
    pub kr: i128,
    /// SCALAR_7
    pub kv: i128,
}

/// `reserve / imv * 1 / (1 + kr * (1 - r)) * 1 / (1 + kv * volatility)`
/// where `r = circulating / total_supply`
pub fn calculate_rewards(p: &RewardParams) -> Result<i128, VaultError> {
    if p.reserve_amount <= 0 || p.imv <= 0 || p.total_supply <= 0 {
        return Ok(0);
    }
    let overflow = VaultError::MathOverflow;

    let base = p.reserve_amount.fixed_div_floor(p.imv, WAD).ok_or(overflow)?;
    let r = p
        .circulating
        .min(p.total_supply)
        .fixed_div_floor(p.total_supply, SCALAR_7)
        .ok_or(overflow)?;

    let supply_drag = SCALAR_7 + p.kr.fixed_mul_floor(SCALAR_7 - r, SCALAR_7).ok_or(overflow)?;
    let volatility_drag = SCALAR_7 + p.kv.fixed_mul_floor(p.volatility, SCALAR_7).ok_or(overflow)?;

    base.fixed_div_floor(supply_drag, SCALAR_7)
        .and_then(|v| v.fixed_div_floor(volatility_drag, SCALAR_7))
        .ok_or(overflow)
}

/// |spot - previous| / previous, SCALAR_7
pub fn volatility(spot_price: i128, previous_price: i128) -> i128 {
    if previous_price <= 0 {
        return 0;
    }
    (spot_price - previous_price)
        .abs()
        .fixed_div_floor(previous_price, SCALAR_7)
        .unwrap_or(i128::MAX)
}
