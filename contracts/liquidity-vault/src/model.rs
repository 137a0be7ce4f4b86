//! Capacity model: circulating supply, tier capacities, the liquidity ratio
//! and the intrinsic minimum value, all derived from the vault's own three
//! positions and the pool's spot price. Liquidity placed by anyone else in
//! the same ranges never enters these figures.

use crate::pool_ops;
use crate::storage::get_position;
use range_math::{absorption_capacity, tick_to_price, underlying_balances};
use soroban_fixed_point_math::FixedPoint;
use soroban_sdk::Env;
use vault_types::{LiquidityPosition, Tier, VaultConfig, VaultError, VaultSnapshot, SCALAR_7, WAD};

/// The vault's three ranges, as stored
#[derive(Clone, Debug)]
pub struct Tiers {
    pub floor: LiquidityPosition,
    pub anchor: LiquidityPosition,
    pub discovery: LiquidityPosition,
}

impl Tiers {
    pub fn load(env: &Env) -> Self {
        Self {
            floor: get_position(env, Tier::Floor),
            anchor: get_position(env, Tier::Anchor),
            discovery: get_position(env, Tier::Discovery),
        }
    }

    pub fn get(&self, tier: Tier) -> &LiquidityPosition {
        match tier {
            Tier::Floor => &self.floor,
            Tier::Anchor => &self.anchor,
            Tier::Discovery => &self.discovery,
        }
    }
}

/// Issued supply held outside the vault: total supply less the vault's
/// balance (collateral included) and what sits in its three ranges
pub fn circulating_supply(
    env: &Env,
    config: &VaultConfig,
    tiers: &Tiers,
    sqrt_price_x96: u128,
) -> Result<i128, VaultError> {
    let total = pool_ops::total_supply(env, &config.issued_token);
    let held = pool_ops::balance(env, &config.issued_token);

    let mut in_ranges = 0i128;
    for tier in [Tier::Floor, Tier::Anchor, Tier::Discovery] {
        let (issued, _) = underlying_balances(env, tiers.get(tier), sqrt_price_x96)?;
        in_ranges += issued;
    }

    Ok((total - held - in_ranges).max(0))
}

/// Price at the Floor's upper tick, in WAD
pub fn intrinsic_minimum_value(env: &Env, tiers: &Tiers) -> Result<i128, VaultError> {
    tick_to_price(env, tiers.floor.upper_tick)
}

/// Reserve held by the Floor at the current price
pub fn floor_balance(env: &Env, tiers: &Tiers, sqrt_price_x96: u128) -> Result<i128, VaultError> {
    Ok(underlying_balances(env, &tiers.floor, sqrt_price_x96)?.1)
}

/// Issued tokens a tier can take back.
///
/// The Floor redeems its reserve at IMV. Anchor and Discovery absorb whatever
/// a fall from spot to their lower tick would push into them.
pub fn position_capacity(
    env: &Env,
    position: &LiquidityPosition,
    tier: Tier,
    sqrt_price_x96: u128,
    imv: i128,
) -> Result<i128, VaultError> {
    match tier {
        Tier::Floor => {
            let (_, reserve) = underlying_balances(env, position, sqrt_price_x96)?;
            reserve.fixed_div_floor(imv, WAD).ok_or(VaultError::MathOverflow)
        }
        Tier::Anchor | Tier::Discovery => absorption_capacity(env, position, sqrt_price_x96),
    }
}

/// (anchor + floor) capacity over circulating supply, 7 decimals.
/// Nothing circulating reads as the maximum ratio.
pub fn liquidity_ratio(anchor_capacity: i128, floor_capacity: i128, circulating: i128) -> Result<i128, VaultError> {
    if circulating == 0 {
        return Ok(i128::MAX);
    }
    (anchor_capacity + floor_capacity)
        .fixed_div_floor(circulating, SCALAR_7)
        .ok_or(VaultError::MathOverflow)
}

/// Full model evaluated at the pool's current price
pub fn snapshot(env: &Env, config: &VaultConfig) -> Result<VaultSnapshot, VaultError> {
    let tiers = Tiers::load(env);
    let (sqrt_price_x96, _) = pool_ops::slot0(env, &config.pool);
    snapshot_with(env, config, &tiers, sqrt_price_x96)
}

pub fn snapshot_with(
    env: &Env,
    config: &VaultConfig,
    tiers: &Tiers,
    sqrt_price_x96: u128,
) -> Result<VaultSnapshot, VaultError> {
    let imv = intrinsic_minimum_value(env, tiers)?;
    let circulating_supply = circulating_supply(env, config, tiers, sqrt_price_x96)?;
    let floor_capacity = position_capacity(env, &tiers.floor, Tier::Floor, sqrt_price_x96, imv)?;
    let anchor_capacity = position_capacity(env, &tiers.anchor, Tier::Anchor, sqrt_price_x96, imv)?;

    Ok(VaultSnapshot {
        sqrt_price_x96,
        circulating_supply,
        floor_balance: floor_balance(env, tiers, sqrt_price_x96)?,
        floor_capacity,
        anchor_capacity,
        imv,
        liquidity_ratio: liquidity_ratio(anchor_capacity, floor_capacity, circulating_supply)?,
    })
}

/// anchor capacity + floor capacity > circulating supply, waived while
/// nothing is in public hands to redeem
pub fn check_solvency(snapshot: &VaultSnapshot) -> Result<(), VaultError> {
    if snapshot.circulating_supply == 0 {
        return Ok(());
    }
    if snapshot.anchor_capacity + snapshot.floor_capacity > snapshot.circulating_supply {
        Ok(())
    } else {
        Err(VaultError::InsolvencyInvariant)
    }
}

/// Re-evaluate the model after a state change and enforce the invariant
pub fn enforce_solvency(env: &Env, config: &VaultConfig) -> Result<VaultSnapshot, VaultError> {
    let snapshot = snapshot(env, config)?;
    check_solvency(&snapshot)?;
    Ok(snapshot)
}

/// Headroom left under the invariant, in issued tokens
pub fn solvency_headroom(snapshot: &VaultSnapshot) -> i128 {
    (snapshot.anchor_capacity + snapshot.floor_capacity - snapshot.circulating_supply).max(0)
}
