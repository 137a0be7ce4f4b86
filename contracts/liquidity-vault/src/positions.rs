//! Moving the vault's liquidity in and out of its three tiers.

use crate::pool_ops;
use crate::storage::{get_position, get_total_collateral, set_position};
use range_math::{deposit_amounts, liquidity_for_reserve, underlying_balances};
use soroban_sdk::Env;
use vault_types::{LiquidityPosition, Tier, VaultConfig, VaultError};

/// Burn all of a tier's liquidity and collect it. The tier keeps its ticks
/// with zero liquidity.
pub fn pull_tier(env: &Env, config: &VaultConfig, tier: Tier) -> (i128, i128) {
    let mut position = get_position(env, tier);
    let collected = pool_ops::withdraw(env, config, &position, position.liquidity);
    position.liquidity = 0;
    set_position(env, tier, &position);
    collected
}

/// Deploy `position` as the tier's range, minting any issued tokens the
/// vault is short of. The tier must have been pulled first.
pub fn place_tier(
    env: &Env,
    config: &VaultConfig,
    tier: Tier,
    position: &LiquidityPosition,
) -> Result<(i128, i128), VaultError> {
    position.check_ticks()?;
    let paid = if position.is_empty() {
        (0, 0)
    } else {
        let (sqrt_price_x96, _) = pool_ops::slot0(env, &config.pool);
        let (issued_needed, _) = deposit_amounts(env, position, sqrt_price_x96)?;
        pool_ops::ensure_issued(env, &config.issued_token, issued_needed, get_total_collateral(env));
        pool_ops::deploy(env, config, position)?
    };
    set_position(env, tier, position);
    Ok(paid)
}

/// Put `reserve` into the Floor's current range. Returns the liquidity added;
/// reserve the range cannot take at this price stays in the vault.
pub fn add_reserve_to_floor(env: &Env, config: &VaultConfig, reserve: i128) -> Result<u128, VaultError> {
    let mut floor = get_position(env, Tier::Floor);
    let (sqrt_price_x96, _) = pool_ops::slot0(env, &config.pool);
    let added = liquidity_for_reserve(env, floor.lower_tick, floor.upper_tick, sqrt_price_x96, reserve)?;
    if added == 0 {
        return Ok(0);
    }
    pool_ops::deploy(
        env,
        config,
        &LiquidityPosition::new(floor.lower_tick, floor.upper_tick, added),
    )?;
    floor.liquidity += added;
    set_position(env, Tier::Floor, &floor);
    Ok(added)
}

/// Take exactly `reserve` out of the Floor, re-deploying the rest in place
pub fn take_reserve_from_floor(env: &Env, config: &VaultConfig, reserve: i128) -> Result<(), VaultError> {
    let floor = get_position(env, Tier::Floor);
    let (sqrt_price_x96, _) = pool_ops::slot0(env, &config.pool);
    let (_, held) = underlying_balances(env, &floor, sqrt_price_x96)?;
    if held < reserve {
        return Err(VaultError::InsufficientLiquidity);
    }

    let (_, collected) = pull_tier(env, config, Tier::Floor);
    let remaining = collected - reserve;
    let liquidity = liquidity_for_reserve(env, floor.lower_tick, floor.upper_tick, sqrt_price_x96, remaining)?;
    place_tier(
        env,
        config,
        Tier::Floor,
        &LiquidityPosition::new(floor.lower_tick, floor.upper_tick, liquidity),
    )?;
    Ok(())
}
