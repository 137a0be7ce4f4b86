//! Token balances and capacities of a single vault range.
//!
//! Token0 is the issued token and token1 the reserve, so a range below the
//! spot price holds only reserve and a range above it holds only issued
//! supply.

use crate::liquidity_math::{amounts_for_liquidity, liquidity_for_amount0, liquidity_for_amount1};
use crate::sqrt_price_math::amount0_delta;
use crate::tick_math::checked_sqrt_price_at_tick;
use soroban_sdk::Env;
use vault_types::{LiquidityPosition, VaultError};

fn to_amount(value: u128) -> Result<i128, VaultError> {
    i128::try_from(value).map_err(|_| VaultError::MathOverflow)
}

fn to_raw(amount: i128) -> Result<u128, VaultError> {
    u128::try_from(amount).map_err(|_| VaultError::InvalidParams)
}

fn bounds(env: &Env, lower_tick: i32, upper_tick: i32) -> Result<(u128, u128), VaultError> {
    if lower_tick >= upper_tick {
        return Err(VaultError::InvalidTick);
    }
    Ok((
        checked_sqrt_price_at_tick(env, lower_tick)?,
        checked_sqrt_price_at_tick(env, upper_tick)?,
    ))
}

/// (issued, reserve) a full burn of the range pays out at `sqrt_price_x96`
pub fn underlying_balances(
    env: &Env,
    position: &LiquidityPosition,
    sqrt_price_x96: u128,
) -> Result<(i128, i128), VaultError> {
    if position.is_empty() {
        return Ok((0, 0));
    }
    let (lower, upper) = bounds(env, position.lower_tick, position.upper_tick)?;
    let (amount0, amount1) = amounts_for_liquidity(env, sqrt_price_x96, lower, upper, position.liquidity, false);
    Ok((to_amount(amount0)?, to_amount(amount1)?))
}

/// (issued, reserve) the pool charges to mint the range at `sqrt_price_x96`
pub fn deposit_amounts(
    env: &Env,
    position: &LiquidityPosition,
    sqrt_price_x96: u128,
) -> Result<(i128, i128), VaultError> {
    if position.is_empty() {
        return Ok((0, 0));
    }
    let (lower, upper) = bounds(env, position.lower_tick, position.upper_tick)?;
    let (amount0, amount1) = amounts_for_liquidity(env, sqrt_price_x96, lower, upper, position.liquidity, true);
    Ok((to_amount(amount0)?, to_amount(amount1)?))
}

/// Issued tokens the range takes in while the price falls from spot to its
/// lower tick. Zero once spot is at or below the lower tick.
pub fn absorption_capacity(
    env: &Env,
    position: &LiquidityPosition,
    sqrt_price_x96: u128,
) -> Result<i128, VaultError> {
    if position.is_empty() {
        return Ok(0);
    }
    let (lower, upper) = bounds(env, position.lower_tick, position.upper_tick)?;
    let top = sqrt_price_x96.clamp(lower, upper);
    to_amount(amount0_delta(env, lower, top, position.liquidity, false))
}

/// Liquidity that `reserve` funds on the part of the range below spot
pub fn liquidity_for_reserve(
    env: &Env,
    lower_tick: i32,
    upper_tick: i32,
    sqrt_price_x96: u128,
    reserve: i128,
) -> Result<u128, VaultError> {
    let (lower, upper) = bounds(env, lower_tick, upper_tick)?;
    if sqrt_price_x96 <= lower || reserve <= 0 {
        return Ok(0);
    }
    Ok(liquidity_for_amount1(env, lower, sqrt_price_x96.min(upper), to_raw(reserve)?))
}

/// Liquidity whose absorption capacity at spot is `amount0`
pub fn liquidity_for_absorption(
    env: &Env,
    lower_tick: i32,
    upper_tick: i32,
    sqrt_price_x96: u128,
    amount0: i128,
) -> Result<u128, VaultError> {
    let (lower, upper) = bounds(env, lower_tick, upper_tick)?;
    if sqrt_price_x96 <= lower || amount0 <= 0 {
        return Ok(0);
    }
    Ok(liquidity_for_amount0(env, lower, sqrt_price_x96.min(upper), to_raw(amount0)?))
}

/// Liquidity that holds `amount0` issued tokens across the whole range,
/// as when the range sits entirely above spot
pub fn liquidity_for_issued(env: &Env, lower_tick: i32, upper_tick: i32, amount0: i128) -> Result<u128, VaultError> {
    let (lower, upper) = bounds(env, lower_tick, upper_tick)?;
    if amount0 <= 0 {
        return Ok(0);
    }
    Ok(liquidity_for_amount0(env, lower, upper, to_raw(amount0)?))
}
