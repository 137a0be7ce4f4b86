use crate::pool_ops;
use crate::storage::{get_checkpoint, get_last_rebalance, is_locked, set_checkpoint, set_locked, PriceCheckpoint};
use soroban_sdk::Env;
use vault_types::{ProtocolParameters, VaultConfig, VaultError, BPS};

/// Run `body` with the reentrancy lock held
pub fn non_reentrant<T>(env: &Env, body: impl FnOnce() -> Result<T, VaultError>) -> Result<T, VaultError> {
    if is_locked(env) {
        return Err(VaultError::ReentrantCall);
    }
    set_locked(env, true);
    let result = body();
    set_locked(env, false);
    result
}

/// Reject a rebalance inside the cooldown window
pub fn check_cooldown(env: &Env, params: &ProtocolParameters) -> Result<(), VaultError> {
    let last = get_last_rebalance(env);
    let now = env.ledger().timestamp();
    if now < last.timestamp.saturating_add(params.shift_cooldown) {
        return Err(VaultError::ShiftRateLimited);
    }
    Ok(())
}

/// Reject when spot sits too far from the time-weighted tick since the
/// stored checkpoint. A window younger than `min_twap_window` cannot vouch
/// for spot and is rejected as well.
pub fn check_twap(env: &Env, config: &VaultConfig, params: &ProtocolParameters) -> Result<(), VaultError> {
    if params.max_twap_deviation_ticks == 0 {
        return Ok(());
    }
    let checkpoint = get_checkpoint(env);
    let (tick_cumulative, now) = pool_ops::observe(env, &config.pool);
    let elapsed = now.saturating_sub(checkpoint.timestamp);
    if elapsed == 0 || elapsed < params.min_twap_window {
        return Err(VaultError::TwapDeviationExceeded);
    }

    let twap_tick = (tick_cumulative - checkpoint.tick_cumulative).div_euclid(elapsed as i64);
    let (_, spot_tick) = pool_ops::slot0(env, &config.pool);
    if (spot_tick as i64 - twap_tick).unsigned_abs() > params.max_twap_deviation_ticks as u64 {
        return Err(VaultError::TwapDeviationExceeded);
    }
    Ok(())
}

/// Start a new TWAP window at the pool's current cumulative
pub fn refresh_checkpoint(env: &Env, config: &VaultConfig) -> PriceCheckpoint {
    let (tick_cumulative, timestamp) = pool_ops::observe(env, &config.pool);
    let checkpoint = PriceCheckpoint {
        tick_cumulative,
        timestamp,
    };
    set_checkpoint(env, &checkpoint);
    checkpoint
}

/// Restart the TWAP window on request. The running window must have spanned
/// `min_twap_window` first, so a reset cannot be followed by a rebalance in
/// the same breath.
pub fn restart_checkpoint(
    env: &Env,
    config: &VaultConfig,
    params: &ProtocolParameters,
) -> Result<PriceCheckpoint, VaultError> {
    let age = env.ledger().timestamp().saturating_sub(get_checkpoint(env).timestamp);
    if age < params.min_twap_window {
        return Err(VaultError::ShiftRateLimited);
    }
    Ok(refresh_checkpoint(env, config))
}

/// Spot must not have moved more than `max_price_deviation_bps` across a rebalance
pub fn check_price_deviation(
    sqrt_price_before: u128,
    sqrt_price_after: u128,
    params: &ProtocolParameters,
) -> Result<(), VaultError> {
    let moved = sqrt_price_before.abs_diff(sqrt_price_after);
    // Half the price tolerance applied to the square root
    let allowed = sqrt_price_before / (2 * BPS as u128) * params.max_price_deviation_bps as u128;
    if moved > allowed {
        return Err(VaultError::ShiftPriceDeviationExceeded);
    }
    Ok(())
}
