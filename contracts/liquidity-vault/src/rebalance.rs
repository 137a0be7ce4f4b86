//! Bootstrap, shift and slide.
//!
//! Every rebalance withdraws Anchor and Discovery, re-lays them around the
//! current price and only then re-reads the model. The solvency check runs on
//! the finished layout; an `Err` from here rolls the whole invocation back.

use crate::guard;
use crate::lending;
use crate::model::{self, Tiers};
use crate::pool_ops;
use crate::positions::{add_reserve_to_floor, place_tier, pull_tier};
use crate::rewards::{calculate_rewards, volatility, RewardParams};
use crate::storage::{
    get_accrued_fees, get_last_rebalance, is_bootstrapped, set_accrued_fees, set_bootstrapped,
    set_last_rebalance, RebalanceMark,
};
use range_math::{
    aligned_tick_above, checked_sqrt_price_at_tick, floor_to_spacing, liquidity_for_absorption,
    liquidity_for_issued, liquidity_for_reserve, price_to_tick, sqrt_price_to_price, tick_to_price,
};
use soroban_fixed_point_math::FixedPoint;
use soroban_sdk::{Address, Env, Symbol};
use vault_types::{
    LiquidityPosition, ProtocolParameters, RewardsDue, ShiftOutcome, SlideOutcome, Tier, VaultConfig, VaultError,
    VaultSnapshot, BPS, SCALAR_7, WAD,
};

fn bps_of(amount: i128, bps: u32) -> Result<i128, VaultError> {
    amount
        .fixed_mul_floor(bps as i128, BPS)
        .ok_or(VaultError::MathOverflow)
}

/// Reserve the vault holds that is not owed to the dividends sink
fn free_reserve(env: &Env, config: &VaultConfig) -> i128 {
    (pool_ops::balance(env, &config.reserve_token) - get_accrued_fees(env)).max(0)
}

/// Close a rebalance: stamp the cooldown and open a fresh TWAP window
fn mark_rebalance(env: &Env, config: &VaultConfig, spot_price: i128) {
    set_last_rebalance(
        env,
        &RebalanceMark {
            timestamp: env.ledger().timestamp(),
            spot_price,
        },
    );
    guard::refresh_checkpoint(env, config);
}

/// Shift runs only while the ratio is strictly under `shift_ratio`
pub fn shift_due(liquidity_ratio: i128, params: &ProtocolParameters) -> bool {
    liquidity_ratio < params.shift_ratio
}

/// Slide runs only while something circulates and the ratio is strictly
/// over `slide_ratio`
pub fn slide_due(snapshot: &VaultSnapshot, params: &ProtocolParameters) -> bool {
    snapshot.circulating_supply > 0 && snapshot.liquidity_ratio > params.slide_ratio
}

/// Place Anchor over `[lower_tick, anchor_upper]` and Discovery above it.
///
/// Discovery is `discovery_bips` wide and holds at least
/// `discovery_supply_bps` of `circulating` in issued tokens, so buying has
/// to work through real depth before the ratio drops into the shift zone.
/// It is never thinner than the Anchor or `min_discovery_liquidity`.
#[allow(clippy::too_many_arguments)]
fn place_upper_tiers(
    env: &Env,
    config: &VaultConfig,
    params: &ProtocolParameters,
    lower_tick: i32,
    anchor_upper: i32,
    anchor_liquidity: u128,
    min_discovery_liquidity: u128,
    circulating: i128,
) -> Result<(LiquidityPosition, LiquidityPosition), VaultError> {
    let discovery_upper = aligned_tick_above(
        env,
        tick_to_price(env, anchor_upper)?,
        params.discovery_bips,
        config.tick_spacing,
    )?;
    let supply_target = bps_of(circulating, params.discovery_supply_bps)?;
    let supply_liquidity = liquidity_for_issued(env, anchor_upper, discovery_upper, supply_target)?;

    let anchor = LiquidityPosition::new(lower_tick, anchor_upper, anchor_liquidity);
    let discovery = LiquidityPosition::new(
        anchor_upper,
        discovery_upper,
        anchor_liquidity.max(min_discovery_liquidity).max(supply_liquidity),
    );
    place_tier(env, config, Tier::Anchor, &anchor)?;
    place_tier(env, config, Tier::Discovery, &discovery)?;
    Ok((anchor, discovery))
}

/// Seed the three tiers.
///
/// `reserve_amount` comes from `funder`; `circulating_amount` issued tokens
/// are minted to `recipient` as the opening public float. The Floor is one
/// tick spacing wide with its upper tick at or below `floor_price`.
#[allow(clippy::too_many_arguments)]
pub fn bootstrap(
    env: &Env,
    config: &VaultConfig,
    params: &ProtocolParameters,
    funder: &Address,
    reserve_amount: i128,
    floor_price: i128,
    recipient: &Address,
    circulating_amount: i128,
) -> Result<VaultSnapshot, VaultError> {
    if is_bootstrapped(env) {
        return Err(VaultError::AlreadyInitialized);
    }
    if reserve_amount <= 0 || circulating_amount < 0 || floor_price <= 0 {
        return Err(VaultError::InvalidParams);
    }

    let spacing = config.tick_spacing;
    let (sqrt_price_x96, _) = pool_ops::slot0(env, &config.pool);
    let spot_price = sqrt_price_to_price(env, sqrt_price_x96);
    let floor_upper = floor_to_spacing(price_to_tick(env, floor_price)?, spacing);
    // Floor must hold reserve only
    if checked_sqrt_price_at_tick(env, floor_upper)? >= sqrt_price_x96 {
        return Err(VaultError::InvalidParams);
    }

    pool_ops::pull(env, &config.reserve_token, funder, reserve_amount);
    if circulating_amount > 0 {
        pool_ops::mint_issued(env, &config.issued_token, recipient, circulating_amount);
    }

    let floor_reserve = bps_of(reserve_amount, params.floor_percentage)?;
    let floor_lower = floor_upper - spacing;
    let floor_liquidity = liquidity_for_reserve(env, floor_lower, floor_upper, sqrt_price_x96, floor_reserve)?;
    let (_, floor_paid) = place_tier(
        env,
        config,
        Tier::Floor,
        &LiquidityPosition::new(floor_lower, floor_upper, floor_liquidity),
    )?;

    let anchor_upper = aligned_tick_above(env, spot_price, params.shift_anchor_upper_bips, spacing)?;
    let anchor_liquidity = liquidity_for_reserve(
        env,
        floor_upper,
        anchor_upper,
        sqrt_price_x96,
        reserve_amount - floor_paid,
    )?;
    place_upper_tiers(
        env,
        config,
        params,
        floor_upper,
        anchor_upper,
        anchor_liquidity,
        0,
        circulating_amount,
    )?;

    set_bootstrapped(env);
    mark_rebalance(env, config, spot_price);

    let snapshot = model::enforce_solvency(env, config)?;
    env.events()
        .publish((Symbol::new(env, "bootstrap"), funder.clone()), snapshot.clone());
    Ok(snapshot)
}

/// Tighten the book when the liquidity ratio has fallen under `shift_ratio`.
///
/// Raises the Floor to the price its reserve can now defend, skims a slice of
/// the freed reserve for the caller and for staking rewards, re-lays Anchor
/// and Discovery just above the new Floor and runs one page of self-repay at
/// the new IMV.
pub fn shift(
    env: &Env,
    config: &VaultConfig,
    params: &ProtocolParameters,
    caller: &Address,
) -> Result<ShiftOutcome, VaultError> {
    if !is_bootstrapped(env) {
        return Err(VaultError::NotInitialized);
    }
    guard::check_cooldown(env, params)?;
    guard::check_twap(env, config, params)?;

    let tiers = Tiers::load(env);
    let (sqrt_before, spot_tick) = pool_ops::slot0(env, &config.pool);
    let before = model::snapshot_with(env, config, &tiers, sqrt_before)?;
    if !shift_due(before.liquidity_ratio, params) {
        return Err(VaultError::AboveThreshold);
    }

    let spacing = config.tick_spacing;
    let floor_cap = floor_to_spacing(spot_tick, spacing) - spacing;
    if floor_cap < tiers.floor.upper_tick {
        return Err(VaultError::Manipulated);
    }
    let spot_price = sqrt_price_to_price(env, sqrt_before);

    pull_tier(env, config, Tier::Anchor);
    pull_tier(env, config, Tier::Discovery);

    // Split what the upper tiers released
    let released = free_reserve(env, config);
    let skim = bps_of(released, params.skim_ratio)?;
    let caller_fee = bps_of(skim, params.caller_fee_bps)?;
    let skim_to_floor = skim - caller_fee;
    let anchor_reserve = bps_of(released - skim, params.anchor_percentage)?;
    let floor_add = released - skim - anchor_reserve;

    let anchor_estimate = anchor_reserve
        .fixed_div_floor(spot_price, WAD)
        .ok_or(VaultError::MathOverflow)?;
    let circulating = before.circulating_supply;
    let defended = if anchor_estimate < circulating {
        circulating - anchor_estimate
    } else {
        circulating
    };
    let candidate = if defended > 0 {
        (before.floor_balance + floor_add)
            .fixed_div_floor(defended, WAD)
            .ok_or(VaultError::MathOverflow)?
    } else {
        before.imv
    };
    let floor_deposit = floor_add + skim_to_floor;
    let raised = floor_to_spacing(price_to_tick(env, candidate.max(before.imv))?, spacing)
        .max(tiers.floor.upper_tick)
        .min(floor_cap);
    // A raised Floor spreads its reserve over a pricier range; it only moves
    // if its liquidity does not shrink
    let raised_liquidity = liquidity_for_reserve(
        env,
        raised - spacing,
        raised,
        sqrt_before,
        before.floor_balance + floor_deposit,
    )?;
    let floor_upper = if raised_liquidity >= tiers.floor.liquidity {
        raised
    } else {
        tiers.floor.upper_tick
    };
    let imv_after = tick_to_price(env, floor_upper)?;

    let self_repay = lending::self_repay(env, config, params, imv_after, floor_add)?;

    if floor_upper == tiers.floor.upper_tick {
        add_reserve_to_floor(env, config, floor_deposit)?;
    } else {
        let (_, held) = pull_tier(env, config, Tier::Floor);
        let floor_lower = floor_upper - spacing;
        let liquidity = liquidity_for_reserve(env, floor_lower, floor_upper, sqrt_before, held + floor_deposit)?;
        place_tier(
            env,
            config,
            Tier::Floor,
            &LiquidityPosition::new(floor_lower, floor_upper, liquidity),
        )?;
    }

    let anchor_upper = aligned_tick_above(env, spot_price, params.shift_anchor_upper_bips, spacing)?;
    let anchor_liquidity = liquidity_for_reserve(env, floor_upper, anchor_upper, sqrt_before, anchor_reserve)?;
    place_upper_tiers(
        env,
        config,
        params,
        floor_upper,
        anchor_upper,
        anchor_liquidity,
        0,
        circulating,
    )?;

    // Rewards
    if caller_fee > 0 {
        pool_ops::pay(env, &config.reserve_token, caller, caller_fee);
    }
    let dividends = get_accrued_fees(env);
    if dividends > 0 {
        pool_ops::pay(env, &config.reserve_token, &config.dividends_sink, dividends);
        set_accrued_fees(env, 0);
    }

    let laid_out = model::snapshot(env, config)?;
    let reward = calculate_rewards(&RewardParams {
        reserve_amount: skim_to_floor,
        imv: laid_out.imv,
        circulating: laid_out.circulating_supply,
        total_supply: pool_ops::total_supply(env, &config.issued_token),
        volatility: volatility(spot_price, get_last_rebalance(env).spot_price),
        kr: params.reward_kr,
        kv: params.reward_kv,
    })?;
    // Minted rewards circulate, so they must stay inside the headroom
    let staking_amount = reward.min(model::solvency_headroom(&laid_out) - 1).max(0);
    if staking_amount > 0 {
        pool_ops::mint_issued(env, &config.issued_token, &config.staking_sink, staking_amount);
    }

    let (sqrt_after, _) = pool_ops::slot0(env, &config.pool);
    guard::check_price_deviation(sqrt_before, sqrt_after, params)?;
    let after = model::enforce_solvency(env, config)?;
    mark_rebalance(env, config, spot_price);

    let rewards = RewardsDue {
        staking_amount,
        dividends_amount: dividends,
        caller_fee,
    };
    let outcome = ShiftOutcome {
        imv_before: before.imv,
        imv_after: after.imv,
        ratio_before: before.liquidity_ratio,
        ratio_after: after.liquidity_ratio,
        floor_balance: after.floor_balance,
        rewards: rewards.clone(),
        self_repay,
    };

    env.events()
        .publish((Symbol::new(env, "shift"), caller.clone()), outcome.clone());
    env.events().publish(
        (Symbol::new(env, "reward_due"), config.staking_sink.clone(), config.dividends_sink.clone()),
        rewards,
    );
    Ok(outcome)
}

/// Loosen the book when the liquidity ratio sits above `slide_ratio`.
///
/// The Floor is left alone. Anchor is rebuilt from the Floor's upper tick
/// with just enough absorption to bring the ratio to the midpoint between
/// 1.0 and `slide_ratio`; reserve it does not need stays in the vault.
pub fn slide(
    env: &Env,
    config: &VaultConfig,
    params: &ProtocolParameters,
    caller: &Address,
) -> Result<SlideOutcome, VaultError> {
    if !is_bootstrapped(env) {
        return Err(VaultError::NotInitialized);
    }
    guard::check_cooldown(env, params)?;
    guard::check_twap(env, config, params)?;

    let tiers = Tiers::load(env);
    let (sqrt_before, _) = pool_ops::slot0(env, &config.pool);
    let before = model::snapshot_with(env, config, &tiers, sqrt_before)?;
    if !slide_due(&before, params) {
        return Err(VaultError::BelowThreshold);
    }
    let spot_price = sqrt_price_to_price(env, sqrt_before);

    pull_tier(env, config, Tier::Anchor);
    pull_tier(env, config, Tier::Discovery);

    let target_capacity = before
        .circulating_supply
        .fixed_mul_floor(SCALAR_7 + params.slide_ratio, 2 * SCALAR_7)
        .ok_or(VaultError::MathOverflow)?;
    let anchor_target = (target_capacity - before.floor_capacity).max(0);

    let spacing = config.tick_spacing;
    let floor_upper = tiers.floor.upper_tick;
    let anchor_upper =
        aligned_tick_above(env, spot_price, params.slide_anchor_upper_bips, spacing)?.max(floor_upper + spacing);

    let wanted = liquidity_for_absorption(env, floor_upper, anchor_upper, sqrt_before, anchor_target)?;
    let affordable = liquidity_for_reserve(env, floor_upper, anchor_upper, sqrt_before, free_reserve(env, config))?;
    let anchor_liquidity = wanted.min(affordable);

    let (anchor, discovery) = place_upper_tiers(
        env,
        config,
        params,
        floor_upper,
        anchor_upper,
        anchor_liquidity,
        tiers.discovery.liquidity,
        before.circulating_supply,
    )?;

    let (sqrt_after, _) = pool_ops::slot0(env, &config.pool);
    guard::check_price_deviation(sqrt_before, sqrt_after, params)?;
    let after = model::enforce_solvency(env, config)?;
    mark_rebalance(env, config, spot_price);

    let outcome = SlideOutcome {
        ratio_before: before.liquidity_ratio,
        ratio_after: after.liquidity_ratio,
        anchor_liquidity: anchor.liquidity,
        discovery_liquidity: discovery.liquidity,
        parked_reserve: free_reserve(env, config),
    };
    env.events()
        .publish((Symbol::new(env, "slide"), caller.clone()), outcome.clone());
    Ok(outcome)
}
