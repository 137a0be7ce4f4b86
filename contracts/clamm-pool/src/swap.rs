use crate::oracle;
use crate::storage::{get_config, get_state, set_state, MAX_TICK_CROSSINGS_PER_SWAP};
use crate::tick::{cross, next_initialized_tick};
use range_math::{add_delta, compute_swap_step, sqrt_price_at_tick, tick_at_sqrt_price};
use soroban_sdk::{token, Address, Env};
use vault_types::{SwapResult, MAX_SQRT_RATIO, MIN_SQRT_RATIO};

/// Execute a swap for `trader`.
///
/// `amount_specified` is positive for exact input and negative for exact
/// output. A zero `sqrt_price_limit_x96` means no limit. The swap stops early
/// after `MAX_TICK_CROSSINGS_PER_SWAP` initialized ticks.
pub fn execute_swap(
    env: &Env,
    trader: &Address,
    zero_for_one: bool,
    amount_specified: i128,
    sqrt_price_limit_x96: u128,
) -> SwapResult {
    if amount_specified == 0 {
        panic!("Amount must be non-zero");
    }

    let config = get_config(env);
    let mut state = get_state(env);
    oracle::advance(env, &mut state);

    let sqrt_price_limit = match sqrt_price_limit_x96 {
        0 if zero_for_one => MIN_SQRT_RATIO + 1,
        0 => MAX_SQRT_RATIO - 1,
        limit => limit,
    };
    let limit_ok = if zero_for_one {
        sqrt_price_limit < state.sqrt_price_x96 && sqrt_price_limit > MIN_SQRT_RATIO
    } else {
        sqrt_price_limit > state.sqrt_price_x96 && sqrt_price_limit < MAX_SQRT_RATIO
    };
    if !limit_ok {
        panic!("Invalid price limit");
    }

    let exact_input = amount_specified > 0;
    let mut amount_remaining = amount_specified;
    let mut amount_calculated: i128 = 0;
    let mut fees: i128 = 0;
    let mut tick_crossings: u32 = 0;

    while amount_remaining != 0
        && state.sqrt_price_x96 != sqrt_price_limit
        && tick_crossings < MAX_TICK_CROSSINGS_PER_SWAP
    {
        let (tick_next, initialized) = next_initialized_tick(env, state.tick, zero_for_one);
        let sqrt_price_next = sqrt_price_at_tick(env, tick_next);
        let target = if zero_for_one {
            sqrt_price_next.max(sqrt_price_limit)
        } else {
            sqrt_price_next.min(sqrt_price_limit)
        };

        let step = compute_swap_step(
            env,
            state.sqrt_price_x96,
            target,
            state.liquidity,
            amount_remaining,
            config.fee,
        );

        if exact_input {
            amount_remaining -= (step.amount_in + step.fee_amount) as i128;
            amount_calculated -= step.amount_out as i128;
        } else {
            amount_remaining += step.amount_out as i128;
            amount_calculated += (step.amount_in + step.fee_amount) as i128;
        }
        fees += step.fee_amount as i128;
        state.sqrt_price_x96 = step.sqrt_price_next_x96;

        if state.sqrt_price_x96 == sqrt_price_next {
            if initialized {
                let liquidity_net = cross(env, tick_next);
                let liquidity_net = if zero_for_one { -liquidity_net } else { liquidity_net };
                state.liquidity = add_delta(state.liquidity, liquidity_net);
                tick_crossings += 1;
            }
            state.tick = if zero_for_one { tick_next - 1 } else { tick_next };
        } else {
            state.tick = tick_at_sqrt_price(env, state.sqrt_price_x96);
        }
    }

    if zero_for_one {
        state.protocol_fees_0 += fees;
    } else {
        state.protocol_fees_1 += fees;
    }
    set_state(env, &state);

    let (amount0, amount1) = if zero_for_one == exact_input {
        (amount_specified - amount_remaining, amount_calculated)
    } else {
        (amount_calculated, amount_specified - amount_remaining)
    };

    let token0 = token::Client::new(env, &config.token0);
    let token1 = token::Client::new(env, &config.token1);
    let pool = env.current_contract_address();
    if amount0 > 0 {
        token0.transfer(trader, &pool, &amount0);
    }
    if amount1 > 0 {
        token1.transfer(trader, &pool, &amount1);
    }
    if amount0 < 0 {
        token0.transfer(&pool, trader, &(-amount0));
    }
    if amount1 < 0 {
        token1.transfer(&pool, trader, &(-amount1));
    }

    SwapResult {
        amount0,
        amount1,
        sqrt_price_x96: state.sqrt_price_x96,
        tick: state.tick,
    }
}
