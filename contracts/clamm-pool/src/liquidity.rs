use crate::oracle;
use crate::storage::{get_config, get_position, get_state, set_position, set_state};
use crate::tick::update as update_tick;
use range_math::{add_delta, amounts_for_liquidity, sqrt_price_at_tick};
use soroban_sdk::{token, Address, Env};
use vault_types::{PositionKey, MAX_TICK, MIN_TICK};

/// Add liquidity to `owner`'s position, pulling the rounded-up token amounts
pub fn mint(env: &Env, owner: Address, tick_lower: i32, tick_upper: i32, amount: u128) -> (u128, u128) {
    if amount == 0 {
        panic!("Amount must be non-zero");
    }

    let config = get_config(env);
    let mut state = get_state(env);
    validate_ticks(tick_lower, tick_upper, config.tick_spacing);
    oracle::advance(env, &mut state);

    let (amount0, amount1) = amounts_for_liquidity(
        env,
        state.sqrt_price_x96,
        sqrt_price_at_tick(env, tick_lower),
        sqrt_price_at_tick(env, tick_upper),
        amount,
        true,
    );

    update_tick(env, tick_lower, amount as i128, false, config.max_liquidity_per_tick);
    update_tick(env, tick_upper, amount as i128, true, config.max_liquidity_per_tick);

    let key = PositionKey {
        owner: owner.clone(),
        tick_lower,
        tick_upper,
    };
    let mut position = get_position(env, &key);
    position.liquidity = add_delta(position.liquidity, amount as i128);
    set_position(env, &key, &position);

    if state.tick >= tick_lower && state.tick < tick_upper {
        state.liquidity = add_delta(state.liquidity, amount as i128);
    }
    set_state(env, &state);

    let pool = env.current_contract_address();
    if amount0 > 0 {
        token::Client::new(env, &config.token0).transfer(&owner, &pool, &(amount0 as i128));
    }
    if amount1 > 0 {
        token::Client::new(env, &config.token1).transfer(&owner, &pool, &(amount1 as i128));
    }

    (amount0, amount1)
}

/// Remove liquidity from `owner`'s position. The released tokens are
/// credited as owed and leave the pool only on `collect`.
pub fn burn(env: &Env, owner: Address, tick_lower: i32, tick_upper: i32, amount: u128) -> (u128, u128) {
    let config = get_config(env);
    let mut state = get_state(env);
    validate_ticks(tick_lower, tick_upper, config.tick_spacing);

    let key = PositionKey {
        owner,
        tick_lower,
        tick_upper,
    };
    let mut position = get_position(env, &key);
    if amount > position.liquidity {
        panic!("Insufficient position liquidity");
    }
    if amount == 0 {
        return (0, 0);
    }
    oracle::advance(env, &mut state);

    let (amount0, amount1) = amounts_for_liquidity(
        env,
        state.sqrt_price_x96,
        sqrt_price_at_tick(env, tick_lower),
        sqrt_price_at_tick(env, tick_upper),
        amount,
        false,
    );

    update_tick(env, tick_lower, -(amount as i128), false, config.max_liquidity_per_tick);
    update_tick(env, tick_upper, -(amount as i128), true, config.max_liquidity_per_tick);

    if state.tick >= tick_lower && state.tick < tick_upper {
        state.liquidity = add_delta(state.liquidity, -(amount as i128));
    }
    set_state(env, &state);

    position.liquidity -= amount;
    position.tokens_owed_0 += amount0;
    position.tokens_owed_1 += amount1;
    set_position(env, &key, &position);

    (amount0, amount1)
}

/// Send up to the requested owed amounts to `recipient`
pub fn collect(
    env: &Env,
    owner: Address,
    recipient: Address,
    tick_lower: i32,
    tick_upper: i32,
    amount0_requested: u128,
    amount1_requested: u128,
) -> (u128, u128) {
    let config = get_config(env);
    let key = PositionKey {
        owner,
        tick_lower,
        tick_upper,
    };
    let mut position = get_position(env, &key);

    let amount0 = amount0_requested.min(position.tokens_owed_0);
    let amount1 = amount1_requested.min(position.tokens_owed_1);
    position.tokens_owed_0 -= amount0;
    position.tokens_owed_1 -= amount1;
    set_position(env, &key, &position);

    let pool = env.current_contract_address();
    if amount0 > 0 {
        token::Client::new(env, &config.token0).transfer(&pool, &recipient, &(amount0 as i128));
    }
    if amount1 > 0 {
        token::Client::new(env, &config.token1).transfer(&pool, &recipient, &(amount1 as i128));
    }

    (amount0, amount1)
}

fn validate_ticks(tick_lower: i32, tick_upper: i32, tick_spacing: i32) {
    if tick_lower >= tick_upper {
        panic!("tick_lower must be less than tick_upper");
    }
    if tick_lower < MIN_TICK {
        panic!("tick_lower too low");
    }
    if tick_upper > MAX_TICK {
        panic!("tick_upper too high");
    }
    if tick_lower % tick_spacing != 0 || tick_upper % tick_spacing != 0 {
        panic!("tick not on spacing");
    }
}
