use crate::full_math::{mul_div, mul_div_rounding_up};
use crate::sqrt_price_math::{
    amount0_delta, amount1_delta, next_sqrt_price_from_input, next_sqrt_price_from_output,
};
use soroban_sdk::Env;

const FEE_DENOMINATOR: u128 = 1_000_000;

/// Outcome of swapping inside one initialized-tick interval
#[derive(Clone, Debug)]
pub struct SwapStep {
    pub sqrt_price_next_x96: u128,
    pub amount_in: u128,
    pub amount_out: u128,
    pub fee_amount: u128,
}

/// Input needed to move the price from `from` to `to`
fn input_between(env: &Env, from: u128, to: u128, liquidity: u128, zero_for_one: bool) -> u128 {
    if zero_for_one {
        amount0_delta(env, to, from, liquidity, true)
    } else {
        amount1_delta(env, from, to, liquidity, true)
    }
}

/// Output released moving the price from `from` to `to`
fn output_between(env: &Env, from: u128, to: u128, liquidity: u128, zero_for_one: bool) -> u128 {
    if zero_for_one {
        amount1_delta(env, to, from, liquidity, false)
    } else {
        amount0_delta(env, from, to, liquidity, false)
    }
}

/// Swap toward `sqrt_price_target_x96` with `amount_remaining`
/// (positive = exact input, negative = exact output) and a fee in pips
pub fn compute_swap_step(
    env: &Env,
    sqrt_price_current_x96: u128,
    sqrt_price_target_x96: u128,
    liquidity: u128,
    amount_remaining: i128,
    fee_pips: u32,
) -> SwapStep {
    let zero_for_one = sqrt_price_current_x96 >= sqrt_price_target_x96;
    let exact_in = amount_remaining >= 0;
    let fee = fee_pips as u128;
    let current = sqrt_price_current_x96;
    let target = sqrt_price_target_x96;

    let next = if exact_in {
        let available = mul_div(env, amount_remaining as u128, FEE_DENOMINATOR - fee, FEE_DENOMINATOR);
        if available >= input_between(env, current, target, liquidity, zero_for_one) {
            target
        } else {
            next_sqrt_price_from_input(env, current, liquidity, available, zero_for_one)
        }
    } else {
        let wanted = amount_remaining.unsigned_abs();
        if wanted >= output_between(env, current, target, liquidity, zero_for_one) {
            target
        } else {
            next_sqrt_price_from_output(env, current, liquidity, wanted, zero_for_one)
        }
    };

    let amount_in = input_between(env, current, next, liquidity, zero_for_one);
    let mut amount_out = output_between(env, current, next, liquidity, zero_for_one);
    if !exact_in {
        amount_out = amount_out.min(amount_remaining.unsigned_abs());
    }

    let fee_amount = if exact_in && next != target {
        // Whatever the step could not use is kept as fee
        (amount_remaining as u128) - amount_in
    } else {
        mul_div_rounding_up(env, amount_in, fee, FEE_DENOMINATOR - fee)
    };

    SwapStep {
        sqrt_price_next_x96: next,
        amount_in,
        amount_out,
        fee_amount,
    }
}
