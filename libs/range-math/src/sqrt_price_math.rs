use crate::full_math::{div_up_u256, mul_div, mul_div_rounding_up, u256_to_u128};
use soroban_sdk::{Env, U256};
use vault_types::Q96;

fn sorted(a: u128, b: u128) -> (u128, u128) {
    if a > b {
        (b, a)
    } else {
        (a, b)
    }
}

/// Token0 moved across a price interval:
/// L * (sqrt_upper - sqrt_lower) / (sqrt_upper * sqrt_lower), in Q96 terms
pub fn amount0_delta(
    env: &Env,
    sqrt_ratio_a_x96: u128,
    sqrt_ratio_b_x96: u128,
    liquidity: u128,
    round_up: bool,
) -> u128 {
    let (lower, upper) = sorted(sqrt_ratio_a_x96, sqrt_ratio_b_x96);
    if lower == 0 {
        panic!("sqrt_ratio_lower cannot be zero");
    }
    if liquidity == 0 || lower == upper {
        return 0;
    }

    // Divide by the lower bound before scaling by Q96 so liquidity above
    // 2^32 never needs a 384-bit intermediate
    let span = U256::from_u128(env, liquidity).mul(&U256::from_u128(env, upper - lower));
    let lower_256 = U256::from_u128(env, lower);
    let upper_256 = U256::from_u128(env, upper);
    let q96 = U256::from_u128(env, Q96);

    let amount = if round_up {
        let partial = div_up_u256(env, &span, &lower_256);
        div_up_u256(env, &partial.mul(&q96), &upper_256)
    } else {
        span.div(&lower_256).mul(&q96).div(&upper_256)
    };
    u256_to_u128(&amount)
}

/// Token1 moved across a price interval: L * (sqrt_upper - sqrt_lower)
pub fn amount1_delta(
    env: &Env,
    sqrt_ratio_a_x96: u128,
    sqrt_ratio_b_x96: u128,
    liquidity: u128,
    round_up: bool,
) -> u128 {
    let (lower, upper) = sorted(sqrt_ratio_a_x96, sqrt_ratio_b_x96);
    if round_up {
        mul_div_rounding_up(env, liquidity, upper - lower, Q96)
    } else {
        mul_div(env, liquidity, upper - lower, Q96)
    }
}

/// Price after `amount_in` enters the pool
pub fn next_sqrt_price_from_input(
    env: &Env,
    sqrt_price_x96: u128,
    liquidity: u128,
    amount_in: u128,
    zero_for_one: bool,
) -> u128 {
    if sqrt_price_x96 == 0 || liquidity == 0 {
        panic!("Invalid inputs");
    }
    if zero_for_one {
        next_sqrt_price_from_amount0(env, sqrt_price_x96, liquidity, amount_in, true)
    } else {
        next_sqrt_price_from_amount1(env, sqrt_price_x96, liquidity, amount_in, true)
    }
}

/// Price after `amount_out` leaves the pool
pub fn next_sqrt_price_from_output(
    env: &Env,
    sqrt_price_x96: u128,
    liquidity: u128,
    amount_out: u128,
    zero_for_one: bool,
) -> u128 {
    if sqrt_price_x96 == 0 || liquidity == 0 {
        panic!("Invalid inputs");
    }
    if zero_for_one {
        next_sqrt_price_from_amount1(env, sqrt_price_x96, liquidity, amount_out, false)
    } else {
        next_sqrt_price_from_amount0(env, sqrt_price_x96, liquidity, amount_out, false)
    }
}

/// L * sqrt_p / (L +- amount * sqrt_p), rounded up
fn next_sqrt_price_from_amount0(
    env: &Env,
    sqrt_price_x96: u128,
    liquidity: u128,
    amount: u128,
    add: bool,
) -> u128 {
    if amount == 0 {
        return sqrt_price_x96;
    }

    let numerator = U256::from_u128(env, liquidity).mul(&U256::from_u128(env, Q96));
    let price = U256::from_u128(env, sqrt_price_x96);
    let product = U256::from_u128(env, amount).mul(&price);

    let denominator = if add {
        numerator.add(&product)
    } else {
        if numerator <= product {
            panic!("Denominator underflow");
        }
        numerator.sub(&product)
    };
    u256_to_u128(&div_up_u256(env, &numerator.mul(&price), &denominator))
}

/// sqrt_p +- amount / L, rounded down
fn next_sqrt_price_from_amount1(
    env: &Env,
    sqrt_price_x96: u128,
    liquidity: u128,
    amount: u128,
    add: bool,
) -> u128 {
    if add {
        sqrt_price_x96 + mul_div(env, amount, Q96, liquidity)
    } else {
        let quotient = mul_div_rounding_up(env, amount, Q96, liquidity);
        if sqrt_price_x96 <= quotient {
            panic!("sqrt_price underflow");
        }
        sqrt_price_x96 - quotient
    }
}
