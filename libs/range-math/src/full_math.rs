use soroban_sdk::{Env, U256};

/// floor(a * b / denominator) with a 256-bit intermediate
pub fn mul_div(env: &Env, a: u128, b: u128, denominator: u128) -> u128 {
    checked_mul_div(env, a, b, denominator).unwrap_or_else(|| panic!("mul_div overflow"))
}

/// ceil(a * b / denominator) with a 256-bit intermediate
pub fn mul_div_rounding_up(env: &Env, a: u128, b: u128, denominator: u128) -> u128 {
    if denominator == 0 {
        panic!("Division by zero");
    }
    let product = U256::from_u128(env, a).mul(&U256::from_u128(env, b));
    let quotient = div_up_u256(env, &product, &U256::from_u128(env, denominator));
    quotient
        .to_u128()
        .unwrap_or_else(|| panic!("mul_div overflow"))
}

/// floor(a * b / denominator), None when the quotient does not fit u128
pub fn checked_mul_div(env: &Env, a: u128, b: u128, denominator: u128) -> Option<u128> {
    if denominator == 0 {
        panic!("Division by zero");
    }
    let product = U256::from_u128(env, a).mul(&U256::from_u128(env, b));
    product.div(&U256::from_u128(env, denominator)).to_u128()
}

/// Unsigned division with rounding up
pub fn div_rounding_up(a: u128, b: u128) -> u128 {
    if b == 0 {
        panic!("Division by zero");
    }
    if a == 0 {
        return 0;
    }
    (a - 1) / b + 1
}

/// ceil(a / b) on 256-bit values
pub fn div_up_u256(env: &Env, a: &U256, b: &U256) -> U256 {
    let zero = U256::from_u32(env, 0);
    if *b == zero {
        panic!("Division by zero");
    }
    let quotient = a.div(b);
    if a.rem_euclid(b) > zero {
        quotient.add(&U256::from_u32(env, 1))
    } else {
        quotient
    }
}

/// Narrow a 256-bit value, panicking past u128::MAX
pub fn u256_to_u128(value: &U256) -> u128 {
    value
        .to_u128()
        .unwrap_or_else(|| panic!("U256 overflow when converting to u128"))
}
