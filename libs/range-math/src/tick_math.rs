use soroban_sdk::{Env, U256};
use vault_types::{VaultError, MAX_SQRT_RATIO, MAX_TICK, MIN_SQRT_RATIO, MIN_TICK};

/// 1 / sqrt(1.0001^(2^i)) in Q128, for bit i of |tick|
const INVERSE_SQRT_POWERS: [u128; 19] = [
    0xfffcb933bd6fad37aa2d162d1a594001,
    0xfff97272373d413259a46990580e213a,
    0xfff2e50f5f656932ef12357cf3c7fdcc,
    0xffe5caca7e10e4e61c3624eaa0941cd0,
    0xffcb9843d60f6159c9db58835c926644,
    0xff973b41fa98c081472e6896dfb254c0,
    0xff2ea16466c96a3843ec78b326b52861,
    0xfe5dee046a99a2a811c461f1969c3053,
    0xfcbe86c7900a88aedcffc83b479aa3a4,
    0xf987a7253ac413176f2b074cf7815e54,
    0xf3392b0822b70005940c7a398e4b70f3,
    0xe7159475a2c29b7443b29c7fa6e889d9,
    0xd097f3bdfd2022b8845ad8f792aa5825,
    0xa9f746462d870fdf8a65dc1f90e061e5,
    0x70d869a156d2a1b890bb3df62baf32f7,
    0x31be135f97d08fd981231505542fcfa6,
    0x9aa508b5b7a84e1c677de54f3e99bc9,
    0x5d6af8dedb81196699c329225ee604,
    0x2216e584f5fa1ea926041bedfe98,
];

fn q128(env: &Env) -> U256 {
    U256::from_u128(env, 1u128 << 64).mul(&U256::from_u128(env, 1u128 << 64))
}

fn u256_max(env: &Env) -> U256 {
    U256::from_u128(env, u128::MAX)
        .mul(&q128(env))
        .add(&U256::from_u128(env, u128::MAX))
}

/// sqrt(1.0001^tick) * 2^96
pub fn sqrt_price_at_tick(env: &Env, tick: i32) -> u128 {
    if !(MIN_TICK..=MAX_TICK).contains(&tick) {
        panic!("Tick out of bounds");
    }

    let abs_tick = tick.unsigned_abs();
    let one = q128(env);
    let mut ratio = one.clone();
    for (bit, factor) in INVERSE_SQRT_POWERS.iter().enumerate() {
        if abs_tick & (1u32 << bit) != 0 {
            ratio = ratio.mul(&U256::from_u128(env, *factor)).div(&one);
        }
    }

    // The table walks toward lower prices; flip for positive ticks
    if tick > 0 {
        ratio = u256_max(env).div(&ratio);
    }

    // Q128 -> Q96
    let shifted = ratio.div(&U256::from_u128(env, 1u128 << 32));
    shifted
        .to_u128()
        .unwrap_or(u128::MAX)
        .clamp(MIN_SQRT_RATIO, MAX_SQRT_RATIO)
}

/// Same as `sqrt_price_at_tick` but reports bad ticks as `InvalidTick`
pub fn checked_sqrt_price_at_tick(env: &Env, tick: i32) -> Result<u128, VaultError> {
    if !(MIN_TICK..=MAX_TICK).contains(&tick) {
        return Err(VaultError::InvalidTick);
    }
    Ok(sqrt_price_at_tick(env, tick))
}

/// Greatest tick whose sqrt price is at or below `sqrt_price_x96`
pub fn tick_at_sqrt_price(env: &Env, sqrt_price_x96: u128) -> i32 {
    if !(MIN_SQRT_RATIO..MAX_SQRT_RATIO).contains(&sqrt_price_x96) {
        panic!("sqrt price out of bounds");
    }

    let mut low = MIN_TICK;
    let mut high = MAX_TICK;
    while low < high {
        let mid = low + (high - low + 1) / 2;
        if sqrt_price_at_tick(env, mid) <= sqrt_price_x96 {
            low = mid;
        } else {
            high = mid - 1;
        }
    }
    low
}
