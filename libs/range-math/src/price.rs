use crate::full_math::{checked_mul_div, mul_div};
use crate::tick_math::{checked_sqrt_price_at_tick, tick_at_sqrt_price};
use soroban_fixed_point_math::FixedPoint;
use soroban_sdk::Env;
use vault_types::{VaultError, BPS, MAX_SQRT_RATIO, MAX_TICK, MIN_SQRT_RATIO, MIN_TICK, Q96, WAD};

const WAD_U128: u128 = WAD as u128;
const SQRT_WAD: u128 = 1_000_000_000;

/// Integer square root, rounded down
pub fn isqrt(n: u128) -> u128 {
    if n < 2 {
        return n;
    }
    let bits = 128 - n.leading_zeros();
    let mut x = 1u128 << bits.div_ceil(2);
    loop {
        let y = (x + n / x) / 2;
        if y >= x {
            return x;
        }
        x = y;
    }
}

/// Q64.96 sqrt price -> WAD price of token0 in token1
pub fn sqrt_price_to_price(env: &Env, sqrt_price_x96: u128) -> i128 {
    let root = mul_div(env, sqrt_price_x96, WAD_U128, Q96);
    // root < 2^32 * WAD so the square stays inside i128
    mul_div(env, root, root, WAD_U128) as i128
}

/// WAD price -> Q64.96 sqrt price, rounded down
pub fn price_to_sqrt_price(env: &Env, price: i128) -> Result<u128, VaultError> {
    if price <= 0 {
        return Err(VaultError::InvalidParams);
    }
    let price = price as u128;
    let root = match price.checked_mul(WAD_U128) {
        Some(scaled) => isqrt(scaled),
        None => isqrt(price) * SQRT_WAD,
    };
    checked_mul_div(env, root, Q96, WAD_U128).ok_or(VaultError::MathOverflow)
}

pub fn tick_to_price(env: &Env, tick: i32) -> Result<i128, VaultError> {
    Ok(sqrt_price_to_price(env, checked_sqrt_price_at_tick(env, tick)?))
}

/// Greatest tick whose WAD price does not exceed `price`
pub fn price_to_tick(env: &Env, price: i128) -> Result<i32, VaultError> {
    let sqrt_price = price_to_sqrt_price(env, price)?;
    if !(MIN_SQRT_RATIO..MAX_SQRT_RATIO).contains(&sqrt_price) {
        return Err(VaultError::InvalidTick);
    }

    // The square root lands within a tick; settle against the WAD price itself
    let mut tick = tick_at_sqrt_price(env, sqrt_price);
    while tick > MIN_TICK && tick_to_price(env, tick)? > price {
        tick -= 1;
    }
    while tick < MAX_TICK && tick_to_price(env, tick + 1)? <= price {
        tick += 1;
    }
    Ok(tick)
}

pub fn floor_to_spacing(tick: i32, tick_spacing: i32) -> i32 {
    tick.div_euclid(tick_spacing) * tick_spacing
}

pub fn ceil_to_spacing(tick: i32, tick_spacing: i32) -> i32 {
    let floored = floor_to_spacing(tick, tick_spacing);
    if floored == tick {
        floored
    } else {
        floored + tick_spacing
    }
}

/// `price * (1 + bips / 10_000)`
pub fn price_plus_bips(price: i128, bips: u32) -> Result<i128, VaultError> {
    price
        .fixed_mul_floor(BPS + bips as i128, BPS)
        .ok_or(VaultError::MathOverflow)
}

/// First spacing-aligned tick strictly above the tick at `price * (1 + bips)`
pub fn aligned_tick_above(env: &Env, price: i128, bips: u32, tick_spacing: i32) -> Result<i32, VaultError> {
    let tick = price_to_tick(env, price_plus_bips(price, bips)?)?;
    let aligned = floor_to_spacing(tick, tick_spacing) + tick_spacing;
    if aligned > floor_to_spacing(MAX_TICK, tick_spacing) {
        return Err(VaultError::InvalidTick);
    }
    Ok(aligned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use soroban_sdk::Env;

    // === isqrt ===

    #[test]
    fn test_isqrt() {
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(1), 1);
        assert_eq!(isqrt(15), 3);
        assert_eq!(isqrt(16), 4);
        assert_eq!(isqrt(u128::MAX), u64::MAX as u128);
    }

    // === price <-> tick ===

    #[test]
    fn test_unit_price_is_tick_zero() {
        let env = Env::default();
        assert_eq!(tick_to_price(&env, 0), Ok(WAD));
        assert_eq!(price_to_tick(&env, WAD), Ok(0));
    }

    #[test]
    fn test_price_to_tick_rounds_down() {
        let env = Env::default();
        let half = WAD / 2;
        let tick = price_to_tick(&env, half).unwrap();
        assert!(tick_to_price(&env, tick).unwrap() <= half);
        assert!(tick_to_price(&env, tick + 1).unwrap() > half);
        // 1.0001^-6932 ~= 0.49999
        assert!((-6932..=-6931).contains(&tick));
    }

    #[test]
    fn test_tick_price_tick_is_identity() {
        let env = Env::default();
        for tick in [-69_060, -6_960, -60, 60, 960, 46_080] {
            let price = tick_to_price(&env, tick).unwrap();
            assert_eq!(price_to_tick(&env, price), Ok(tick));
        }
    }

    #[test]
    fn test_non_positive_price_rejected() {
        let env = Env::default();
        assert_eq!(price_to_tick(&env, 0), Err(VaultError::InvalidParams));
        assert_eq!(price_to_sqrt_price(&env, -5), Err(VaultError::InvalidParams));
    }

    #[test]
    fn test_tick_out_of_range_rejected() {
        let env = Env::default();
        assert_eq!(tick_to_price(&env, MAX_TICK + 1), Err(VaultError::InvalidTick));
    }

    // === spacing ===

    #[test]
    fn test_spacing_alignment_handles_negative_ticks() {
        assert_eq!(floor_to_spacing(-6931, 60), -6960);
        assert_eq!(ceil_to_spacing(-6931, 60), -6900);
        assert_eq!(floor_to_spacing(120, 60), 120);
        assert_eq!(ceil_to_spacing(121, 60), 180);
    }

    #[test]
    fn test_aligned_tick_above_ten_percent() {
        let env = Env::default();
        // 1.1 ~= tick 953, next aligned boundary is 960
        assert_eq!(aligned_tick_above(&env, WAD, 1_000, 60), Ok(960));
    }
}
