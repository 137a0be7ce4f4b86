use crate::full_math::{mul_div, u256_to_u128};
use crate::sqrt_price_math::{amount0_delta, amount1_delta};
use soroban_sdk::{Env, U256};
use vault_types::Q96;

fn sorted(a: u128, b: u128) -> (u128, u128) {
    if a > b {
        (b, a)
    } else {
        (a, b)
    }
}

/// Liquidity that `amount0` provides across the interval, rounded down
/// L = amount0 * sqrt_lower * sqrt_upper / (sqrt_upper - sqrt_lower)
pub fn liquidity_for_amount0(env: &Env, sqrt_ratio_a_x96: u128, sqrt_ratio_b_x96: u128, amount0: u128) -> u128 {
    let (lower, upper) = sorted(sqrt_ratio_a_x96, sqrt_ratio_b_x96);
    if lower == upper {
        return 0;
    }
    let scaled = U256::from_u128(env, amount0)
        .mul(&U256::from_u128(env, lower))
        .div(&U256::from_u128(env, upper - lower));
    u256_to_u128(
        &scaled
            .mul(&U256::from_u128(env, upper))
            .div(&U256::from_u128(env, Q96)),
    )
}

/// Liquidity that `amount1` provides across the interval, rounded down
/// L = amount1 / (sqrt_upper - sqrt_lower)
pub fn liquidity_for_amount1(env: &Env, sqrt_ratio_a_x96: u128, sqrt_ratio_b_x96: u128, amount1: u128) -> u128 {
    let (lower, upper) = sorted(sqrt_ratio_a_x96, sqrt_ratio_b_x96);
    if lower == upper {
        return 0;
    }
    mul_div(env, amount1, Q96, upper - lower)
}

/// Largest liquidity both amounts can fund at the current price
pub fn liquidity_for_amounts(
    env: &Env,
    sqrt_ratio_x96: u128,
    sqrt_ratio_a_x96: u128,
    sqrt_ratio_b_x96: u128,
    amount0: u128,
    amount1: u128,
) -> u128 {
    let (lower, upper) = sorted(sqrt_ratio_a_x96, sqrt_ratio_b_x96);
    if sqrt_ratio_x96 <= lower {
        liquidity_for_amount0(env, lower, upper, amount0)
    } else if sqrt_ratio_x96 < upper {
        let from0 = liquidity_for_amount0(env, sqrt_ratio_x96, upper, amount0);
        let from1 = liquidity_for_amount1(env, lower, sqrt_ratio_x96, amount1);
        from0.min(from1)
    } else {
        liquidity_for_amount1(env, lower, upper, amount1)
    }
}

/// Token amounts represented by `liquidity` at the current price.
///
/// Rounded down this is what a burn pays out, rounded up it is what a mint
/// charges. Pool and vault both go through here so their figures agree.
pub fn amounts_for_liquidity(
    env: &Env,
    sqrt_ratio_x96: u128,
    sqrt_ratio_a_x96: u128,
    sqrt_ratio_b_x96: u128,
    liquidity: u128,
    round_up: bool,
) -> (u128, u128) {
    let (lower, upper) = sorted(sqrt_ratio_a_x96, sqrt_ratio_b_x96);
    if sqrt_ratio_x96 <= lower {
        (amount0_delta(env, lower, upper, liquidity, round_up), 0)
    } else if sqrt_ratio_x96 < upper {
        (
            amount0_delta(env, sqrt_ratio_x96, upper, liquidity, round_up),
            amount1_delta(env, lower, sqrt_ratio_x96, liquidity, round_up),
        )
    } else {
        (0, amount1_delta(env, lower, upper, liquidity, round_up))
    }
}

/// Apply a signed liquidity delta
pub fn add_delta(liquidity: u128, delta: i128) -> u128 {
    if delta < 0 {
        liquidity
            .checked_sub(delta.unsigned_abs())
            .unwrap_or_else(|| panic!("Liquidity underflow"))
    } else {
        liquidity
            .checked_add(delta as u128)
            .unwrap_or_else(|| panic!("Liquidity overflow"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soroban_sdk::Env;

    // === add_delta ===

    #[test]
    fn test_add_delta() {
        assert_eq!(add_delta(100, 50), 150);
        assert_eq!(add_delta(100, -100), 0);
    }

    #[test]
    #[should_panic(expected = "Liquidity underflow")]
    fn test_add_delta_underflow() {
        add_delta(0, -1);
    }

    // === liquidity <-> amounts ===

    #[test]
    fn test_amount1_liquidity_is_recovered_by_rounded_up_mint() {
        let env = Env::default();
        let lower = Q96 / 2;
        let upper = Q96;
        let amount1 = 3_510_000_000_000u128;
        let liquidity = liquidity_for_amount1(&env, lower, upper, amount1);

        // Above the range the position is all token1
        let (charge0, charge1) = amounts_for_liquidity(&env, upper, lower, upper, liquidity, true);
        assert_eq!(charge0, 0);
        assert!(charge1 <= amount1);
        assert!(amount1 - charge1 <= 1);
    }

    #[test]
    fn test_burn_never_pays_more_than_mint_charged() {
        let env = Env::default();
        let lower = Q96 * 9 / 10;
        let upper = Q96 * 11 / 10;
        let liquidity = 987_654_321_012_345u128;

        let (minted0, minted1) = amounts_for_liquidity(&env, Q96, lower, upper, liquidity, true);
        let (burned0, burned1) = amounts_for_liquidity(&env, Q96, lower, upper, liquidity, false);
        assert!(burned0 <= minted0 && minted0 - burned0 <= 2);
        assert!(burned1 <= minted1 && minted1 - burned1 <= 1);
    }

    #[test]
    fn test_position_composition_by_price() {
        let env = Env::default();
        let lower = Q96 * 9 / 10;
        let upper = Q96 * 11 / 10;
        let liquidity = 1_000_000_000_000u128;

        let (below0, below1) = amounts_for_liquidity(&env, Q96 / 2, lower, upper, liquidity, false);
        assert!(below0 > 0);
        assert_eq!(below1, 0);

        let (above0, above1) = amounts_for_liquidity(&env, Q96 * 2, lower, upper, liquidity, false);
        assert_eq!(above0, 0);
        assert!(above1 > 0);
    }

    #[test]
    fn test_liquidity_for_amounts_takes_binding_side() {
        let env = Env::default();
        let lower = Q96 * 9 / 10;
        let upper = Q96 * 11 / 10;
        let generous = liquidity_for_amounts(&env, Q96, lower, upper, 1_000_000_000, 1_000_000_000);
        let starved = liquidity_for_amounts(&env, Q96, lower, upper, 1_000_000_000, 1_000);
        assert!(starved < generous);
    }
}
