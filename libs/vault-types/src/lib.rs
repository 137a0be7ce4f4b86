#![no_std]

mod error;
mod loan;
mod outcome;
mod params;
mod pool;
mod position;

pub use error::*;
pub use loan::*;
pub use outcome::*;
pub use params::*;
pub use pool::*;
pub use position::*;

/// Q96 constant (2^96) for fixed-point sqrt prices
pub const Q96: u128 = 1 << 96;

/// Minimum tick index
/// Limited by u128 representation of the sqrt price
pub const MIN_TICK: i32 = -443636;

/// Maximum tick index
pub const MAX_TICK: i32 = 443636;

/// sqrt(1.0001^MIN_TICK) * 2^96
pub const MIN_SQRT_RATIO: u128 = 18446743374134;

/// sqrt(1.0001^MAX_TICK) * 2^96, bounded by u128::MAX
pub const MAX_SQRT_RATIO: u128 = 340275971719517849884101479065584693834;

/// 18-decimal fixed point used for prices (reserve asset per issued token)
pub const WAD: i128 = 1_000_000_000_000_000_000;

/// 7-decimal fixed point used for ratios and reward factors (1.0 = SCALAR_7)
pub const SCALAR_7: i128 = 10_000_000;

/// Basis points denominator
pub const BPS: i128 = 10_000;

pub const SECONDS_PER_DAY: u64 = 86_400;

/// Loan fee rates are expressed per 100_000 per day
pub const LOAN_FEE_SCALE: i128 = 100_000;

pub const MIN_LOAN_DURATION: u64 = 3_600;
pub const MAX_LOAN_DURATION: u64 = 30 * SECONDS_PER_DAY;

/// Fee amount in hundredths of a basis point (1e-6)
pub type Fee = u32;

/// Tick spacing for a pool fee tier, None for unsupported tiers
pub fn fee_to_tick_spacing(fee: Fee) -> Option<i32> {
    match fee {
        500 => Some(10),
        3000 => Some(60),
        10000 => Some(200),
        _ => None,
    }
}

/// Maximum gross liquidity a single tick may reference
pub fn max_liquidity_per_tick(tick_spacing: i32) -> u128 {
    let min_tick = (MIN_TICK / tick_spacing) * tick_spacing;
    let max_tick = (MAX_TICK / tick_spacing) * tick_spacing;
    let num_ticks = ((max_tick - min_tick) / tick_spacing) as u128 + 1;
    u128::MAX / num_ticks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_tiers() {
        assert_eq!(fee_to_tick_spacing(500), Some(10));
        assert_eq!(fee_to_tick_spacing(3000), Some(60));
        assert_eq!(fee_to_tick_spacing(10000), Some(200));
        assert_eq!(fee_to_tick_spacing(100), None);
    }

    #[test]
    fn test_max_liquidity_per_tick_shrinks_with_finer_spacing() {
        assert!(max_liquidity_per_tick(10) < max_liquidity_per_tick(60));
        assert!(max_liquidity_per_tick(60) < max_liquidity_per_tick(200));
    }
}
