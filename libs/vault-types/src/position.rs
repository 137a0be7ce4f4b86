use soroban_sdk::contracttype;

use crate::VaultError;

/// The three liquidity tiers, ordered by price
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum Tier {
    Floor = 0,
    Anchor = 1,
    Discovery = 2,
}

/// A vault-owned range in the pool
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LiquidityPosition {
    pub lower_tick: i32,
    pub upper_tick: i32,
    /// Claim on the range, not a token amount
    pub liquidity: u128,
}

impl LiquidityPosition {
    pub fn new(lower_tick: i32, upper_tick: i32, liquidity: u128) -> Self {
        Self {
            lower_tick,
            upper_tick,
            liquidity,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.liquidity == 0
    }

    pub fn check_ticks(&self) -> Result<(), VaultError> {
        if self.lower_tick >= self.upper_tick {
            return Err(VaultError::InvalidTick);
        }
        Ok(())
    }
}

/// Floor <= Anchor <= Discovery by price, each range well formed
pub fn check_tier_order(
    floor: &LiquidityPosition,
    anchor: &LiquidityPosition,
    discovery: &LiquidityPosition,
) -> Result<(), VaultError> {
    floor.check_ticks()?;
    anchor.check_ticks()?;
    discovery.check_ticks()?;
    if floor.upper_tick > anchor.lower_tick || anchor.upper_tick > discovery.lower_tick {
        return Err(VaultError::InvalidTick);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverted_range_is_invalid() {
        let position = LiquidityPosition::new(120, 60, 1);
        assert_eq!(position.check_ticks(), Err(VaultError::InvalidTick));
        assert_eq!(LiquidityPosition::new(60, 60, 1).check_ticks(), Err(VaultError::InvalidTick));
    }

    #[test]
    fn test_tier_order() {
        let floor = LiquidityPosition::new(-120, -60, 10);
        let anchor = LiquidityPosition::new(-60, 600, 10);
        let discovery = LiquidityPosition::new(600, 6000, 10);
        assert_eq!(check_tier_order(&floor, &anchor, &discovery), Ok(()));

        let overlapping = LiquidityPosition::new(-120, 0, 10);
        assert_eq!(
            check_tier_order(&overlapping, &anchor, &discovery),
            Err(VaultError::InvalidTick)
        );
    }
}
