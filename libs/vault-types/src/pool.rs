use soroban_sdk::{contracttype, Address};

/// Current pool state, kept in instance storage
#[contracttype]
#[derive(Clone, Debug)]
pub struct PoolState {
    /// Current sqrt(price) as Q64.96
    pub sqrt_price_x96: u128,
    pub tick: i32,
    /// Liquidity active at the current tick
    pub liquidity: u128,
    /// Swap fees retained by the pool
    pub protocol_fees_0: i128,
    pub protocol_fees_1: i128,
    /// Sum of tick * seconds elapsed
    pub tick_cumulative: i64,
    /// Timestamp the cumulative was last advanced
    pub last_observation: u64,
}

impl PoolState {
    pub fn new(sqrt_price_x96: u128, tick: i32, now: u64) -> Self {
        Self {
            sqrt_price_x96,
            tick,
            liquidity: 0,
            protocol_fees_0: 0,
            protocol_fees_1: 0,
            tick_cumulative: 0,
            last_observation: now,
        }
    }
}

/// Pool configuration, immutable after initialization
#[contracttype]
#[derive(Clone, Debug)]
pub struct PoolConfig {
    pub token0: Address,
    pub token1: Address,
    /// Fee tier in hundredths of a bip
    pub fee: u32,
    pub tick_spacing: i32,
    pub max_liquidity_per_tick: u128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PositionKey {
    pub owner: Address,
    pub tick_lower: i32,
    pub tick_upper: i32,
}

#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PositionInfo {
    pub liquidity: u128,
    /// Burned but not yet collected
    pub tokens_owed_0: u128,
    pub tokens_owed_1: u128,
}

#[contracttype]
#[derive(Clone, Debug, Default)]
pub struct TickInfo {
    /// Total liquidity referencing this tick
    pub liquidity_gross: u128,
    /// Liquidity added when the tick is crossed left to right
    pub liquidity_net: i128,
}

/// Signed token deltas from the trader's perspective (positive = paid in)
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SwapResult {
    pub amount0: i128,
    pub amount1: i128,
    pub sqrt_price_x96: u128,
    pub tick: i32,
}
