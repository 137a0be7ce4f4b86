#![no_std]

//! Concentrated-liquidity pool the vault deploys its ranges into.
//!
//! Swap fees are retained by the pool as protocol fees rather than being
//! streamed to positions, so a position's claim is exactly what its
//! liquidity represents at the current price.

mod liquidity;
mod oracle;
mod storage;
mod swap;
mod tick;

use soroban_sdk::{contract, contractimpl, Address, Env};
use storage::{get_config, get_position, get_state, get_tick, set_config, set_state};
use vault_types::{fee_to_tick_spacing, max_liquidity_per_tick, PoolConfig, PoolState, PositionInfo, PositionKey, SwapResult, TickInfo};

#[contract]
pub struct ClammPool;

#[contractimpl]
impl ClammPool {
    /// Initialize the pool at `sqrt_price_x96`.
    ///
    /// Prices are quoted as token1 per token0, so the issued token of a vault
    /// pair goes in as `token0`.
    pub fn initialize(env: Env, token0: Address, token1: Address, fee: u32, sqrt_price_x96: u128) {
        if storage::is_initialized(&env) {
            panic!("Already initialized");
        }
        if token0 == token1 {
            panic!("Identical tokens");
        }
        let tick_spacing = fee_to_tick_spacing(fee).unwrap_or_else(|| panic!("Unsupported fee tier"));
        let tick = range_math::tick_at_sqrt_price(&env, sqrt_price_x96);

        set_config(
            &env,
            &PoolConfig {
                token0,
                token1,
                fee,
                tick_spacing,
                max_liquidity_per_tick: max_liquidity_per_tick(tick_spacing),
            },
        );
        set_state(&env, &PoolState::new(sqrt_price_x96, tick, env.ledger().timestamp()));
    }

    /// Swap against the pool's active liquidity.
    ///
    /// # Returns
    /// Signed token deltas from the trader's side: positive amounts were paid
    /// into the pool, negative amounts were paid out.
    pub fn swap(
        env: Env,
        trader: Address,
        zero_for_one: bool,
        amount_specified: i128,
        sqrt_price_limit_x96: u128,
    ) -> SwapResult {
        trader.require_auth();
        swap::execute_swap(&env, &trader, zero_for_one, amount_specified, sqrt_price_limit_x96)
    }

    /// Add liquidity to a position
    ///
    /// # Returns
    /// (amount0, amount1) - Token amounts deposited
    pub fn mint(env: Env, owner: Address, tick_lower: i32, tick_upper: i32, amount: u128) -> (u128, u128) {
        owner.require_auth();
        liquidity::mint(&env, owner, tick_lower, tick_upper, amount)
    }

    /// Remove liquidity from a position
    ///
    /// # Returns
    /// (amount0, amount1) - Token amounts credited as owed
    pub fn burn(env: Env, owner: Address, tick_lower: i32, tick_upper: i32, amount: u128) -> (u128, u128) {
        owner.require_auth();
        liquidity::burn(&env, owner, tick_lower, tick_upper, amount)
    }

    /// Collect owed tokens from a position
    pub fn collect(
        env: Env,
        owner: Address,
        recipient: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount0_requested: u128,
        amount1_requested: u128,
    ) -> (u128, u128) {
        owner.require_auth();
        liquidity::collect(&env, owner, recipient, tick_lower, tick_upper, amount0_requested, amount1_requested)
    }

    // === View Functions ===

    /// (sqrt_price_x96, tick)
    pub fn slot0(env: Env) -> (u128, i32) {
        let state = get_state(&env);
        (state.sqrt_price_x96, state.tick)
    }

    /// (tick_cumulative, timestamp) as of the current ledger
    pub fn observe(env: Env) -> (i64, u64) {
        oracle::observe(&env, &get_state(&env))
    }

    pub fn state(env: Env) -> PoolState {
        get_state(&env)
    }

    pub fn config(env: Env) -> PoolConfig {
        get_config(&env)
    }

    pub fn position(env: Env, owner: Address, tick_lower: i32, tick_upper: i32) -> PositionInfo {
        get_position(
            &env,
            &PositionKey {
                owner,
                tick_lower,
                tick_upper,
            },
        )
    }

    pub fn tick_info(env: Env, tick: i32) -> TickInfo {
        get_tick(&env, tick)
    }

    pub fn liquidity(env: Env) -> u128 {
        get_state(&env).liquidity
    }
}
