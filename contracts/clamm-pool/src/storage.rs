use soroban_sdk::{contracttype, Env, IntoVal, TryFromVal, Val, Vec};
use vault_types::{PoolConfig, PoolState, PositionInfo, PositionKey, TickInfo};

// Each crossing reads and writes one TickInfo entry; the cap keeps a swap
// inside the write-entry limit and fills larger trades partially.
pub const MAX_TICK_CROSSINGS_PER_SWAP: u32 = 40;

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    /// PoolConfig (Instance)
    Config,
    /// PoolState (Instance)
    State,
    /// Ascending ticks with nonzero gross liquidity (Instance)
    InitializedTicks,
    /// TickInfo (Persistent)
    Tick(i32),
    /// PositionInfo (Persistent)
    Position(PositionKey),
}

const DAY_IN_LEDGERS: u32 = 17280;
const TTL_EXTEND: u32 = 30 * DAY_IN_LEDGERS;

/// Instance entry written by `initialize`; absent means the pool was never set up
fn required<T: TryFromVal<Env, Val>>(env: &Env, key: &DataKey) -> T {
    env.storage()
        .instance()
        .extend_ttl(DAY_IN_LEDGERS, TTL_EXTEND);
    env.storage()
        .instance()
        .get(key)
        .unwrap_or_else(|| panic!("Pool not initialized"))
}

/// Persist `value`, or drop the entry once it holds nothing
fn store_or_remove<T: IntoVal<Env, Val>>(env: &Env, key: &DataKey, value: &T, empty: bool) {
    let persistent = env.storage().persistent();
    if empty {
        persistent.remove(key);
    } else {
        persistent.set(key, value);
        persistent.extend_ttl(key, DAY_IN_LEDGERS, TTL_EXTEND);
    }
}

pub fn is_initialized(env: &Env) -> bool {
    env.storage().instance().has(&DataKey::Config)
}

pub fn get_config(env: &Env) -> PoolConfig {
    required(env, &DataKey::Config)
}

pub fn set_config(env: &Env, config: &PoolConfig) {
    env.storage().instance().set(&DataKey::Config, config);
}

pub fn get_state(env: &Env) -> PoolState {
    required(env, &DataKey::State)
}

pub fn set_state(env: &Env, state: &PoolState) {
    env.storage().instance().set(&DataKey::State, state);
}

pub fn get_initialized_ticks(env: &Env) -> Vec<i32> {
    env.storage()
        .instance()
        .get(&DataKey::InitializedTicks)
        .unwrap_or_else(|| Vec::new(env))
}

pub fn set_initialized_ticks(env: &Env, ticks: &Vec<i32>) {
    env.storage().instance().set(&DataKey::InitializedTicks, ticks);
}

pub fn get_tick(env: &Env, tick: i32) -> TickInfo {
    env.storage()
        .persistent()
        .get(&DataKey::Tick(tick))
        .unwrap_or_default()
}

pub fn set_tick(env: &Env, tick: i32, info: &TickInfo) {
    store_or_remove(env, &DataKey::Tick(tick), info, info.liquidity_gross == 0);
}

pub fn get_position(env: &Env, key: &PositionKey) -> PositionInfo {
    env.storage()
        .persistent()
        .get(&DataKey::Position(key.clone()))
        .unwrap_or_default()
}

pub fn set_position(env: &Env, key: &PositionKey, info: &PositionInfo) {
    let empty = info.liquidity == 0 && info.tokens_owed_0 == 0 && info.tokens_owed_1 == 0;
    store_or_remove(env, &DataKey::Position(key.clone()), info, empty);
}
