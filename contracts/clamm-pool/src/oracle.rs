use soroban_sdk::Env;
use vault_types::PoolState;

/// Fold the time spent at the current tick into the cumulative.
/// Must run before anything moves the tick.
pub fn advance(env: &Env, state: &mut PoolState) {
    let now = env.ledger().timestamp();
    if now > state.last_observation {
        let elapsed = (now - state.last_observation) as i64;
        state.tick_cumulative += state.tick as i64 * elapsed;
        state.last_observation = now;
    }
}

/// Cumulative extrapolated to the current ledger time, without writing
pub fn observe(env: &Env, state: &PoolState) -> (i64, u64) {
    let mut snapshot = state.clone();
    advance(env, &mut snapshot);
    (snapshot.tick_cumulative, env.ledger().timestamp())
}
