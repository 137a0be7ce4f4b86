use crate::storage::{get_initialized_ticks, get_tick, set_initialized_ticks, set_tick};
use range_math::add_delta;
use soroban_sdk::Env;
use vault_types::{MAX_TICK, MIN_TICK};

/// Apply a liquidity delta to a range boundary. Keeps the initialized tick
/// list in sync when the tick gains its first or loses its last reference.
pub fn update(env: &Env, tick: i32, liquidity_delta: i128, upper: bool, max_liquidity: u128) {
    let mut info = get_tick(env, tick);
    let gross_before = info.liquidity_gross;
    let gross_after = add_delta(gross_before, liquidity_delta);

    if gross_after > max_liquidity {
        panic!("Liquidity overflow");
    }

    info.liquidity_gross = gross_after;
    info.liquidity_net = if upper {
        info.liquidity_net - liquidity_delta
    } else {
        info.liquidity_net + liquidity_delta
    };
    set_tick(env, tick, &info);

    if gross_before == 0 && gross_after > 0 {
        insert_tick(env, tick);
    } else if gross_before > 0 && gross_after == 0 {
        remove_tick(env, tick);
    }
}

/// Liquidity change when a swap moves left to right across `tick`
pub fn cross(env: &Env, tick: i32) -> i128 {
    get_tick(env, tick).liquidity_net
}

/// Next initialized tick in the swap direction.
///
/// Moving down, this is the greatest initialized tick at or below `tick`;
/// moving up, the smallest one strictly above. Falls back to the tick bounds
/// with `initialized = false` when nothing is left in that direction.
pub fn next_initialized_tick(env: &Env, tick: i32, zero_for_one: bool) -> (i32, bool) {
    let ticks = get_initialized_ticks(env);
    if zero_for_one {
        let index = match ticks.binary_search(tick) {
            Ok(found) => Some(found),
            Err(0) => None,
            Err(insert_at) => Some(insert_at - 1),
        };
        match index.and_then(|i| ticks.get(i)) {
            Some(next) => (next, true),
            None => (MIN_TICK, false),
        }
    } else {
        let index = match ticks.binary_search(tick) {
            Ok(found) => found + 1,
            Err(insert_at) => insert_at,
        };
        match ticks.get(index) {
            Some(next) => (next, true),
            None => (MAX_TICK, false),
        }
    }
}

fn insert_tick(env: &Env, tick: i32) {
    let mut ticks = get_initialized_ticks(env);
    if let Err(insert_at) = ticks.binary_search(tick) {
        ticks.insert(insert_at, tick);
        set_initialized_ticks(env, &ticks);
    }
}

fn remove_tick(env: &Env, tick: i32) {
    let mut ticks = get_initialized_ticks(env);
    if let Ok(found) = ticks.binary_search(tick) {
        ticks.remove(found);
        set_initialized_ticks(env, &ticks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClammPool;
    use soroban_sdk::Env;

    const MAX_LIQ: u128 = u128::MAX;

    #[test]
    fn test_update_tracks_initialized_ticks() {
        let env = Env::default();
        let contract_id = env.register(ClammPool, ());
        env.as_contract(&contract_id, || {
            update(&env, -60, 1_000, false, MAX_LIQ);
            update(&env, 120, 1_000, true, MAX_LIQ);
            update(&env, 60, 500, false, MAX_LIQ);

            let ticks = get_initialized_ticks(&env);
            assert_eq!(ticks.len(), 3);
            assert_eq!(ticks.get(0), Some(-60));
            assert_eq!(ticks.get(2), Some(120));

            assert_eq!(get_tick(&env, -60).liquidity_net, 1_000);
            assert_eq!(get_tick(&env, 120).liquidity_net, -1_000);

            update(&env, 60, -500, false, MAX_LIQ);
            assert_eq!(get_initialized_ticks(&env).len(), 2);
            assert_eq!(get_tick(&env, 60).liquidity_gross, 0);
        });
    }

    #[test]
    fn test_next_initialized_tick_both_directions() {
        let env = Env::default();
        let contract_id = env.register(ClammPool, ());
        env.as_contract(&contract_id, || {
            update(&env, -120, 10, false, MAX_LIQ);
            update(&env, 60, 10, true, MAX_LIQ);

            assert_eq!(next_initialized_tick(&env, 0, true), (-120, true));
            assert_eq!(next_initialized_tick(&env, -120, true), (-120, true));
            assert_eq!(next_initialized_tick(&env, -121, true), (MIN_TICK, false));

            assert_eq!(next_initialized_tick(&env, 0, false), (60, true));
            assert_eq!(next_initialized_tick(&env, 60, false), (MAX_TICK, false));
            assert_eq!(next_initialized_tick(&env, -200, false), (-120, true));
        });
    }

    #[test]
    #[should_panic(expected = "Liquidity overflow")]
    fn test_update_respects_max_liquidity() {
        let env = Env::default();
        let contract_id = env.register(ClammPool, ());
        env.as_contract(&contract_id, || {
            update(&env, 0, 101, false, 100);
        });
    }
}
