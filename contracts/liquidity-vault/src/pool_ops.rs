//! Calls into the pool and token contracts on the vault's behalf.

use range_math::deposit_amounts;
use soroban_sdk::auth::{ContractContext, InvokerContractAuthEntry, SubContractInvocation};
use soroban_sdk::{token, vec, Address, Env, IntoVal, Symbol, Vec};
use vault_types::{LiquidityPosition, PoolConfig, VaultConfig, VaultError};

pub fn slot0(env: &Env, pool: &Address) -> (u128, i32) {
    env.invoke_contract(pool, &Symbol::new(env, "slot0"), ().into_val(env))
}

pub fn observe(env: &Env, pool: &Address) -> (i64, u64) {
    env.invoke_contract(pool, &Symbol::new(env, "observe"), ().into_val(env))
}

pub fn pool_config(env: &Env, pool: &Address) -> PoolConfig {
    env.invoke_contract(pool, &Symbol::new(env, "config"), ().into_val(env))
}

/// Mint `position` into the pool. The pool pulls both tokens from the vault,
/// so the exact transfers are pre-authorized first.
pub fn deploy(env: &Env, config: &VaultConfig, position: &LiquidityPosition) -> Result<(i128, i128), VaultError> {
    if position.is_empty() {
        return Ok((0, 0));
    }
    let (sqrt_price_x96, _) = slot0(env, &config.pool);
    let (amount0, amount1) = deposit_amounts(env, position, sqrt_price_x96)?;

    let vault = env.current_contract_address();
    let mut transfers: Vec<InvokerContractAuthEntry> = Vec::new(env);
    for (token, amount) in [(&config.issued_token, amount0), (&config.reserve_token, amount1)] {
        if amount > 0 {
            transfers.push_back(transfer_auth(env, token, &vault, &config.pool, amount));
        }
    }
    if !transfers.is_empty() {
        env.authorize_as_current_contract(transfers);
    }

    let (paid0, paid1): (u128, u128) = env.invoke_contract(
        &config.pool,
        &Symbol::new(env, "mint"),
        (vault, position.lower_tick, position.upper_tick, position.liquidity).into_val(env),
    );
    Ok((paid0 as i128, paid1 as i128))
}

/// Burn `liquidity` from the range and collect everything owed back to the vault
pub fn withdraw(env: &Env, config: &VaultConfig, position: &LiquidityPosition, liquidity: u128) -> (i128, i128) {
    if liquidity == 0 {
        return (0, 0);
    }
    let vault = env.current_contract_address();
    let _: (u128, u128) = env.invoke_contract(
        &config.pool,
        &Symbol::new(env, "burn"),
        (vault.clone(), position.lower_tick, position.upper_tick, liquidity).into_val(env),
    );
    let (amount0, amount1): (u128, u128) = env.invoke_contract(
        &config.pool,
        &Symbol::new(env, "collect"),
        (vault.clone(), vault, position.lower_tick, position.upper_tick, u128::MAX, u128::MAX).into_val(env),
    );
    (amount0 as i128, amount1 as i128)
}

fn transfer_auth(env: &Env, token: &Address, from: &Address, to: &Address, amount: i128) -> InvokerContractAuthEntry {
    InvokerContractAuthEntry::Contract(SubContractInvocation {
        context: ContractContext {
            contract: token.clone(),
            fn_name: Symbol::new(env, "transfer"),
            args: vec![env, from.into_val(env), to.into_val(env), amount.into_val(env)],
        },
        sub_invocations: vec![env],
    })
}

// === Token helpers ===

pub fn balance(env: &Env, token: &Address) -> i128 {
    token::Client::new(env, token).balance(&env.current_contract_address())
}

pub fn pay(env: &Env, token: &Address, to: &Address, amount: i128) {
    if amount > 0 {
        token::Client::new(env, token).transfer(&env.current_contract_address(), to, &amount);
    }
}

pub fn pull(env: &Env, token: &Address, from: &Address, amount: i128) {
    if amount > 0 {
        token::Client::new(env, token).transfer(from, &env.current_contract_address(), &amount);
    }
}

pub fn total_supply(env: &Env, issued_token: &Address) -> i128 {
    env.invoke_contract(issued_token, &Symbol::new(env, "total_supply"), ().into_val(env))
}

/// Mint issued tokens; the vault owns the token contract
pub fn mint_issued(env: &Env, issued_token: &Address, to: &Address, amount: i128) {
    if amount > 0 {
        let _: () = env.invoke_contract(
            issued_token,
            &Symbol::new(env, "mint"),
            (to.clone(), amount).into_val(env),
        );
    }
}

pub fn burn_issued(env: &Env, issued_token: &Address, amount: i128) {
    if amount > 0 {
        token::Client::new(env, issued_token).burn(&env.current_contract_address(), &amount);
    }
}

/// Top the vault's free issued balance up to `needed`, minting the
/// shortfall. `locked` is held for borrowers and never counts as free.
pub fn ensure_issued(env: &Env, issued_token: &Address, needed: i128, locked: i128) {
    let held = balance(env, issued_token) - locked;
    if needed > held {
        mint_issued(env, issued_token, &env.current_contract_address(), needed - held);
    }
}

pub fn token_balance(env: &Env, token: &Address, holder: &Address) -> i128 {
    token::Client::new(env, token).balance(holder)
}
