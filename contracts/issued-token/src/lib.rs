#![no_std]

//! SEP-41 token issued by a liquidity vault. The vault is the owner and the
//! only minter; holders burn their own balance.

use soroban_sdk::{
    contract, contractimpl, token::TokenInterface, Address, Env, MuxedAddress, String, Symbol,
};
use stellar_access::ownable::{self, Ownable};
use stellar_macros::only_owner;
use stellar_tokens::fungible::Base;


const TTL_THRESHOLD: u32 = 17_280; // ~1 day at 5s/ledger
const TTL_EXTEND_TO: u32 = 518_400; // ~30 days

#[contract]
pub struct IssuedToken;

// ─── SEP-41 Token Interface ──────────────────────────────────────

#[contractimpl]
impl TokenInterface for IssuedToken {
    fn allowance(env: Env, from: Address, spender: Address) -> i128 {
        Base::allowance(&env, &from, &spender)
    }

    fn approve(env: Env, from: Address, spender: Address, amount: i128, expiration_ledger: u32) {
        Base::approve(&env, &from, &spender, amount, expiration_ledger);
    }

    fn balance(env: Env, id: Address) -> i128 {
        Base::balance(&env, &id)
    }

    fn transfer(env: Env, from: Address, to: MuxedAddress, amount: i128) {
        Base::transfer(&env, &from, &to, amount);
    }

    fn transfer_from(env: Env, spender: Address, from: Address, to: Address, amount: i128) {
        Base::transfer_from(&env, &spender, &from, &to, amount);
    }

    fn burn(env: Env, from: Address, amount: i128) {
        Base::burn(&env, &from, amount);
    }

    fn burn_from(env: Env, spender: Address, from: Address, amount: i128) {
        Base::burn_from(&env, &spender, &from, amount);
    }

    fn decimals(env: Env) -> u32 {
        Base::decimals(&env)
    }

    fn name(env: Env) -> String {
        Base::name(&env)
    }

    fn symbol(env: Env) -> String {
        Base::symbol(&env)
    }
}

// Ownable (2-step transfer), used to hand minting over to the vault
#[contractimpl(contracttrait)]
impl Ownable for IssuedToken {}

#[contractimpl]
impl IssuedToken {
    pub fn initialize(env: Env, owner: Address, name: String, symbol: String) {
        if ownable::get_owner(&env).is_some() {
            panic!("Already initialized");
        }
        ownable::set_owner(&env, &owner);
        Base::set_metadata(&env, 7, name, symbol);
        env.storage().instance().extend_ttl(TTL_THRESHOLD, TTL_EXTEND_TO);
    }

    /// Supply across all holders, vault balances included
    pub fn total_supply(env: Env) -> i128 {
        Base::total_supply(&env)
    }

    #[only_owner]
    pub fn mint(env: Env, to: Address, amount: i128) {
        assert!(amount > 0, "Amount must be positive");
        env.storage().instance().extend_ttl(TTL_THRESHOLD, TTL_EXTEND_TO);
        Base::update(&env, None, Some(&to), amount);

        env.events().publish((Symbol::new(&env, "mint"),), (to, amount));
    }
}
