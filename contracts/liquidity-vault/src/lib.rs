#![no_std]

//! Liquidity vault: keeps an issued token's Floor, Anchor and Discovery
//! ranges on a concentrated-liquidity pool, rebalances them as trading moves
//! the liquidity ratio, and lends reserve against the issued token at the
//! Floor price.

mod guard;
mod lending;
mod model;
mod pool_ops;
mod positions;
mod rebalance;
mod rewards;
mod storage;

#[cfg(test)]
mod test;

use soroban_sdk::{contract, contractimpl, Address, Env, Symbol};
use storage::{extend_instance_ttl, get_config, get_params, is_bootstrapped, is_initialized, set_config, set_params};
use vault_types::{
    LiquidityPosition, Loan, ProtocolParameters, ShiftOutcome, SlideOutcome, Tier, VaultConfig, VaultError,
    VaultSnapshot,
};

#[contract]
pub struct LiquidityVault;

fn require_bootstrapped(env: &Env) -> Result<(), VaultError> {
    if !is_bootstrapped(env) {
        return Err(VaultError::NotInitialized);
    }
    Ok(())
}

#[contractimpl]
impl LiquidityVault {
    /// Store the vault's addresses and parameters.
    ///
    /// The pool must quote the issued token as token0 against the reserve
    /// token, on the same tick spacing.
    pub fn initialize(env: Env, config: VaultConfig, params: ProtocolParameters) -> Result<(), VaultError> {
        if is_initialized(&env) {
            return Err(VaultError::AlreadyInitialized);
        }
        config.admin.require_auth();
        params.validate()?;

        let pool = pool_ops::pool_config(&env, &config.pool);
        if pool.token0 != config.issued_token
            || pool.token1 != config.reserve_token
            || pool.tick_spacing != config.tick_spacing
        {
            return Err(VaultError::InvalidParams);
        }

        set_config(&env, &config);
        set_params(&env, &params);
        extend_instance_ttl(&env);
        Ok(())
    }

    /// Deploy the three tiers. Admin only, once.
    pub fn bootstrap(
        env: Env,
        funder: Address,
        reserve_amount: i128,
        floor_price: i128,
        recipient: Address,
        circulating_amount: i128,
    ) -> Result<VaultSnapshot, VaultError> {
        let config = get_config(&env)?;
        config.admin.require_auth();
        if funder != config.admin {
            funder.require_auth();
        }
        let params = get_params(&env)?;
        extend_instance_ttl(&env);

        guard::non_reentrant(&env, || {
            rebalance::bootstrap(
                &env,
                &config,
                &params,
                &funder,
                reserve_amount,
                floor_price,
                &recipient,
                circulating_amount,
            )
        })
    }

    /// Permissionless. `caller` receives the caller fee.
    pub fn shift(env: Env, caller: Address) -> Result<ShiftOutcome, VaultError> {
        caller.require_auth();
        let config = get_config(&env)?;
        let params = get_params(&env)?;
        extend_instance_ttl(&env);

        guard::non_reentrant(&env, || rebalance::shift(&env, &config, &params, &caller))
    }

    /// Permissionless
    pub fn slide(env: Env, caller: Address) -> Result<SlideOutcome, VaultError> {
        caller.require_auth();
        let config = get_config(&env)?;
        let params = get_params(&env)?;
        extend_instance_ttl(&env);

        guard::non_reentrant(&env, || rebalance::slide(&env, &config, &params, &caller))
    }

    // === Lending ===

    /// Borrow `amount` reserve for `duration` seconds against issued-token
    /// collateral valued at IMV. The fee is deducted up front.
    pub fn borrow(env: Env, borrower: Address, amount: i128, duration: u64) -> Result<Loan, VaultError> {
        borrower.require_auth();
        let config = get_config(&env)?;
        let params = get_params(&env)?;
        require_bootstrapped(&env)?;
        extend_instance_ttl(&env);

        guard::non_reentrant(&env, || {
            lending::borrow(&env, &config, &params, &borrower, amount, duration)
        })
    }

    pub fn payback(env: Env, borrower: Address, amount: i128) -> Result<Loan, VaultError> {
        borrower.require_auth();
        let config = get_config(&env)?;
        require_bootstrapped(&env)?;
        extend_instance_ttl(&env);

        guard::non_reentrant(&env, || lending::payback(&env, &config, &borrower, amount))
    }

    pub fn roll(env: Env, borrower: Address, new_duration: u64) -> Result<Loan, VaultError> {
        borrower.require_auth();
        let config = get_config(&env)?;
        let params = get_params(&env)?;
        require_bootstrapped(&env)?;
        extend_instance_ttl(&env);

        guard::non_reentrant(&env, || {
            lending::roll(&env, &config, &params, &borrower, new_duration)
        })
    }

    pub fn add_collateral(env: Env, borrower: Address, amount: i128) -> Result<Loan, VaultError> {
        borrower.require_auth();
        let config = get_config(&env)?;
        require_bootstrapped(&env)?;
        extend_instance_ttl(&env);

        guard::non_reentrant(&env, || lending::add_collateral(&env, &config, &borrower, amount))
    }

    /// Permissionless once the loan has expired
    pub fn liquidate(env: Env, caller: Address, borrower: Address) -> Result<Loan, VaultError> {
        caller.require_auth();
        let config = get_config(&env)?;
        require_bootstrapped(&env)?;
        extend_instance_ttl(&env);

        guard::non_reentrant(&env, || lending::liquidate(&env, &config, &borrower))
    }

    // === Configuration ===

    /// Start a new TWAP window at the pool's current cumulative. Refused
    /// until the running window is `min_twap_window` old.
    pub fn checkpoint_price(env: Env) -> Result<(), VaultError> {
        let config = get_config(&env)?;
        let params = get_params(&env)?;
        extend_instance_ttl(&env);
        let checkpoint = guard::restart_checkpoint(&env, &config, &params)?;
        env.events()
            .publish((Symbol::new(&env, "price_checkpoint"),), checkpoint);
        Ok(())
    }

    /// Replace the protocol parameters. The stored version is bumped
    /// regardless of the version passed in.
    pub fn set_parameters(env: Env, params: ProtocolParameters) -> Result<u32, VaultError> {
        let config = get_config(&env)?;
        config.admin.require_auth();
        params.validate()?;

        let version = get_params(&env)?.version + 1;
        let params = ProtocolParameters { version, ..params };
        set_params(&env, &params);
        extend_instance_ttl(&env);

        env.events()
            .publish((Symbol::new(&env, "params_updated"), config.admin), params);
        Ok(version)
    }

    // === View Functions ===

    pub fn config(env: Env) -> Result<VaultConfig, VaultError> {
        get_config(&env)
    }

    pub fn params(env: Env) -> Result<ProtocolParameters, VaultError> {
        get_params(&env)
    }

    /// Full capacity model at the pool's current price
    pub fn snapshot(env: Env) -> Result<VaultSnapshot, VaultError> {
        model::snapshot(&env, &get_config(&env)?)
    }

    /// (anchor + floor capacity) / circulating supply, 7 decimals
    pub fn liquidity_ratio(env: Env) -> Result<i128, VaultError> {
        Ok(model::snapshot(&env, &get_config(&env)?)?.liquidity_ratio)
    }

    /// Floor price per issued token, WAD
    pub fn imv(env: Env) -> Result<i128, VaultError> {
        model::intrinsic_minimum_value(&env, &model::Tiers::load(&env))
    }

    pub fn circulating_supply(env: Env) -> Result<i128, VaultError> {
        Ok(model::snapshot(&env, &get_config(&env)?)?.circulating_supply)
    }

    pub fn position(env: Env, tier: Tier) -> LiquidityPosition {
        storage::get_position(&env, tier)
    }

    /// Issued tokens the tier can take back at the current price
    pub fn position_capacity(env: Env, tier: Tier) -> Result<i128, VaultError> {
        let config = get_config(&env)?;
        let tiers = model::Tiers::load(&env);
        let (sqrt_price_x96, _) = pool_ops::slot0(&env, &config.pool);
        let imv = model::intrinsic_minimum_value(&env, &tiers)?;
        model::position_capacity(&env, tiers.get(tier), tier, sqrt_price_x96, imv)
    }

    pub fn get_loan(env: Env, borrower: Address) -> Loan {
        storage::get_loan(&env, &borrower)
    }

    pub fn loan_count(env: Env) -> u32 {
        storage::loan_count(&env)
    }

    pub fn total_borrowed(env: Env) -> i128 {
        storage::get_total_borrowed(&env)
    }

    /// Loan fees waiting for the next shift to reach the dividends sink
    pub fn accrued_fees(env: Env) -> i128 {
        storage::get_accrued_fees(&env)
    }

    /// Fee charged up front for borrowing `principal` over `duration` seconds
    pub fn loan_fee(env: Env, principal: i128, duration: u64) -> Result<i128, VaultError> {
        let params = get_params(&env)?;
        lending::loan_fee(principal, params.loan_fee_rate, duration)
    }
}
