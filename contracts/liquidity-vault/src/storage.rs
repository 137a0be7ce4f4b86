use soroban_sdk::{contracttype, Address, Env};
use vault_types::{LiquidityPosition, Loan, ProtocolParameters, Tier, VaultConfig, VaultError};

/// Storage keys for the vault contract
#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    /// Addresses and tick spacing (Instance storage)
    Config,
    /// Versioned protocol parameters (Instance storage)
    Params,
    /// Set once the three tiers are deployed (Instance storage)
    Bootstrapped,
    /// Held for the duration of a mutating call (Instance storage)
    Locked,
    /// One record per tier (Instance storage)
    Position(Tier),
    /// Spot and time of the last rebalance (Instance storage)
    LastRebalance,
    /// Pool cumulative the TWAP window starts from (Instance storage)
    Checkpoint,
    /// Outstanding principal across all loans (Instance storage)
    TotalBorrowed,
    /// Issued tokens the vault holds as loan collateral (Instance storage)
    TotalCollateral,
    /// Loan fees not yet paid to the dividends sink (Instance storage)
    AccruedFees,
    /// Loan-book index the next self-repay scan starts from (Instance storage)
    RepayCursor,
    /// Number of loans in the book (Instance storage)
    LoanCount,
    /// Loan book slot -> borrower (Persistent storage)
    LoanAt(u32),
    /// Borrower -> loan book slot (Persistent storage)
    LoanSlot(Address),
    /// Borrower -> loan record (Persistent storage)
    Loan(Address),
}

/// Spot price and time recorded by the last rebalance
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RebalanceMark {
    pub timestamp: u64,
    /// WAD
    pub spot_price: i128,
}

/// Start of the TWAP window
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PriceCheckpoint {
    pub tick_cumulative: i64,
    pub timestamp: u64,
}

// TTL constants
const INSTANCE_TTL_THRESHOLD: u32 = 17280; // ~1 day
const INSTANCE_TTL_EXTEND: u32 = 518400; // ~30 days
const PERSISTENT_TTL_THRESHOLD: u32 = 17280;
const PERSISTENT_TTL_EXTEND: u32 = 518400;

pub fn extend_instance_ttl(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(INSTANCE_TTL_THRESHOLD, INSTANCE_TTL_EXTEND);
}

fn extend_persistent_ttl(env: &Env, key: &DataKey) {
    env.storage()
        .persistent()
        .extend_ttl(key, PERSISTENT_TTL_THRESHOLD, PERSISTENT_TTL_EXTEND);
}

fn get_or<T: soroban_sdk::TryFromVal<Env, soroban_sdk::Val>>(env: &Env, key: &DataKey, default: T) -> T {
    env.storage().instance().get(key).unwrap_or(default)
}

// === Config & Params ===

pub fn is_initialized(env: &Env) -> bool {
    env.storage().instance().has(&DataKey::Config)
}

pub fn get_config(env: &Env) -> Result<VaultConfig, VaultError> {
    extend_instance_ttl(env);
    env.storage()
        .instance()
        .get(&DataKey::Config)
        .ok_or(VaultError::NotInitialized)
}

pub fn set_config(env: &Env, config: &VaultConfig) {
    env.storage().instance().set(&DataKey::Config, config);
    extend_instance_ttl(env);
}

pub fn get_params(env: &Env) -> Result<ProtocolParameters, VaultError> {
    env.storage()
        .instance()
        .get(&DataKey::Params)
        .ok_or(VaultError::NotInitialized)
}

pub fn set_params(env: &Env, params: &ProtocolParameters) {
    env.storage().instance().set(&DataKey::Params, params);
}

pub fn is_bootstrapped(env: &Env) -> bool {
    get_or(env, &DataKey::Bootstrapped, false)
}

pub fn set_bootstrapped(env: &Env) {
    env.storage().instance().set(&DataKey::Bootstrapped, &true);
}

// === Reentrancy ===

pub fn is_locked(env: &Env) -> bool {
    get_or(env, &DataKey::Locked, false)
}

pub fn set_locked(env: &Env, locked: bool) {
    if locked {
        env.storage().instance().set(&DataKey::Locked, &true);
    } else {
        env.storage().instance().remove(&DataKey::Locked);
    }
}

// === Positions ===

pub fn get_position(env: &Env, tier: Tier) -> LiquidityPosition {
    get_or(env, &DataKey::Position(tier), LiquidityPosition::default())
}

pub fn set_position(env: &Env, tier: Tier, position: &LiquidityPosition) {
    env.storage().instance().set(&DataKey::Position(tier), position);
}

// === Rebalance marks ===

pub fn get_last_rebalance(env: &Env) -> RebalanceMark {
    get_or(env, &DataKey::LastRebalance, RebalanceMark::default())
}

pub fn set_last_rebalance(env: &Env, mark: &RebalanceMark) {
    env.storage().instance().set(&DataKey::LastRebalance, mark);
}

pub fn get_checkpoint(env: &Env) -> PriceCheckpoint {
    get_or(env, &DataKey::Checkpoint, PriceCheckpoint::default())
}

pub fn set_checkpoint(env: &Env, checkpoint: &PriceCheckpoint) {
    env.storage().instance().set(&DataKey::Checkpoint, checkpoint);
}

// === Lending totals ===

pub fn get_total_borrowed(env: &Env) -> i128 {
    get_or(env, &DataKey::TotalBorrowed, 0i128)
}

pub fn set_total_borrowed(env: &Env, amount: i128) {
    env.storage().instance().set(&DataKey::TotalBorrowed, &amount);
}

pub fn get_total_collateral(env: &Env) -> i128 {
    get_or(env, &DataKey::TotalCollateral, 0i128)
}

pub fn set_total_collateral(env: &Env, amount: i128) {
    env.storage().instance().set(&DataKey::TotalCollateral, &amount);
}

pub fn get_accrued_fees(env: &Env) -> i128 {
    get_or(env, &DataKey::AccruedFees, 0i128)
}

pub fn set_accrued_fees(env: &Env, amount: i128) {
    env.storage().instance().set(&DataKey::AccruedFees, &amount);
}

pub fn get_repay_cursor(env: &Env) -> u32 {
    get_or(env, &DataKey::RepayCursor, 0u32)
}

pub fn set_repay_cursor(env: &Env, cursor: u32) {
    env.storage().instance().set(&DataKey::RepayCursor, &cursor);
}

// === Loan book ===

pub fn get_loan(env: &Env, borrower: &Address) -> Loan {
    let key = DataKey::Loan(borrower.clone());
    let loan = env.storage().persistent().get(&key);
    if loan.is_some() {
        extend_persistent_ttl(env, &key);
    }
    loan.unwrap_or_default()
}

/// Store a loan, keeping the book index in step: an active loan is listed,
/// a closed one is dropped with swap-and-pop.
pub fn set_loan(env: &Env, borrower: &Address, loan: &Loan) {
    let key = DataKey::Loan(borrower.clone());
    if loan.is_active() {
        env.storage().persistent().set(&key, loan);
        extend_persistent_ttl(env, &key);
        list_borrower(env, borrower);
    } else {
        env.storage().persistent().remove(&key);
        unlist_borrower(env, borrower);
    }
}

pub fn loan_count(env: &Env) -> u32 {
    get_or(env, &DataKey::LoanCount, 0u32)
}

pub fn borrower_at(env: &Env, slot: u32) -> Option<Address> {
    env.storage().persistent().get(&DataKey::LoanAt(slot))
}

fn list_borrower(env: &Env, borrower: &Address) {
    let slot_key = DataKey::LoanSlot(borrower.clone());
    if env.storage().persistent().has(&slot_key) {
        return;
    }
    let count = loan_count(env);
    env.storage().persistent().set(&DataKey::LoanAt(count), borrower);
    env.storage().persistent().set(&slot_key, &count);
    extend_persistent_ttl(env, &DataKey::LoanAt(count));
    extend_persistent_ttl(env, &slot_key);
    env.storage().instance().set(&DataKey::LoanCount, &(count + 1));
}

fn unlist_borrower(env: &Env, borrower: &Address) {
    let slot_key = DataKey::LoanSlot(borrower.clone());
    let Some(slot) = env.storage().persistent().get::<_, u32>(&slot_key) else {
        return;
    };
    let last = loan_count(env) - 1;
    if slot != last {
        if let Some(moved) = borrower_at(env, last) {
            env.storage().persistent().set(&DataKey::LoanAt(slot), &moved);
            env.storage().persistent().set(&DataKey::LoanSlot(moved), &slot);
        }
    }
    env.storage().persistent().remove(&DataKey::LoanAt(last));
    env.storage().persistent().remove(&slot_key);
    env.storage().instance().set(&DataKey::LoanCount, &last);
}
