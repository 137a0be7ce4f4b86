use soroban_sdk::{contracttype, Address};

/// Addresses injected at initialization
#[contracttype]
#[derive(Clone, Debug)]
pub struct VaultConfig {
    pub admin: Address,
    pub pool: Address,
    /// Must be the pool's token0
    pub issued_token: Address,
    pub reserve_token: Address,
    /// Receives minted staking rewards on shift
    pub staking_sink: Address,
    /// Receives accrued loan fees on shift
    pub dividends_sink: Address,
    pub tick_spacing: i32,
}

/// Point-in-time view of the capacity model
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct VaultSnapshot {
    pub sqrt_price_x96: u128,
    pub circulating_supply: i128,
    pub floor_balance: i128,
    pub floor_capacity: i128,
    pub anchor_capacity: i128,
    /// WAD price at the Floor's upper tick
    pub imv: i128,
    /// SCALAR_7, i128::MAX when nothing circulates
    pub liquidity_ratio: i128,
}

/// Rewards computed by a shift, delivered to the configured sinks
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RewardsDue {
    /// Issued tokens minted to the staking sink
    pub staking_amount: i128,
    /// Reserve asset transferred to the dividends sink
    pub dividends_amount: i128,
    /// Reserve asset paid to the shift caller
    pub caller_fee: i128,
}

#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SelfRepayReport {
    pub loans_scanned: u32,
    pub loans_repaid: u32,
    pub loans_closed: u32,
    pub principal_repaid: i128,
    pub collateral_seized: i128,
    /// Loan-book index the next scan starts from
    pub next_cursor: u32,
}

#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ShiftOutcome {
    pub imv_before: i128,
    pub imv_after: i128,
    pub ratio_before: i128,
    pub ratio_after: i128,
    pub floor_balance: i128,
    pub rewards: RewardsDue,
    pub self_repay: SelfRepayReport,
}

#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SlideOutcome {
    pub ratio_before: i128,
    pub ratio_after: i128,
    pub anchor_liquidity: u128,
    pub discovery_liquidity: u128,
    /// Reserve left in the vault for the next shift
    pub parked_reserve: i128,
}
