use soroban_sdk::contracttype;

use crate::{VaultError, BPS, LOAN_FEE_SCALE, SCALAR_7};

/// Versioned protocol configuration. Read-only input to every core computation.
///
/// Ratios are 7-decimal fixed point (1.0 = `SCALAR_7`), percentages and
/// tolerances are basis points unless noted otherwise.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProtocolParameters {
    /// Bumped on every replacement
    pub version: u32,
    /// Shift is allowed while the liquidity ratio is strictly below this
    pub shift_ratio: i128,
    /// Slide is allowed while the liquidity ratio is strictly above this
    pub slide_ratio: i128,
    /// Share of the bootstrap reserve deployed into the Floor
    pub floor_percentage: u32,
    /// Share of the freed reserve placed back into the Anchor on shift
    pub anchor_percentage: u32,
    /// Width of the Discovery range above the Anchor
    pub discovery_bips: u32,
    /// Issued supply, against circulating supply, Discovery holds after a rebalance
    pub discovery_supply_bps: u32,
    /// Anchor upper bound above spot after a shift
    pub shift_anchor_upper_bips: u32,
    /// Anchor upper bound above spot after a slide
    pub slide_anchor_upper_bips: u32,
    /// Daily loan fee, per 100_000
    pub loan_fee_rate: u32,
    /// Loan-to-value ceiling at borrow time, against IMV
    pub max_ltv_bps: u32,
    /// Outstanding principal ceiling, against the floor balance
    pub max_loan_utilization_bps: u32,
    /// Loans at or above this LTV are repaid down during a shift
    pub self_repay_ltv_threshold: u32,
    /// Loans scanned per shift
    pub self_repay_page_size: u32,
    /// Share of freed reserve skimmed for rewards on shift
    pub skim_ratio: u32,
    /// Share of the skim paid to the shift caller
    pub caller_fee_bps: u32,
    /// Reward sensitivity to the circulating share of supply (SCALAR_7)
    pub reward_kr: i128,
    /// Reward sensitivity to volatility (SCALAR_7)
    pub reward_kv: i128,
    /// Allowed spot move across a rebalance
    pub max_price_deviation_bps: u32,
    /// Allowed distance between spot and TWAP tick, 0 disables
    pub max_twap_deviation_ticks: u32,
    /// Seconds a TWAP window must span before it is trusted or replaced
    pub min_twap_window: u64,
    /// Minimum seconds between rebalances
    pub shift_cooldown: u64,
}

impl ProtocolParameters {
    pub fn standard() -> Self {
        Self {
            version: 1,
            shift_ratio: 9_000_000,
            slide_ratio: 11_500_000,
            floor_percentage: 7_500,
            anchor_percentage: 2_000,
            discovery_bips: 10_000,
            discovery_supply_bps: 2_500,
            shift_anchor_upper_bips: 1_000,
            slide_anchor_upper_bips: 500,
            loan_fee_rate: 57,
            max_ltv_bps: 9_500,
            max_loan_utilization_bps: 5_000,
            self_repay_ltv_threshold: 9_000,
            self_repay_page_size: 20,
            skim_ratio: 500,
            caller_fee_bps: 1_000,
            reward_kr: SCALAR_7,
            reward_kv: SCALAR_7,
            max_price_deviation_bps: 100,
            max_twap_deviation_ticks: 2_000,
            min_twap_window: 1_800,
            shift_cooldown: 3_600,
        }
    }

    pub fn validate(&self) -> Result<(), VaultError> {
        let bps = BPS as u32;
        if self.shift_ratio <= 0 || self.shift_ratio >= SCALAR_7 {
            return Err(VaultError::InvalidParams);
        }
        if self.slide_ratio <= SCALAR_7 {
            return Err(VaultError::InvalidParams);
        }
        if self.floor_percentage == 0 || self.floor_percentage >= bps {
            return Err(VaultError::InvalidParams);
        }
        if self.anchor_percentage > bps
            || self.skim_ratio > bps
            || self.caller_fee_bps > bps
            || self.max_loan_utilization_bps > bps
            || self.discovery_supply_bps > bps
        {
            return Err(VaultError::InvalidParams);
        }
        if self.discovery_bips == 0
            || self.shift_anchor_upper_bips == 0
            || self.slide_anchor_upper_bips == 0
        {
            return Err(VaultError::InvalidParams);
        }
        if self.max_ltv_bps == 0 || self.max_ltv_bps > bps {
            return Err(VaultError::InvalidParams);
        }
        if self.self_repay_ltv_threshold == 0 || self.self_repay_ltv_threshold >= bps {
            return Err(VaultError::InvalidParams);
        }
        if self.self_repay_page_size == 0 {
            return Err(VaultError::InvalidParams);
        }
        if self.loan_fee_rate as i128 > LOAN_FEE_SCALE {
            return Err(VaultError::InvalidParams);
        }
        if self.reward_kr < 0 || self.reward_kv < 0 {
            return Err(VaultError::InvalidParams);
        }
        Ok(())
    }
}
