//! Reserve loans against issued-token collateral valued at IMV.
//!
//! Borrowed reserve comes out of the Floor and repayments go back into it.
//! Collateral stays in the vault, outside circulating supply, so taking a
//! loan never weakens the solvency invariant.

use crate::model::{self, Tiers};
use crate::pool_ops;
use crate::positions::{add_reserve_to_floor, take_reserve_from_floor};
use crate::storage::{
    borrower_at, get_accrued_fees, get_loan, get_repay_cursor, get_total_borrowed,
    get_total_collateral, loan_count, set_accrued_fees, set_loan, set_repay_cursor,
    set_total_borrowed, set_total_collateral,
};
use range_math::sqrt_price_at_tick;
use soroban_fixed_point_math::FixedPoint;
use soroban_sdk::{Address, Env, Symbol};
use vault_types::{
    Loan, ProtocolParameters, SelfRepayReport, VaultConfig, VaultError, VaultSnapshot, BPS,
    LOAN_FEE_SCALE, MAX_LOAN_DURATION, MIN_LOAN_DURATION, SECONDS_PER_DAY, WAD,
};

/// `principal * rate * duration / (1 day * 100_000)`, rounded down.
/// Duration counts in seconds, so a 12 hour loan pays half a day.
pub fn loan_fee(principal: i128, loan_fee_rate: u32, duration: u64) -> Result<i128, VaultError> {
    let numerator = loan_fee_rate as i128 * duration as i128;
    principal
        .fixed_mul_floor(numerator, SECONDS_PER_DAY as i128 * LOAN_FEE_SCALE)
        .ok_or(VaultError::MathOverflow)
}

/// Collateral that backs `principal` at `max_ltv_bps` of IMV, rounded up
pub fn required_collateral(principal: i128, imv: i128, max_ltv_bps: u32) -> Result<i128, VaultError> {
    principal
        .fixed_div_ceil(imv, WAD)
        .and_then(|tokens| tokens.fixed_div_ceil(max_ltv_bps as i128, BPS))
        .ok_or(VaultError::MathOverflow)
}

/// Principal `collateral` supports at `max_ltv_bps` of IMV, rounded down
pub fn max_principal(collateral: i128, imv: i128, max_ltv_bps: u32) -> Result<i128, VaultError> {
    collateral
        .fixed_mul_floor(imv, WAD)
        .and_then(|value| value.fixed_mul_floor(max_ltv_bps as i128, BPS))
        .ok_or(VaultError::MathOverflow)
}

/// Repayment that brings a loan back down to `threshold_bps` LTV:
/// `(borrow - threshold * value) / (1 - threshold)`, rounded up.
/// Zero while the loan is under the threshold.
pub fn self_repay_amount(loan: &Loan, imv: i128, threshold_bps: u32) -> Result<i128, VaultError> {
    let value = loan
        .collateral_amount
        .fixed_mul_floor(imv, WAD)
        .ok_or(VaultError::MathOverflow)?;
    let threshold = threshold_bps as i128;
    let excess = loan.borrow_amount * BPS - threshold * value;
    if excess < 0 {
        return Ok(0);
    }
    let repay = (excess + (BPS - threshold) - 1) / (BPS - threshold);
    Ok(repay.min(loan.borrow_amount))
}

fn check_duration(duration: u64) -> Result<(), VaultError> {
    if !(MIN_LOAN_DURATION..=MAX_LOAN_DURATION).contains(&duration) {
        return Err(VaultError::InvalidDuration);
    }
    Ok(())
}

/// Lending is closed while spot sits at or below the Floor
fn check_spot_above_floor(env: &Env, snapshot: &VaultSnapshot) -> Result<(), VaultError> {
    let floor = Tiers::load(env).floor;
    if snapshot.sqrt_price_x96 <= sqrt_price_at_tick(env, floor.upper_tick) {
        return Err(VaultError::Manipulated);
    }
    Ok(())
}

fn check_utilization(env: &Env, snapshot: &VaultSnapshot, params: &ProtocolParameters, extra: i128) -> Result<(), VaultError> {
    let cap = snapshot
        .floor_balance
        .fixed_mul_floor(params.max_loan_utilization_bps as i128, BPS)
        .ok_or(VaultError::MathOverflow)?;
    if get_total_borrowed(env) + extra > cap {
        return Err(VaultError::InsufficientLiquidity);
    }
    Ok(())
}

fn active_loan(env: &Env, borrower: &Address) -> Result<Loan, VaultError> {
    let loan = get_loan(env, borrower);
    if !loan.is_active() {
        return Err(VaultError::NoActiveLoan);
    }
    Ok(loan)
}

fn live_loan(env: &Env, borrower: &Address) -> Result<Loan, VaultError> {
    let loan = active_loan(env, borrower)?;
    if loan.is_expired(env.ledger().timestamp()) {
        return Err(VaultError::LoanExpired);
    }
    Ok(loan)
}

/// Send `amount` of reserve from the Floor to `borrower`, keeping `fee`
fn disburse(env: &Env, config: &VaultConfig, borrower: &Address, amount: i128, fee: i128) -> Result<(), VaultError> {
    take_reserve_from_floor(env, config, amount)?;
    pool_ops::pay(env, &config.reserve_token, borrower, amount - fee);
    set_accrued_fees(env, get_accrued_fees(env) + fee);
    Ok(())
}

pub fn borrow(
    env: &Env,
    config: &VaultConfig,
    params: &ProtocolParameters,
    borrower: &Address,
    amount: i128,
    duration: u64,
) -> Result<Loan, VaultError> {
    check_duration(duration)?;
    if amount <= 0 {
        return Err(VaultError::InvalidParams);
    }
    if get_loan(env, borrower).is_active() {
        return Err(VaultError::ActiveLoan);
    }

    let snapshot = model::snapshot(env, config)?;
    check_spot_above_floor(env, &snapshot)?;
    check_utilization(env, &snapshot, params, amount)?;

    let collateral = required_collateral(amount, snapshot.imv, params.max_ltv_bps)?;
    if pool_ops::token_balance(env, &config.issued_token, borrower) < collateral {
        return Err(VaultError::InsufficientCollateral);
    }
    let fee = loan_fee(amount, params.loan_fee_rate, duration)?;

    pool_ops::pull(env, &config.issued_token, borrower, collateral);
    set_total_collateral(env, get_total_collateral(env) + collateral);
    disburse(env, config, borrower, amount, fee)?;
    set_total_borrowed(env, get_total_borrowed(env) + amount);

    let loan = Loan {
        borrow_amount: amount,
        collateral_amount: collateral,
        fees: fee,
        expiry: env.ledger().timestamp() + duration,
        duration,
    };
    set_loan(env, borrower, &loan);
    model::enforce_solvency(env, config)?;

    env.events()
        .publish((Symbol::new(env, "borrow"), borrower.clone()), loan.clone());
    Ok(loan)
}

/// Repay up to the outstanding principal. Collateral comes back in
/// proportion; a full repayment closes the loan.
pub fn payback(env: &Env, config: &VaultConfig, borrower: &Address, amount: i128) -> Result<Loan, VaultError> {
    if amount <= 0 {
        return Err(VaultError::InvalidParams);
    }
    let mut loan = live_loan(env, borrower)?;
    let repaid = amount.min(loan.borrow_amount);

    let released = if repaid == loan.borrow_amount {
        loan.collateral_amount
    } else {
        loan.collateral_amount
            .fixed_mul_floor(repaid, loan.borrow_amount)
            .ok_or(VaultError::MathOverflow)?
    };

    pool_ops::pull(env, &config.reserve_token, borrower, repaid);
    add_reserve_to_floor(env, config, repaid)?;
    pool_ops::pay(env, &config.issued_token, borrower, released);
    set_total_collateral(env, get_total_collateral(env) - released);

    loan.borrow_amount -= repaid;
    loan.collateral_amount -= released;
    set_total_borrowed(env, get_total_borrowed(env) - repaid);
    set_loan(env, borrower, &loan);
    model::enforce_solvency(env, config)?;

    env.events()
        .publish((Symbol::new(env, "payback"), borrower.clone()), (repaid, released));
    Ok(loan)
}

/// Extend a loan and re-value its collateral at the current IMV.
///
/// The principal is topped up to `max_ltv_bps`; the fee for the new term on
/// the new principal is netted from the top-up, or paid by the borrower when
/// the top-up does not cover it.
pub fn roll(
    env: &Env,
    config: &VaultConfig,
    params: &ProtocolParameters,
    borrower: &Address,
    new_duration: u64,
) -> Result<Loan, VaultError> {
    check_duration(new_duration)?;
    let mut loan = live_loan(env, borrower)?;
    let expiry = env.ledger().timestamp() + new_duration;
    if expiry <= loan.expiry {
        return Err(VaultError::CantRollLoan);
    }

    let snapshot = model::snapshot(env, config)?;
    let ceiling = max_principal(loan.collateral_amount, snapshot.imv, params.max_ltv_bps)?;
    let top_up = (ceiling - loan.borrow_amount).max(0);
    let principal = loan.borrow_amount + top_up;
    let fee = loan_fee(principal, params.loan_fee_rate, new_duration)?;

    if top_up > 0 {
        check_spot_above_floor(env, &snapshot)?;
        check_utilization(env, &snapshot, params, top_up)?;
    }
    let netted = fee.min(top_up);
    if fee > netted {
        pool_ops::pull(env, &config.reserve_token, borrower, fee - netted);
        set_accrued_fees(env, get_accrued_fees(env) + fee - netted);
    }
    if top_up > 0 {
        disburse(env, config, borrower, top_up, netted)?;
    }

    set_total_borrowed(env, get_total_borrowed(env) + top_up);
    loan.borrow_amount = principal;
    loan.fees += fee;
    loan.expiry = expiry;
    loan.duration = new_duration;
    set_loan(env, borrower, &loan);
    model::enforce_solvency(env, config)?;

    env.events()
        .publish((Symbol::new(env, "roll"), borrower.clone()), loan.clone());
    Ok(loan)
}

pub fn add_collateral(env: &Env, config: &VaultConfig, borrower: &Address, amount: i128) -> Result<Loan, VaultError> {
    if amount <= 0 {
        return Err(VaultError::InvalidParams);
    }
    let mut loan = live_loan(env, borrower)?;
    pool_ops::pull(env, &config.issued_token, borrower, amount);
    set_total_collateral(env, get_total_collateral(env) + amount);
    loan.collateral_amount += amount;
    set_loan(env, borrower, &loan);

    env.events()
        .publish((Symbol::new(env, "add_collateral"), borrower.clone()), amount);
    Ok(loan)
}

/// Close an expired loan: its collateral is burned and the principal
/// written off against the reserve it already took.
pub fn liquidate(env: &Env, config: &VaultConfig, borrower: &Address) -> Result<Loan, VaultError> {
    let loan = active_loan(env, borrower)?;
    if !loan.is_expired(env.ledger().timestamp()) {
        return Err(VaultError::LoanNotExpired);
    }

    pool_ops::burn_issued(env, &config.issued_token, loan.collateral_amount);
    set_total_collateral(env, get_total_collateral(env) - loan.collateral_amount);
    set_total_borrowed(env, get_total_borrowed(env) - loan.borrow_amount);
    set_loan(env, borrower, &Loan::default());
    model::enforce_solvency(env, config)?;

    env.events()
        .publish((Symbol::new(env, "liquidate"), borrower.clone()), loan.clone());
    Ok(loan)
}

/// Repay loans that sit at or above the LTV threshold at `imv`, one page of
/// the loan book per call, settling each against its collateral at IMV.
///
/// Total principal repaid is capped by `budget`. Seized collateral stays in
/// the vault as free supply. Expired loans are left for `liquidate`.
pub fn self_repay(
    env: &Env,
    config: &VaultConfig,
    params: &ProtocolParameters,
    imv: i128,
    budget: i128,
) -> Result<SelfRepayReport, VaultError> {
    let mut report = SelfRepayReport::default();
    let mut count = loan_count(env);
    if count == 0 {
        set_repay_cursor(env, 0);
        return Ok(report);
    }

    let now = env.ledger().timestamp();
    let page = params.self_repay_page_size.min(count);
    let mut cursor = get_repay_cursor(env);
    let mut remaining = budget;
    let mut unlocked = 0i128;

    while report.loans_scanned < page && count > 0 {
        if cursor >= count {
            cursor = 0;
        }
        let Some(borrower) = borrower_at(env, cursor) else {
            break;
        };
        report.loans_scanned += 1;

        let mut loan = get_loan(env, &borrower);
        let repay = if loan.is_expired(now) {
            0
        } else {
            self_repay_amount(&loan, imv, params.self_repay_ltv_threshold)?.min(remaining)
        };
        if repay <= 0 {
            cursor += 1;
            continue;
        }

        // Never seize more value than the principal it settles, or the loan
        // would land back over the threshold
        let seized = repay
            .fixed_div_floor(imv, WAD)
            .ok_or(VaultError::MathOverflow)?
            .min(loan.collateral_amount);
        loan.borrow_amount -= repay;
        loan.collateral_amount -= seized;
        remaining -= repay;
        report.loans_repaid += 1;
        report.principal_repaid += repay;
        report.collateral_seized += seized;
        unlocked += seized;

        if loan.is_active() {
            set_loan(env, &borrower, &loan);
            cursor += 1;
        } else {
            // The last loan in the book moves into this slot
            pool_ops::pay(env, &config.issued_token, &borrower, loan.collateral_amount);
            unlocked += loan.collateral_amount;
            set_loan(env, &borrower, &Loan::default());
            report.loans_closed += 1;
            count -= 1;
        }
    }

    if cursor >= count {
        cursor = 0;
    }
    report.next_cursor = cursor;
    set_repay_cursor(env, cursor);
    set_total_borrowed(env, get_total_borrowed(env) - report.principal_repaid);
    set_total_collateral(env, get_total_collateral(env) - unlocked);

    if report.loans_repaid > 0 {
        env.events()
            .publish((Symbol::new(env, "self_repay"),), report.clone());
    }
    Ok(report)
}
