#![cfg(test)]

use clamm_pool::{ClammPool, ClammPoolClient};
use issued_token::{IssuedToken, IssuedTokenClient};
use soroban_sdk::testutils::{Address as _, Ledger};
use soroban_sdk::token::{StellarAssetClient, TokenClient};
use soroban_sdk::{Address, Env, String};
use vault_types::{ProtocolParameters, Tier, VaultConfig, VaultError, BPS, Q96, WAD};

use crate::{LiquidityVault, LiquidityVaultClient};

const TOKEN: i128 = 10_000_000;
const DAY: u64 = 86_400;
const HOUR: u64 = 3_600;

const BOOTSTRAP_RESERVE: i128 = 650_000 * TOKEN;
const OPENING_FLOAT: i128 = 1_000_000 * TOKEN;
const TRADE: i128 = 50_000 * TOKEN;

struct Setup<'a> {
    env: Env,
    vault_id: Address,
    vault: LiquidityVaultClient<'a>,
    pool: ClammPoolClient<'a>,
    issued: IssuedTokenClient<'a>,
    reserve: TokenClient<'a>,
    admin: Address,
    trader: Address,
    keeper: Address,
    staking: Address,
    dividends: Address,
}

fn test_params() -> ProtocolParameters {
    ProtocolParameters {
        floor_percentage: 4_600,
        max_twap_deviation_ticks: 0,
        ..ProtocolParameters::standard()
    }
}

fn setup_with<'a>(params: ProtocolParameters) -> Setup<'a> {
    let env = Env::default();
    env.mock_all_auths();
    env.cost_estimate().budget().reset_unlimited();
    env.ledger().with_mut(|l| l.timestamp = 1_700_000_000);

    let admin = Address::generate(&env);
    let trader = Address::generate(&env);
    let keeper = Address::generate(&env);
    let staking = Address::generate(&env);
    let dividends = Address::generate(&env);

    let reserve_id = env.register_stellar_asset_contract_v2(admin.clone()).address();
    StellarAssetClient::new(&env, &reserve_id).mint(&admin, &BOOTSTRAP_RESERVE);
    StellarAssetClient::new(&env, &reserve_id).mint(&trader, &(10_000_000 * TOKEN));

    let vault_id = env.register(LiquidityVault, ());
    let issued_id = env.register(IssuedToken, ());
    let issued = IssuedTokenClient::new(&env, &issued_id);
    issued.initialize(
        &vault_id,
        &String::from_str(&env, "Floor Backed Token"),
        &String::from_str(&env, "FBT"),
    );

    let pool = ClammPoolClient::new(&env, &env.register(ClammPool, ()));
    pool.initialize(&issued_id, &reserve_id, &3000u32, &Q96);

    let vault = LiquidityVaultClient::new(&env, &vault_id);
    vault.initialize(
        &VaultConfig {
            admin: admin.clone(),
            pool: pool.address.clone(),
            issued_token: issued_id,
            reserve_token: reserve_id.clone(),
            staking_sink: staking.clone(),
            dividends_sink: dividends.clone(),
            tick_spacing: 60,
        },
        &params,
    );

    Setup {
        reserve: TokenClient::new(&env, &reserve_id),
        env,
        vault_id,
        vault,
        pool,
        issued,
        admin,
        trader,
        keeper,
        staking,
        dividends,
    }
}

/// Floor at 0.5, spot at 1.0, one million tokens in the trader's hands
fn bootstrapped<'a>(params: ProtocolParameters) -> Setup<'a> {
    let s = setup_with(params);
    s.vault.bootstrap(&s.admin, &BOOTSTRAP_RESERVE, &(WAD / 2), &s.trader, &OPENING_FLOAT);
    s
}

fn advance(s: &Setup, seconds: u64) {
    let now = s.env.ledger().timestamp();
    s.env.ledger().with_mut(|l| l.timestamp = now + seconds);
}

fn buy(s: &Setup, reserve_in: i128) {
    s.pool.swap(&s.trader, &false, &reserve_in, &0u128);
}

fn sell(s: &Setup, issued_in: i128) {
    s.pool.swap(&s.trader, &true, &issued_in, &0u128);
}

fn buy_until_ratio_below(s: &Setup, ratio: i128) -> u32 {
    let mut trades = 0;
    while s.vault.liquidity_ratio() >= ratio {
        buy(s, TRADE);
        trades += 1;
        assert!(trades <= 30, "buying did not push the ratio down");
    }
    trades
}

fn sell_until_ratio_above(s: &Setup, ratio: i128) -> u32 {
    let mut trades = 0;
    while s.vault.liquidity_ratio() <= ratio {
        sell(s, TRADE);
        trades += 1;
        assert!(trades <= 9, "selling did not push the ratio up");
    }
    trades
}

fn assert_solvent(s: &Setup) {
    let snapshot = s.vault.snapshot();
    assert!(snapshot.anchor_capacity + snapshot.floor_capacity > snapshot.circulating_supply);
}

/// LTV in bps at the vault's current IMV
fn ltv_bps(s: &Setup, borrower: &Address) -> i128 {
    let loan = s.vault.get_loan(borrower);
    let value = loan.collateral_amount * (s.vault.imv() / 1_000_000_000) / 1_000_000_000;
    loan.borrow_amount * BPS / value
}

// === Initialization ===

#[test]
fn test_initialize_twice_fails() {
    let s = setup_with(test_params());
    let config = s.vault.config();
    assert_eq!(
        s.vault.try_initialize(&config, &test_params()).err(),
        Some(Ok(VaultError::AlreadyInitialized))
    );
}

#[test]
fn test_initialize_rejects_reversed_pool() {
    let s = setup_with(test_params());
    let config = s.vault.config();

    // a pool quoting the reserve as token0
    let reversed = ClammPoolClient::new(&s.env, &s.env.register(ClammPool, ()));
    reversed.initialize(&config.reserve_token, &config.issued_token, &3000u32, &Q96);

    let other = LiquidityVaultClient::new(&s.env, &s.env.register(LiquidityVault, ()));
    let result = other.try_initialize(
        &VaultConfig {
            pool: reversed.address.clone(),
            ..config
        },
        &test_params(),
    );
    assert_eq!(result.err(), Some(Ok(VaultError::InvalidParams)));
}

#[test]
fn test_initialize_rejects_bad_params() {
    let s = setup_with(test_params());
    let other = LiquidityVaultClient::new(&s.env, &s.env.register(LiquidityVault, ()));
    let params = ProtocolParameters {
        slide_ratio: 9_000_000,
        ..test_params()
    };
    assert_eq!(
        other.try_initialize(&s.vault.config(), &params).err(),
        Some(Ok(VaultError::InvalidParams))
    );
}

// === Bootstrap ===

#[test]
fn test_bootstrap_lays_out_three_tiers() {
    let s = bootstrapped(test_params());

    let floor = s.vault.position(&Tier::Floor);
    let anchor = s.vault.position(&Tier::Anchor);
    let discovery = s.vault.position(&Tier::Discovery);
    assert_eq!((floor.lower_tick, floor.upper_tick), (-7020, -6960));
    assert_eq!((anchor.lower_tick, anchor.upper_tick), (-6960, 960));
    assert_eq!(discovery.lower_tick, 960);
    assert!(discovery.upper_tick > discovery.lower_tick);
    assert_eq!(discovery.liquidity, anchor.liquidity);

    // the pool sees the vault's ranges
    let in_pool = s.pool.position(&s.vault_id, &-6960, &960);
    assert_eq!(in_pool.liquidity, anchor.liquidity);

    let snapshot = s.vault.snapshot();
    // ranges are valued rounding down, so a few units of dust may read as circulating
    assert!((OPENING_FLOAT..=OPENING_FLOAT + 3).contains(&snapshot.circulating_supply));
    assert_eq!(s.issued.balance(&s.trader), OPENING_FLOAT);
    // about 1.097
    assert!(snapshot.liquidity_ratio > 10_900_000 && snapshot.liquidity_ratio < 11_000_000);
    // IMV is the price at tick -6960, just under 0.5
    assert!(snapshot.imv < WAD / 2 && snapshot.imv > WAD * 49 / 100);
    assert_solvent(&s);

    // reserve all went into ranges, short of rounding
    assert!(s.reserve.balance(&s.vault_id) < TOKEN);
}

#[test]
fn test_bootstrap_only_once() {
    let s = bootstrapped(test_params());
    assert_eq!(
        s.vault
            .try_bootstrap(&s.admin, &TOKEN, &(WAD / 2), &s.trader, &TOKEN)
            .err(),
        Some(Ok(VaultError::AlreadyInitialized))
    );
}

#[test]
fn test_bootstrap_floor_must_sit_below_spot() {
    let s = setup_with(test_params());
    assert_eq!(
        s.vault
            .try_bootstrap(&s.admin, &BOOTSTRAP_RESERVE, &(WAD * 2), &s.trader, &OPENING_FLOAT)
            .err(),
        Some(Ok(VaultError::InvalidParams))
    );
}

#[test]
fn test_rebalance_before_bootstrap() {
    let s = setup_with(test_params());
    assert_eq!(s.vault.try_shift(&s.keeper).err(), Some(Ok(VaultError::NotInitialized)));
    assert_eq!(s.vault.try_slide(&s.keeper).err(), Some(Ok(VaultError::NotInitialized)));
}

// === Shift ===

#[test]
fn test_buy_pressure_then_shift() {
    let s = bootstrapped(test_params());
    let before = s.vault.snapshot();
    let floor_before = s.vault.position(&Tier::Floor);

    let trades = buy_until_ratio_below(&s, 9_000_000);
    assert!(trades >= 7);
    advance(&s, HOUR);

    let outcome = s.vault.shift(&s.keeper);
    assert!(outcome.ratio_before < 9_000_000);
    assert!(outcome.ratio_after >= 9_000_000);
    assert!(outcome.imv_after > outcome.imv_before);
    assert_eq!(outcome.imv_before, before.imv);

    let after = s.vault.snapshot();
    assert_eq!(after.imv, outcome.imv_after);
    assert!(after.floor_balance > before.floor_balance);
    assert!(s.vault.position(&Tier::Floor).liquidity > floor_before.liquidity);
    assert!(s.vault.position(&Tier::Floor).upper_tick > floor_before.upper_tick);
    assert_solvent(&s);

    // anchor now starts where the new floor ends
    let floor = s.vault.position(&Tier::Floor);
    let anchor = s.vault.position(&Tier::Anchor);
    let discovery = s.vault.position(&Tier::Discovery);
    assert_eq!(anchor.lower_tick, floor.upper_tick);
    assert_eq!(discovery.lower_tick, anchor.upper_tick);
    assert!(anchor.upper_tick > s.pool.slot0().1);

    // keeper paid in reserve, staking rewards minted
    assert!(outcome.rewards.caller_fee > 0);
    assert_eq!(s.reserve.balance(&s.keeper), outcome.rewards.caller_fee);
    assert!(outcome.rewards.staking_amount > 0);
    assert_eq!(s.issued.balance(&s.staking), outcome.rewards.staking_amount);
}

#[test]
fn test_repeated_buy_pressure_keeps_shifting() {
    let s = bootstrapped(test_params());
    let mut imv = s.vault.imv();
    let mut floor_liquidity = s.vault.position(&Tier::Floor).liquidity;

    for _ in 0..2 {
        buy_until_ratio_below(&s, 9_000_000);
        advance(&s, HOUR);
        let outcome = s.vault.shift(&s.keeper);
        assert!(outcome.ratio_after >= 9_000_000);
        assert_solvent(&s);

        let floor = s.vault.position(&Tier::Floor);
        assert!(outcome.imv_after >= imv);
        assert!(floor.liquidity >= floor_liquidity);
        imv = outcome.imv_after;
        floor_liquidity = floor.liquidity;

        // discovery is sized from the float, not from the thin anchor
        let discovery = s.vault.position(&Tier::Discovery);
        assert!(discovery.lower_tick > s.pool.slot0().1);
        assert!(discovery.liquidity > s.vault.position(&Tier::Anchor).liquidity);
    }
    assert!(imv > WAD * 9 / 10);
}

#[test]
fn test_shift_above_threshold() {
    let s = bootstrapped(test_params());
    advance(&s, HOUR);
    assert_eq!(s.vault.try_shift(&s.keeper).err(), Some(Ok(VaultError::AboveThreshold)));
}

#[test]
fn test_shift_rate_limited() {
    let s = bootstrapped(test_params());
    buy_until_ratio_below(&s, 9_000_000);
    assert_eq!(s.vault.try_shift(&s.keeper).err(), Some(Ok(VaultError::ShiftRateLimited)));

    advance(&s, HOUR / 2);
    assert_eq!(s.vault.try_shift(&s.keeper).err(), Some(Ok(VaultError::ShiftRateLimited)));

    advance(&s, HOUR / 2);
    s.vault.shift(&s.keeper);
}

#[test]
fn test_shift_pays_accrued_fees_to_dividends() {
    let s = bootstrapped(test_params());
    let borrower = Address::generate(&s.env);
    s.issued.transfer(&s.trader, &borrower, &(100_000 * TOKEN));
    s.vault.borrow(&borrower, &(20_000 * TOKEN), &DAY);
    let fees = s.vault.accrued_fees();
    assert!(fees > 0);

    buy_until_ratio_below(&s, 9_000_000);
    advance(&s, HOUR);
    let outcome = s.vault.shift(&s.keeper);

    assert_eq!(outcome.rewards.dividends_amount, fees);
    assert_eq!(s.reserve.balance(&s.dividends), fees);
    assert_eq!(s.vault.accrued_fees(), 0);
}

#[test]
fn test_twap_guard_rejects_fresh_spike() {
    let params = ProtocolParameters {
        max_twap_deviation_ticks: 500,
        ..test_params()
    };
    let s = bootstrapped(params);
    advance(&s, HOUR);
    buy_until_ratio_below(&s, 9_000_000);

    // the hour before the spike sat at tick 0
    assert_eq!(
        s.vault.try_shift(&s.keeper).err(),
        Some(Ok(VaultError::TwapDeviationExceeded))
    );

    // once the new price has held long enough the shift goes through
    advance(&s, 100_000);
    s.vault.shift(&s.keeper);
    assert_solvent(&s);
}

#[test]
fn test_checkpoint_restarts_twap_window() {
    let params = ProtocolParameters {
        max_twap_deviation_ticks: 500,
        ..test_params()
    };
    let s = bootstrapped(params);
    advance(&s, HOUR);
    buy_until_ratio_below(&s, 9_000_000);
    s.vault.checkpoint_price();
    advance(&s, HOUR);

    // the whole window sits at the new price
    s.vault.shift(&s.keeper);
}

#[test]
fn test_fresh_checkpoint_cannot_vouch_for_spot() {
    let params = ProtocolParameters {
        max_twap_deviation_ticks: 500,
        ..test_params()
    };
    let s = bootstrapped(params);
    advance(&s, HOUR);

    // restart the window, move spot and shift in the same ledger
    s.vault.checkpoint_price();
    buy_until_ratio_below(&s, 9_000_000);
    assert_eq!(
        s.vault.try_shift(&s.keeper).err(),
        Some(Ok(VaultError::TwapDeviationExceeded))
    );

    // nor can the window be restarted again right away
    assert_eq!(
        s.vault.try_checkpoint_price().err(),
        Some(Ok(VaultError::ShiftRateLimited))
    );

    // an hour held at the new price is a real window
    advance(&s, HOUR);
    s.vault.shift(&s.keeper);
    assert_solvent(&s);
}

// === Slide ===

#[test]
fn test_sell_pressure_then_slide() {
    let s = bootstrapped(test_params());
    let floor_before = s.vault.position(&Tier::Floor);
    let imv_before = s.vault.imv();

    sell_until_ratio_above(&s, 11_500_000);
    advance(&s, HOUR);

    let outcome = s.vault.slide(&s.keeper);
    assert!(outcome.ratio_before > 11_500_000);
    assert!(outcome.ratio_after <= 11_500_000);
    assert!(outcome.ratio_after > 10_000_000);

    // the Floor is untouched
    assert_eq!(s.vault.position(&Tier::Floor), floor_before);
    assert_eq!(s.vault.imv(), imv_before);
    assert_solvent(&s);

    // anchor tightened, unused reserve parked in the vault
    let anchor = s.vault.position(&Tier::Anchor);
    assert_eq!(anchor.lower_tick, floor_before.upper_tick);
    assert!(anchor.upper_tick < 960);
    assert_eq!(outcome.anchor_liquidity, anchor.liquidity);
    assert!(outcome.parked_reserve > 0);
    assert_eq!(s.reserve.balance(&s.vault_id), outcome.parked_reserve);
    assert!(outcome.discovery_liquidity >= outcome.anchor_liquidity);
}

#[test]
fn test_slide_below_threshold() {
    let s = bootstrapped(test_params());
    advance(&s, HOUR);
    assert_eq!(s.vault.try_slide(&s.keeper).err(), Some(Ok(VaultError::BelowThreshold)));
}

// === Model ===

#[test]
fn test_third_party_liquidity_is_ignored() {
    let s = bootstrapped(test_params());
    let before = s.vault.snapshot();
    let anchor_capacity = s.vault.position_capacity(&Tier::Anchor);

    let lp = Address::generate(&s.env);
    StellarAssetClient::new(&s.env, &s.reserve.address).mint(&lp, &(1_000_000 * TOKEN));
    s.issued.transfer(&s.trader, &lp, &(100_000 * TOKEN));
    s.pool.mint(&lp, &-7020, &-6960, &(1_000_000 * TOKEN as u128));
    s.pool.mint(&lp, &-6960, &960, &(1_000_000 * TOKEN as u128));

    assert_eq!(s.vault.snapshot(), before);
    assert_eq!(s.vault.position_capacity(&Tier::Anchor), anchor_capacity);
}

#[test]
fn test_circulating_supply_excludes_vault_holdings() {
    let s = bootstrapped(test_params());
    let circulating = s.vault.circulating_supply();
    assert!(s.issued.total_supply() > circulating);

    // tokens handed to the vault stop circulating
    s.issued.transfer(&s.trader, &s.vault_id, &(1_000 * TOKEN));
    assert_eq!(s.vault.circulating_supply(), circulating - 1_000 * TOKEN);
}

#[test]
fn test_reentrant_call_rejected() {
    let s = bootstrapped(test_params());
    s.env.as_contract(&s.vault_id, || crate::storage::set_locked(&s.env, true));
    advance(&s, HOUR);

    assert_eq!(s.vault.try_shift(&s.keeper).err(), Some(Ok(VaultError::ReentrantCall)));
    let borrower = Address::generate(&s.env);
    assert_eq!(
        s.vault.try_borrow(&borrower, &TOKEN, &DAY).err(),
        Some(Ok(VaultError::ReentrantCall))
    );
}

// === Lending ===

fn funded_borrower(s: &Setup, issued: i128) -> Address {
    let borrower = Address::generate(&s.env);
    s.issued.transfer(&s.trader, &borrower, &issued);
    borrower
}

#[test]
fn test_loan_fee_is_pro_rata() {
    let s = setup_with(test_params());
    let day = s.vault.loan_fee(&(100 * TOKEN), &DAY);
    assert_eq!(day, 570_000);
    assert_eq!(s.vault.loan_fee(&(100 * TOKEN), &(DAY / 2)) * 2, day);
    assert!(s.vault.loan_fee(&(100 * TOKEN), &HOUR) > 0);
}

#[test]
fn test_borrow_and_payback() {
    let s = bootstrapped(test_params());
    let borrower = funded_borrower(&s, 100_000 * TOKEN);
    let floor_before = s.vault.snapshot().floor_balance;
    let circulating_before = s.vault.circulating_supply();

    let amount = 20_000 * TOKEN;
    let loan = s.vault.borrow(&borrower, &amount, &DAY);
    let fee = s.vault.loan_fee(&amount, &DAY);
    assert_eq!(loan.borrow_amount, amount);
    assert_eq!(loan.fees, fee);
    assert_eq!(loan.expiry, s.env.ledger().timestamp() + DAY);
    assert_eq!(s.reserve.balance(&borrower), amount - fee);
    assert_eq!(s.issued.balance(&borrower), 100_000 * TOKEN - loan.collateral_amount);
    assert_eq!(s.vault.loan_count(), 1);
    assert_eq!(s.vault.total_borrowed(), amount);
    assert_eq!(s.vault.accrued_fees(), fee);

    // collateral is held by the vault, out of circulation
    assert_eq!(s.vault.circulating_supply(), circulating_before - loan.collateral_amount);
    let floor_after_borrow = s.vault.snapshot().floor_balance;
    assert!(floor_before - floor_after_borrow >= amount);
    assert!(floor_before - floor_after_borrow <= amount + 2);
    assert_solvent(&s);

    assert_eq!(
        s.vault.try_borrow(&borrower, &TOKEN, &DAY).err(),
        Some(Ok(VaultError::ActiveLoan))
    );

    // half back, half the collateral released
    let partial = s.vault.payback(&borrower, &(amount / 2));
    assert_eq!(partial.borrow_amount, amount / 2);
    assert_eq!(partial.collateral_amount, loan.collateral_amount - loan.collateral_amount / 2);
    assert!(s.vault.snapshot().floor_balance > floor_after_borrow);

    StellarAssetClient::new(&s.env, &s.reserve.address).mint(&borrower, &amount);
    let closed = s.vault.payback(&borrower, &amount);
    assert_eq!(closed.borrow_amount, 0);
    assert_eq!(closed.collateral_amount, 0);
    assert_eq!(s.issued.balance(&borrower), 100_000 * TOKEN);
    assert_eq!(s.vault.loan_count(), 0);
    assert_eq!(s.vault.total_borrowed(), 0);
    assert_eq!(
        s.vault.try_payback(&borrower, &TOKEN).err(),
        Some(Ok(VaultError::NoActiveLoan))
    );
    assert_solvent(&s);
}

#[test]
fn test_borrow_validation() {
    let s = bootstrapped(test_params());
    let borrower = funded_borrower(&s, 100 * TOKEN);

    assert_eq!(
        s.vault.try_borrow(&borrower, &TOKEN, &60).err(),
        Some(Ok(VaultError::InvalidDuration))
    );
    assert_eq!(
        s.vault.try_borrow(&borrower, &TOKEN, &(31 * DAY)).err(),
        Some(Ok(VaultError::InvalidDuration))
    );
    // 100 tokens at ~0.5 back under 50 of reserve
    assert_eq!(
        s.vault.try_borrow(&borrower, &(60 * TOKEN), &DAY).err(),
        Some(Ok(VaultError::InsufficientCollateral))
    );

    // more than half the floor
    let whale = funded_borrower(&s, 900_000 * TOKEN);
    assert_eq!(
        s.vault.try_borrow(&whale, &(200_000 * TOKEN), &DAY).err(),
        Some(Ok(VaultError::InsufficientLiquidity))
    );
}

#[test]
fn test_borrow_refused_with_spot_at_floor() {
    let s = bootstrapped(test_params());
    let borrower = funded_borrower(&s, 100_000 * TOKEN);
    // dump the anchor until spot reaches the floor range
    sell(&s, 600_000 * TOKEN);
    assert!(s.pool.slot0().1 <= -6960);

    assert_eq!(
        s.vault.try_borrow(&borrower, &TOKEN, &DAY).err(),
        Some(Ok(VaultError::Manipulated))
    );
}

#[test]
fn test_roll_extends_and_charges() {
    let s = bootstrapped(test_params());
    let borrower = funded_borrower(&s, 100_000 * TOKEN);
    let amount = 20_000 * TOKEN;
    let first = s.vault.borrow(&borrower, &amount, &DAY);

    advance(&s, HOUR);
    assert_eq!(
        s.vault.try_roll(&borrower, &HOUR).err(),
        Some(Ok(VaultError::CantRollLoan))
    );

    let rolled = s.vault.roll(&borrower, &(2 * DAY));
    assert_eq!(rolled.expiry, s.env.ledger().timestamp() + 2 * DAY);
    assert_eq!(rolled.duration, 2 * DAY);
    assert_eq!(rolled.collateral_amount, first.collateral_amount);
    assert!(rolled.borrow_amount >= amount);
    let roll_fee = s.vault.loan_fee(&rolled.borrow_amount, &(2 * DAY));
    assert_eq!(rolled.fees, first.fees + roll_fee);
    assert_eq!(s.vault.accrued_fees(), first.fees + roll_fee);
    assert_solvent(&s);
}

#[test]
fn test_add_collateral_and_liquidate() {
    let s = bootstrapped(test_params());
    let borrower = funded_borrower(&s, 100_000 * TOKEN);
    let loan = s.vault.borrow(&borrower, &(10_000 * TOKEN), &DAY);

    let topped = s.vault.add_collateral(&borrower, &(5_000 * TOKEN));
    assert_eq!(topped.collateral_amount, loan.collateral_amount + 5_000 * TOKEN);

    let liquidator = Address::generate(&s.env);
    assert_eq!(
        s.vault.try_liquidate(&liquidator, &borrower).err(),
        Some(Ok(VaultError::LoanNotExpired))
    );

    advance(&s, DAY + 1);
    assert_eq!(
        s.vault.try_payback(&borrower, &TOKEN).err(),
        Some(Ok(VaultError::LoanExpired))
    );

    let supply = s.issued.total_supply();
    let closed = s.vault.liquidate(&liquidator, &borrower);
    assert_eq!(closed.collateral_amount, topped.collateral_amount);
    assert_eq!(s.issued.total_supply(), supply - topped.collateral_amount);
    assert_eq!(s.vault.get_loan(&borrower).borrow_amount, 0);
    assert_eq!(s.vault.loan_count(), 0);
    assert_eq!(s.vault.total_borrowed(), 0);
    assert_solvent(&s);
}

#[test]
fn test_shift_self_repays_loans_over_threshold() {
    let params = ProtocolParameters {
        self_repay_ltv_threshold: 5_000,
        ..test_params()
    };
    let s = bootstrapped(params);

    let leveraged = funded_borrower(&s, 100_000 * TOKEN);
    s.vault.borrow(&leveraged, &(20_000 * TOKEN), &(7 * DAY));

    let cautious = funded_borrower(&s, 100_000 * TOKEN);
    s.vault.borrow(&cautious, &(1_000 * TOKEN), &(7 * DAY));
    let cautious_loan = s.vault.add_collateral(&cautious, &(50_000 * TOKEN));

    buy_until_ratio_below(&s, 9_000_000);
    advance(&s, HOUR);
    let outcome = s.vault.shift(&s.keeper);

    assert_eq!(outcome.self_repay.loans_scanned, 2);
    assert_eq!(outcome.self_repay.loans_repaid, 1);
    assert!(outcome.self_repay.principal_repaid > 0);

    // back to the threshold at the new IMV, never over it
    let repaid = s.vault.get_loan(&leveraged);
    let value = repaid.collateral_amount * s.vault.imv() / WAD;
    assert!(repaid.borrow_amount * BPS <= 5_000 * value);
    let ltv = ltv_bps(&s, &leveraged);
    assert!(ltv >= 4_990, "ltv {}", ltv);
    assert_eq!(
        s.vault.total_borrowed(),
        21_000 * TOKEN - outcome.self_repay.principal_repaid
    );

    // the loan under the threshold is untouched
    assert_eq!(s.vault.get_loan(&cautious), cautious_loan);
    assert_solvent(&s);
}

// === Configuration ===

#[test]
fn test_set_parameters_bumps_version() {
    let s = setup_with(test_params());
    let params = ProtocolParameters {
        skim_ratio: 300,
        ..test_params()
    };
    assert_eq!(s.vault.set_parameters(&params), 2);
    let stored = s.vault.params();
    assert_eq!(stored.version, 2);
    assert_eq!(stored.skim_ratio, 300);

    let bad = ProtocolParameters {
        self_repay_page_size: 0,
        ..test_params()
    };
    assert_eq!(
        s.vault.try_set_parameters(&bad).err(),
        Some(Ok(VaultError::InvalidParams))
    );
}
