use soroban_sdk::contracterror;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum VaultError {
    AlreadyInitialized = 1,
    NotInitialized = 2,
    // Precondition not met
    AboveThreshold = 3,
    BelowThreshold = 4,
    ActiveLoan = 5,
    NoActiveLoan = 6,
    // Invariant violations
    InsolvencyInvariant = 7,
    ShiftPriceDeviationExceeded = 8,
    // Input validation
    InvalidTick = 9,
    InvalidDuration = 10,
    InvalidParams = 11,
    // Manipulation defenses
    TwapDeviationExceeded = 12,
    ShiftRateLimited = 13,
    Manipulated = 14,
    // Lending
    InsufficientCollateral = 15,
    LoanExpired = 16,
    LoanNotExpired = 17,
    CantRollLoan = 18,
    InsufficientLiquidity = 19,
    ReentrantCall = 20,
    MathOverflow = 21,
}
