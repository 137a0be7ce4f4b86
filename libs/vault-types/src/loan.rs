use soroban_sdk::contracttype;

/// Per-borrower loan record. A zeroed record means no active loan.
#[contracttype]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Loan {
    /// Reserve-asset principal owed
    pub borrow_amount: i128,
    /// Issued token locked in the vault
    pub collateral_amount: i128,
    /// Fees charged over the life of the loan
    pub fees: i128,
    /// Ledger timestamp after which the loan can be liquidated
    pub expiry: u64,
    /// Duration of the current term in seconds
    pub duration: u64,
}

impl Loan {
    pub fn is_active(&self) -> bool {
        self.borrow_amount > 0
    }

    pub fn is_expired(&self, now: u64) -> bool {
        now > self.expiry
    }
}
