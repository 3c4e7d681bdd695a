pub mod ledger;

pub use ledger::{CreditOutcome, LedgerError, PaymentLedger};
