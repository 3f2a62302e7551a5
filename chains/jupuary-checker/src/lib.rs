//! # Jupuary Checker
//!
//! Resolves Solana accounts from mnemonics, private keys or addresses, looks
//! up their Jupuary allocation and sorts eligible accounts by whether their
//! JUP token account is still owned by the wallet.

pub mod account;
pub mod checker;
pub mod config;
pub mod pubkey;

pub use account::{resolve, resolve_all, Account, AccountKind, ResolveError};
pub use checker::{AllocationChecker, CheckOutcome, CheckSummary};
pub use config::CheckerConfig;
pub use pubkey::Pubkey;
