pub mod transaction;

pub use transaction::{SettlementOutcome, TxKind, TxPurpose, TxStatus, merge_metadata};
