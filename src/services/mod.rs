pub mod purchase;
pub mod reconciler;
pub mod wallet;

pub use purchase::{PurchaseOutcome, PurchaseService};
pub use reconciler::{Reconciler, SettleResult};
pub use wallet::WalletService;
