pub mod ip_allowlist;

pub use ip_allowlist::{ProviderWebhookGate, provider_ip_allowlist};
