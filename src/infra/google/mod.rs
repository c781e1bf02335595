mod rp_sync;
mod service_account;

pub use rp_sync::GoogleRpSync;
pub use service_account::{ServiceAccountAuth, SCOPE_DOCUMENTS, SCOPE_SPREADSHEETS};
