mod whmcs_client;

pub use whmcs_client::{WhmcsClient, WhmcsConfig};
