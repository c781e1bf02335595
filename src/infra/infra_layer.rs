// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "json_file.rs"]
pub mod json_file;

#[path = "billing/mod.rs"]
pub mod billing;

#[path = "calendar/json_store.rs"]
pub mod calendar;

#[path = "expressions/mod.rs"]
pub mod expressions;

#[path = "google/mod.rs"]
pub mod google;

#[path = "logging/mod.rs"]
pub mod logging;

#[path = "paranoia/json_store.rs"]
pub mod paranoia;

#[path = "roles/json_store.rs"]
pub mod roles;

#[path = "rp/mod.rs"]
pub mod rp;
