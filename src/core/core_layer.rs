// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "billing/mod.rs"]
pub mod billing;

#[path = "calendar/mod.rs"]
pub mod calendar;

#[path = "dice/dice_service.rs"]
pub mod dice;

#[path = "expressions/expression_service.rs"]
pub mod expressions;

#[path = "logging/mod.rs"]
pub mod logging;

#[path = "paranoia/mod.rs"]
pub mod paranoia;

#[path = "roles/role_service.rs"]
pub mod roles;

#[path = "rp/mod.rs"]
pub mod rp;
