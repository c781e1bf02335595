// Discord commands module.
// Each cog gets its own command file.

pub mod billing;
pub mod calendar;
pub mod dice;
pub mod expressions;
pub mod help;
pub mod paranoia;
pub mod presence;
pub mod roles;
pub mod rp;

use crate::discord::{Data, Error};

/// Every command the bot registers, in help order.
pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![
        help::help(),
        dice::roll(),
        dice::flip(),
        dice::choose(),
        paranoia::paranoia(),
        rp::rp(),
        calendar::calendar(),
        calendar::moon(),
        expressions::emoji(),
        expressions::copy_sticker(),
        roles::role(),
        roles::roleadmin(),
        crate::discord::logging::commands::logging(),
        billing::whmcs(),
    ]
}
