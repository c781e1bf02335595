pub mod rp_models;
pub mod rp_service;

pub use rp_models::{
    count_words, extract_google_id, Character, CharacterStats, NewRpEntry, RpEntry, RpSettings,
    SyncReport, SyncTarget,
};
pub use rp_service::{RpError, RpService, RpStore, RpSync};
