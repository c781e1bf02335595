pub mod logging_models;
pub mod logging_service;

pub use logging_models::{
    LogConfig, LogEvent, LogEventKind, MemberChanges, TrackedMessage, VoiceTransition,
};
pub use logging_service::{member_update_changes, voice_transition, LogConfigStore, LoggingService};
