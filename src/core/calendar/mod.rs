pub mod calendar_models;
pub mod calendar_service;

pub use calendar_models::{
    daily_report, moon_phase, season, weather, CalendarConfig, Condition, DailyReport, Hemisphere,
    MoonInfo, MoonPhase, Season, Weather,
};
pub use calendar_service::{
    local_date, parse_date, parse_timezone, CalendarError, CalendarService, CalendarStore, DuePost,
};
