use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Mean length of a lunation in days.
pub const SYNODIC_MONTH: f64 = 29.530588853;

/// A known new moon: 2000-01-06 18:14 UTC.
fn reference_new_moon() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(947_182_440, 0).unwrap_or_default()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    pub guild_id: u64,
    pub channel_id: Option<u64>,
    pub timezone: String,
    pub enabled: bool,
    pub include_weather: bool,
    #[serde(default)]
    pub hemisphere: Hemisphere,
    pub last_posted: Option<NaiveDate>,
}

impl CalendarConfig {
    pub fn new(guild_id: u64) -> Self {
        Self {
            guild_id,
            channel_id: None,
            timezone: "UTC".to_string(),
            enabled: false,
            include_weather: true,
            hemisphere: Hemisphere::Northern,
            last_posted: None,
        }
    }
}

// ============================================================================
// MOON
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoonPhase {
    NewMoon,
    WaxingCrescent,
    FirstQuarter,
    WaxingGibbous,
    FullMoon,
    WaningGibbous,
    LastQuarter,
    WaningCrescent,
}

impl MoonPhase {
    const ALL: [MoonPhase; 8] = [
        MoonPhase::NewMoon,
        MoonPhase::WaxingCrescent,
        MoonPhase::FirstQuarter,
        MoonPhase::WaxingGibbous,
        MoonPhase::FullMoon,
        MoonPhase::WaningGibbous,
        MoonPhase::LastQuarter,
        MoonPhase::WaningCrescent,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MoonPhase::NewMoon => "New Moon",
            MoonPhase::WaxingCrescent => "Waxing Crescent",
            MoonPhase::FirstQuarter => "First Quarter",
            MoonPhase::WaxingGibbous => "Waxing Gibbous",
            MoonPhase::FullMoon => "Full Moon",
            MoonPhase::WaningGibbous => "Waning Gibbous",
            MoonPhase::LastQuarter => "Last Quarter",
            MoonPhase::WaningCrescent => "Waning Crescent",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            MoonPhase::NewMoon => "🌑",
            MoonPhase::WaxingCrescent => "🌒",
            MoonPhase::FirstQuarter => "🌓",
            MoonPhase::WaxingGibbous => "🌔",
            MoonPhase::FullMoon => "🌕",
            MoonPhase::WaningGibbous => "🌖",
            MoonPhase::LastQuarter => "🌗",
            MoonPhase::WaningCrescent => "🌘",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoonInfo {
    pub phase: MoonPhase,
    /// Days since the last new moon.
    pub age_days: f64,
    /// Lit fraction, 0.0 to 1.0.
    pub illumination: f64,
}

/// Moon phase at noon UTC on the given date.
pub fn moon_phase(date: NaiveDate) -> MoonInfo {
    let noon = date
        .and_hms_opt(12, 0, 0)
        .unwrap_or_default()
        .and_utc();
    moon_phase_at(noon)
}

pub fn moon_phase_at(instant: DateTime<Utc>) -> MoonInfo {
    let elapsed = (instant - reference_new_moon()).num_seconds() as f64 / 86_400.0;
    let age_days = elapsed.rem_euclid(SYNODIC_MONTH);
    let fraction = age_days / SYNODIC_MONTH;

    let index = ((fraction * 8.0 + 0.5).floor() as usize) % 8;
    let illumination = (1.0 - (2.0 * PI * fraction).cos()) / 2.0;

    MoonInfo {
        phase: MoonPhase::ALL[index],
        age_days,
        illumination,
    }
}

// ============================================================================
// SEASONS
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Hemisphere {
    #[default]
    Northern,
    Southern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    pub fn emoji(&self) -> &'static str {
        match self {
            Season::Winter => "❄️",
            Season::Spring => "🌱",
            Season::Summer => "☀️",
            Season::Autumn => "🍂",
        }
    }

    fn opposite(self) -> Season {
        match self {
            Season::Winter => Season::Summer,
            Season::Spring => Season::Autumn,
            Season::Summer => Season::Winter,
            Season::Autumn => Season::Spring,
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Season::Winter => "Winter",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Autumn => "Autumn",
        };
        f.write_str(name)
    }
}

/// Meteorological seasons: whole months, winter is Dec-Feb in the north.
pub fn season(date: NaiveDate, hemisphere: Hemisphere) -> Season {
    let northern = match date.month() {
        12 | 1 | 2 => Season::Winter,
        3..=5 => Season::Spring,
        6..=8 => Season::Summer,
        _ => Season::Autumn,
    };
    match hemisphere {
        Hemisphere::Northern => northern,
        Hemisphere::Southern => northern.opposite(),
    }
}

// ============================================================================
// WEATHER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Clear,
    PartlyCloudy,
    Overcast,
    Fog,
    Rain,
    Thunderstorm,
    Snow,
    Windy,
}

impl Condition {
    pub fn label(&self) -> &'static str {
        match self {
            Condition::Clear => "Clear skies",
            Condition::PartlyCloudy => "Partly cloudy",
            Condition::Overcast => "Overcast",
            Condition::Fog => "Foggy",
            Condition::Rain => "Rain",
            Condition::Thunderstorm => "Thunderstorms",
            Condition::Snow => "Snow",
            Condition::Windy => "Windy",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Condition::Clear => "☀️",
            Condition::PartlyCloudy => "⛅",
            Condition::Overcast => "☁️",
            Condition::Fog => "🌫️",
            Condition::Rain => "🌧️",
            Condition::Thunderstorm => "⛈️",
            Condition::Snow => "🌨️",
            Condition::Windy => "🌬️",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Weather {
    pub condition: Condition,
    pub temperature_c: i32,
}

impl Weather {
    pub fn temperature_f(&self) -> i32 {
        (self.temperature_c as f64 * 9.0 / 5.0 + 32.0).round() as i32
    }
}

struct SeasonClimate {
    table: &'static [(Condition, u32)],
    min_c: i32,
    max_c: i32,
}

fn climate(season: Season) -> SeasonClimate {
    match season {
        Season::Winter => SeasonClimate {
            table: &[
                (Condition::Clear, 15),
                (Condition::Overcast, 25),
                (Condition::Fog, 10),
                (Condition::Rain, 10),
                (Condition::Snow, 30),
                (Condition::Windy, 10),
            ],
            min_c: -12,
            max_c: 6,
        },
        Season::Spring => SeasonClimate {
            table: &[
                (Condition::Clear, 25),
                (Condition::PartlyCloudy, 25),
                (Condition::Overcast, 10),
                (Condition::Rain, 25),
                (Condition::Thunderstorm, 5),
                (Condition::Windy, 10),
            ],
            min_c: 4,
            max_c: 18,
        },
        Season::Summer => SeasonClimate {
            table: &[
                (Condition::Clear, 45),
                (Condition::PartlyCloudy, 25),
                (Condition::Rain, 10),
                (Condition::Thunderstorm, 15),
                (Condition::Fog, 5),
            ],
            min_c: 16,
            max_c: 34,
        },
        Season::Autumn => SeasonClimate {
            table: &[
                (Condition::Clear, 20),
                (Condition::PartlyCloudy, 20),
                (Condition::Overcast, 20),
                (Condition::Fog, 15),
                (Condition::Rain, 15),
                (Condition::Windy, 10),
            ],
            min_c: 2,
            max_c: 16,
        },
    }
}

/// Weighted random weather for a season.
pub fn weather<R: Rng>(season: Season, rng: &mut R) -> Weather {
    let climate = climate(season);
    let condition = match WeightedIndex::new(climate.table.iter().map(|(_, w)| *w)) {
        Ok(dist) => climate.table[dist.sample(rng)].0,
        Err(_) => Condition::Clear,
    };

    let mut temperature_c = rng.gen_range(climate.min_c..=climate.max_c);
    if condition == Condition::Snow {
        temperature_c = temperature_c.min(1);
    }

    Weather {
        condition,
        temperature_c,
    }
}

// ============================================================================
// DAILY REPORT
// ============================================================================

#[derive(Debug, Clone)]
pub struct DailyReport {
    pub date: NaiveDate,
    pub weekday: Weekday,
    pub day_of_year: u32,
    pub moon: MoonInfo,
    pub season: Season,
    pub weather: Option<Weather>,
}

pub fn daily_report<R: Rng>(
    date: NaiveDate,
    hemisphere: Hemisphere,
    include_weather: bool,
    rng: &mut R,
) -> DailyReport {
    let season = season(date, hemisphere);
    DailyReport {
        date,
        weekday: date.weekday(),
        day_of_year: date.ordinal(),
        moon: moon_phase(date),
        season,
        weather: include_weather.then(|| weather(season, rng)),
    }
}
