//! Price- and weather-aware heating control.
//!
//! Day-ahead electricity prices and a short-range weather prognosis are
//! turned into an hourly offset for a heat pump ([`offset`]), corrected for
//! the live indoor climate ([`controller::house_heater`]), and used to plan
//! hot-water boosts ([`controller::water_heater`]).

pub mod config;
pub mod controller;
pub mod domain;
pub mod input;
pub mod offset;
pub mod prices;
pub mod sensors;
pub mod telemetry;
