pub mod climate;
pub mod ev_charging;
pub mod prognosis;
pub mod types;

pub use climate::*;
pub use ev_charging::*;
pub use prognosis::*;
pub use types::*;
