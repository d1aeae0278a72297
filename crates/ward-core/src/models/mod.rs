//! Domain models for the ward system.

mod facility;
mod overview;
mod patient;
mod record;
mod staff;

pub use facility::*;
pub use overview::*;
pub use patient::*;
pub use record::*;
pub use staff::*;
