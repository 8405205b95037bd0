//! Domain models for the vaccination scheduling system.

mod animal;
mod protocol;
mod record;
mod vaccine;
mod veterinarian;

pub use animal::*;
pub use protocol::*;
pub use record::*;
pub use vaccine::*;
pub use veterinarian::*;
