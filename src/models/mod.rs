// Re-export all model types
pub use self::enums::*;
pub use self::envelope::*;
pub use self::errors::*;
pub use self::profile::*;
pub use self::validation::*;
pub use self::video::*;
pub use self::waitlist::*;
pub use self::webhook::*;

mod enums;
mod envelope;
mod errors;
mod profile;
mod validation;
mod video;
mod waitlist;
mod webhook;
