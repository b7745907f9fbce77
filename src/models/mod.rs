pub mod appointment;
pub mod enums;
pub mod profile;
pub mod record;
pub mod review;
pub mod user;

pub use appointment::*;
pub use enums::*;
pub use profile::*;
pub use record::*;
pub use review::*;
pub use user::*;
