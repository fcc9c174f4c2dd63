pub mod blacklist;
pub mod fees;
pub mod initialize;
pub mod mint;
pub mod pause;
pub mod redemption;
pub mod roles;
pub mod wipe;

pub use blacklist::*;
pub use fees::*;
pub use initialize::*;
pub use mint::*;
pub use pause::*;
pub use redemption::*;
pub use roles::*;
pub use wipe::*;
