//! Helpers that assemble common spells, so a loader doesn't have to build
//! every `Factor`/products/profile/action tuple by hand.

mod deferral;
mod filecopy;

pub use deferral::deferral;
pub use filecopy::{file_copy, Owner};
