//! Built-in chain-state rules.

mod known_target;
mod no_self_target;
mod trusted_creator;

pub use known_target::KnownTargetRule;
pub use no_self_target::NoSelfTargetRule;
pub use trusted_creator::TrustedCreatorRule;
