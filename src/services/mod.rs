pub mod email;
pub mod payments;

pub use email::*;
pub use payments::*;
