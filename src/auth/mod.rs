pub mod claims;
pub mod errors;
pub mod extractors;
pub mod google;
pub mod jwt;
pub mod otp;
pub mod password;

pub use claims::*;
pub use errors::*;
pub use extractors::*;
pub use jwt::*;
