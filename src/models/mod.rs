pub mod bill;
pub mod contact;
pub mod pricing;
pub mod service_request;
pub mod testimonial;
pub mod user;

pub use bill::*;
pub use contact::*;
pub use pricing::*;
pub use service_request::*;
pub use testimonial::*;
pub use user::*;
