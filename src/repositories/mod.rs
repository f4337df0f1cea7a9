pub mod bill_repository;
pub mod contact_repository;
pub mod pricing_repository;
pub mod service_request_repository;
pub mod testimonial_repository;
pub mod user_repository;

pub use bill_repository::*;
pub use contact_repository::*;
pub use pricing_repository::*;
pub use service_request_repository::*;
pub use testimonial_repository::*;
pub use user_repository::*;
