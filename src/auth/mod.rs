mod claims;
mod jwt;

pub use claims::{Claims, ADMIN_ROLE};
pub use jwt::JwtValidator;
