pub mod jwt;
pub mod otp;
pub mod password;

pub use jwt::*;
pub use otp::*;
pub use password::*;
