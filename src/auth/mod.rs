pub mod jwt;
pub mod middleware;
pub mod oauth;
pub mod otp;
pub mod password;
