pub mod deployment;
pub mod otp;
pub mod pipeline;
pub mod project;
pub mod user;
