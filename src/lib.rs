//! Captcha facade: runs an external generator binary and splits its
//! stdout into challenge text plus a GIF image.

pub mod client;
pub mod config;
pub mod error;
pub mod invoker;
pub mod parsers;

pub use client::CaptchaClient;
pub use config::Config;
pub use error::CapfetchError;
pub use parsers::Captcha;
