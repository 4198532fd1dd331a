pub mod cache;
pub mod error;
pub mod oauth;
pub mod proxy;
