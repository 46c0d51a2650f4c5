pub mod analysis;
pub mod error;
pub mod progress;
pub mod request;
