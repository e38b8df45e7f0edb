pub mod config;
pub mod lessons;
pub mod speech;

pub use config::*;
pub use lessons::*;
pub use speech::*;
