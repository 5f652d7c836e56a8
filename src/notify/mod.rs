pub mod gateway;
pub mod prompt;
