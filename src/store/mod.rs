pub mod kv;
pub mod repository;
