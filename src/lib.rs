pub mod buffer;
pub mod config;
pub mod rdbms;
pub mod storage;
