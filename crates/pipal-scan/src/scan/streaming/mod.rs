pub mod chunk;
pub mod coordinator;
pub mod processor;
pub mod retry;
