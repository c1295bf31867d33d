pub mod key_store;
pub mod prompt;
