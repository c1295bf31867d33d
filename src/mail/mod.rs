pub mod decoders;
pub mod error;
pub mod events_client;
