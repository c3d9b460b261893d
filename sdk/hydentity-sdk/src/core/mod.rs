pub mod connection;
pub mod constants;
pub mod forwarder;
pub mod signer;
