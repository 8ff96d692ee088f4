pub mod connection;

pub use connection::TransportPhase;
