pub mod client;
pub mod connection;
pub mod lobby;
pub mod server;

pub use client::Client;
pub use connection::{Connection, ConnectionError, FrameReader, FrameWriter};
pub use lobby::{Lobby, Outgoing};
pub use server::Server;
