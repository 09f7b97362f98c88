//! A concrete TCP transport for peer-to-peer panorama RPCs.
//!
//! `panorama-exchange` describes the two RPCs a peer connection must carry
//! ([`panorama_exchange::PeerClient`]) purely in terms of a trait, so that
//! its fan-out logic never has to know about sockets. This crate supplies
//! the other half: [`TcpPeerClientFactory`] dials peers for the client side,
//! and [`serve`] accepts incoming connections for the server side, framed
//! the way `arti-rpcserver` frames its own RPC connections — JSON over an
//! `asynchronous_codec` `Framed` transport, wrapping a tokio socket via
//! `tokio_util::compat`.

mod client;
mod listen;
mod wire;

pub use client::{TcpPeerClient, TcpPeerClientFactory};
pub use listen::{serve, PeerRequestHandler};
