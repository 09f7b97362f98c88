//! Wires Store, Inference and Exchange behind the observer-facing RPC
//! surface: registration, the hold-buffer and the background GC loop.

mod dispatcher;
mod handles;

pub use dispatcher::{Dispatcher, DispatcherPeerHandler};
pub use handles::HandleTable;
