//! External-collaborator service clients.

pub mod psp;

pub use psp::PspClient;
