//! Sender implementations

#[cfg(feature = "file")]
pub mod file;
#[cfg(feature = "network")]
pub mod tcp;

pub use crate::core::Sender;
#[cfg(feature = "file")]
pub use file::FileSender;
#[cfg(feature = "network")]
pub use tcp::TcpSender;
