pub mod client;
pub mod endpoint;

pub use client::{RecognitionClient, Transmitter};
pub use endpoint::{ResponseContract, Variant};

#[cfg(test)]
pub(crate) mod test_server;
