pub mod dto;

#[cfg(feature = "client")]
pub mod client;

#[cfg(feature = "client")]
pub mod submit;
