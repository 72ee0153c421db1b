//! Signaling server for Wizzeye, a hands-free remote assistance app.
//!
//! Two participants meet in a named room and exchange the session
//! descriptions and transport candidates needed to establish a direct
//! peer-to-peer media session between their browsers. The server routes
//! signaling messages only and never touches media.

#![allow(clippy::module_name_repetitions)]
#![forbid(non_ascii_idents, unsafe_code)]

pub mod api;
pub mod conf;
pub mod log;
pub mod signalling;
