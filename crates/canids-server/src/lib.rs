//! HTTP/WebSocket front end for the CAN intrusion-detection prediction stream

pub mod api;
pub mod config;
pub mod ws;
