//! Ferrous mDNS Application Layer
pub mod ports;
