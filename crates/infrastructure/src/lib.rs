//! Ferrous mDNS Infrastructure Layer
pub mod dns;
