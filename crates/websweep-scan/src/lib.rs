//! websweep-scan: Concurrent web-host discovery across local IPv4 prefixes.
//!
//! Expands each prefix into candidate addresses, probes every address over
//! HTTP and HTTPS with bounded parallelism, and streams reachable hosts to
//! a result sink as probes complete.

pub mod aggregator;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod enumerate;
pub mod error;
pub mod interfaces;
pub mod nmap;
pub mod nmap_xml;
pub mod probe;
pub mod sink;
