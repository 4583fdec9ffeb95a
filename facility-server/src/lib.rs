//! Healthcare facility reachability search server.
//!
//! A web application that answers: "which facilities offering these
//! specialties can I reach from this address within this many minutes?"

pub mod cache;
pub mod config;
pub mod domain;
pub mod geocode;
pub mod planner;
pub mod repository;
pub mod routing;
pub mod spatial;
pub mod web;
