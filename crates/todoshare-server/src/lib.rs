pub mod adapter;
pub mod audit;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod middleware;
pub mod rest;
pub mod service;
pub mod sharing;
