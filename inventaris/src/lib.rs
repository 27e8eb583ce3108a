//! Inventaris library
//!
//! Item registry, loan tracking and monthly reporting. The binary is a thin
//! CLI over these modules; tests drive them directly.

pub mod app;
pub mod clock;
pub mod commands;
pub mod config;
pub mod controller;
pub mod database;
pub mod error;
pub mod export;
pub mod gateway;
pub mod qr;
pub mod services;
pub mod sink;
pub mod storage;
