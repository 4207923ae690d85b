#![no_std]

// Shared logic for the analog video transcoder.
//
// This crate stays portable across MCU firmware and host tooling by avoiding the
// Rust standard library. Chip recipes, pins and storage live behind the traits
// exposed here so the reconciliation logic can run against real hardware or a
// simulated board.

pub mod bus;
pub mod chips;
pub mod controller;
pub mod cycler;
pub mod debounce;
pub mod fault;
pub mod policy;
pub mod reconciler;
pub mod settings;
pub mod telemetry;
pub mod video;
