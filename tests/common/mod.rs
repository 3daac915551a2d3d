//! Shared helpers for the integration suites.
//!
//! Not every suite uses every helper.
#![allow(dead_code)]

pub mod mocks;
