//! Core library for the vehicle valuation service.
//!
//! The interesting work lives in [`valuation`]: a deterministic pipeline that
//! normalizes marketplace listings from arbitrary sources, filters them into a
//! comparable set, resolves a base value (market median or depreciation
//! fallback), applies explainable adjustments, and scores confidence under
//! method-dependent caps. Everything else here is service plumbing around it.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod valuation;
