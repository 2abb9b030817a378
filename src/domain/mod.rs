// Market analysis domain
pub mod market;

// Labels, datasets and classifier metrics
pub mod ml;

// Optimization domain
pub mod optimization;

// Performance tracking domain
pub mod performance;

// Port interfaces
pub mod ports;

// Bar validation
pub mod validation;

// Domain-specific error types
pub mod errors;
