// Performance tracking domain
pub mod stats;
pub mod window_result;
