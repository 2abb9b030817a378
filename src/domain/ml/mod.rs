// Labels, datasets and classifier metrics
pub mod classification;
pub mod dataset;
pub mod labels;
