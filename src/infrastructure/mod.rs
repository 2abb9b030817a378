pub mod csv_loader;
pub mod results_store;

pub use csv_loader::CsvPriceLoader;
pub use results_store::JsonResultsStore;
