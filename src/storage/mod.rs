pub mod csv_sink;
pub mod measurements;

pub use csv_sink::CsvSink;
pub use measurements::{list_measurements, load_measurement, Measurement, MeasurementFile};
