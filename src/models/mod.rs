pub mod form_data;
pub mod job;
pub mod progress;
