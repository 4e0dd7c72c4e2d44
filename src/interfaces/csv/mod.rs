pub mod event_reader;
pub mod request_writer;
