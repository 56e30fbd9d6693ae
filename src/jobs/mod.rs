pub mod report_consumer;
