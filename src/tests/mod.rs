pub mod common;

mod request_classification;
