pub mod common;

mod load_tests;
mod pipeline_tests;
