// src/data_input/mod.rs

pub mod data_source;
pub mod trial_data;
pub mod trial_parser;

// src/data_input/mod.rs
