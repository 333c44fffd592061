pub mod classifier;
pub mod client;
pub mod config;
pub mod driver;
pub mod errors;
pub mod logging;
pub mod metrics;
pub mod policy;
pub mod policy_file;
pub mod probe;
pub mod recorder;
pub mod selector;
pub mod task;
pub mod utils;
pub mod wait_time;
pub mod worker;
