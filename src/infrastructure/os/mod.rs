pub mod command_runner;
pub mod network;
pub mod run_lock;
pub mod sysinfo_collector;
