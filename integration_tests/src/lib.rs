pub mod mem_storage;
pub mod sim_hardware;
