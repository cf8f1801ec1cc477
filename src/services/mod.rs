pub mod attachment_service;
pub mod events;
pub mod local_storage;
pub mod memory_storage;
pub mod owner_lifecycle;
pub mod record_store;
pub mod storage;
pub mod worker;
