pub mod storage;

pub use storage::StorageUserRepository;
