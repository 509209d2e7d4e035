pub mod outbound;

pub use outbound::UserRepository;
