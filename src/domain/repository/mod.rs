pub mod session_repository;

pub use session_repository::{SessionRepository, RepositoryError};

#[cfg(test)]
pub use session_repository::MockSessionRepository;
