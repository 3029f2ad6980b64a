pub mod error;
pub mod service;
pub mod storage;


pub use error::PicksError;
pub use service::{AdminUser, Leaderboard, PicksService, PicksServiceFactory};
pub use storage::{InMemoryPicksStorage, PicksStorage, PicksStorageTxn, SeaOrmPicksStorage};
