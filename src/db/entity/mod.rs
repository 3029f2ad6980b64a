pub mod bets;
pub mod choices;
pub mod lines;
pub mod settings;
pub mod users;
