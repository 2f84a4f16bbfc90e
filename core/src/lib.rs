pub mod app;
pub mod block;
pub mod chain;
pub mod error;
pub mod mining;
pub mod projection;
pub mod validator;

pub use app::Ledger;
pub use block::{Block, TxKind};
pub use chain::Chain;
pub use error::{AppError, AppResult};
pub use mining::{mine, MiningResult, DIFFICULTY};
pub use projection::{Bet, Event};

pub use shared::{HashError, Hash256};
