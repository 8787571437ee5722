pub mod convert;
pub mod rate;
pub mod setup;
pub mod tx;
pub mod ui;

pub use rate::RateCommand;
pub use tx::TxCommand;
