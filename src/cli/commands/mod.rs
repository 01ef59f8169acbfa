mod collect;
pub mod common;
mod config;
mod export;
mod ledger;
mod status;

pub use self::collect::collect;
pub use self::config::config;
pub use self::export::export;
pub use self::ledger::ledger;
pub use self::status::status;
