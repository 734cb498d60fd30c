// Block and ledger types live in `blockchain/core`; this module only
// re-exports them so callers can write `blockchain::Ledger`.

pub mod core;
pub use self::core::*;
