pub mod acquisition;
pub mod clock;
pub mod constants;
pub mod errors;
pub mod portfolio;
pub mod prices;
pub mod store;
pub mod wallets;

pub use acquisition::*;
pub use portfolio::*;
pub use prices::*;
