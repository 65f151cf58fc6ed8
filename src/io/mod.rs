mod export;
mod import;
mod receipt;

pub use export::*;
pub use import::*;
pub use receipt::*;
