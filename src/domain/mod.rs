mod aggregation;
mod expense;
mod money;
mod plan;
mod saving;

pub use aggregation::*;
pub use expense::*;
pub use money::*;
pub use plan::*;
pub use saving::*;
