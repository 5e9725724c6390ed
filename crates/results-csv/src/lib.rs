mod dedup;
mod export;

pub use dedup::*;
pub use export::*;
