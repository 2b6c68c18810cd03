mod record;
mod search;

pub use record::*;
pub use search::*;
