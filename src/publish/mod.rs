pub mod docs;
pub mod slack;

pub use docs::*;
pub use slack::*;
