//! Chat message classification for optsig.
//!
//! Matches normalised chat text against an ordered list of instruction
//! shapes (Buy, Modify, Sell/Close, fixed phrases) and falls back to a
//! labelled ticker guess when a matched shape carries no ticker.

pub mod classifier;
pub mod lexicon;
pub mod normalize;
pub mod shapes;
pub mod sniff;

pub use classifier::{Classified, Classifier};
pub use lexicon::{parse_portion, parse_price_text, position_size, Portion};
pub use normalize::normalize;
pub use shapes::{Shape, ShapeFamily, ShapeMatch, SHAPES};
pub use sniff::sniff_ticker;
