/// Frontend module - scene flattening, UI queues and asset caches

pub mod asset_source;
pub mod font;
pub mod frontend;
pub mod model_tree;
pub mod sprite;

pub use asset_source::*;
pub use font::*;
pub use frontend::*;
pub use model_tree::*;
pub use sprite::*;
