//! Scene nodes feeding the batch renderer through a pre-render hook.

mod background;
mod node;

pub use background::SolidBackground;
pub use node::SceneNode;
