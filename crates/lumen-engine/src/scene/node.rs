use crate::batch::{BatchRenderer, GeometryFactory};
use crate::time::FrameTime;

/// Scene object that feeds the screen batch once per frame.
///
/// `pre_render` runs after events are handled and before the batch is drawn;
/// nodes typically submit immediate geometry through the factory helpers.
pub trait SceneNode {
    fn pre_render(&mut self, factory: &GeometryFactory, renderer: &mut BatchRenderer, time: &FrameTime);
}
