use std::collections::BTreeMap;
use std::sync::Arc;

use crate::gfx::{BlendMode, GraphicsApi, TextureId};
use crate::paint::Color;
use crate::resource::RenderTarget;

use super::{BatchGeometry, BatchKey, View};

/// Handle to geometry registered with a [`BatchRenderer`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct GeometryId(pub u64);

/// Counters for one [`BatchRenderer::draw`].
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct BatchStats {
    pub geometry: u32,
    pub texture_binds: u32,
    pub draw_calls: u32,
}

/// Owns live geometry and draws it, sorted, into one target.
///
/// Geometry is drawn in [`BatchKey`] order: depth, group, texture, then
/// registration order. The texture is rebound only when it changes between
/// consecutive geometries.
#[derive(Debug)]
pub struct BatchRenderer {
    geometry: BTreeMap<GeometryId, BatchGeometry>,
    next_id: u64,

    view: View,
    clear_color: Color,
    target: Option<Arc<RenderTarget>>,

    /// Reused sort buffer.
    sorted: Vec<(BatchKey, GeometryId)>,
}

impl BatchRenderer {
    pub fn new(view: View) -> Self {
        Self {
            geometry: BTreeMap::new(),
            next_id: 1,
            view,
            clear_color: Color::BLACK,
            target: None,
            sorted: Vec::new(),
        }
    }

    #[inline]
    pub fn view(&self) -> View {
        self.view
    }

    #[inline]
    pub fn view_mut(&mut self) -> &mut View {
        &mut self.view
    }

    #[inline]
    pub fn set_view(&mut self, view: View) {
        self.view = view;
    }

    #[inline]
    pub fn clear_color(&self) -> Color {
        self.clear_color
    }

    #[inline]
    pub fn set_clear_color(&mut self, color: Color) {
        self.clear_color = color;
    }

    pub fn render_target(&self) -> Option<&Arc<RenderTarget>> {
        self.target.as_ref()
    }

    /// Redirects subsequent draws into `target`; `None` restores the screen.
    ///
    /// A target bound by another renderer is refused and this renderer falls
    /// back to the screen. Returns whether the requested binding is active.
    pub fn set_render_target(&mut self, target: Option<Arc<RenderTarget>>) -> bool {
        if let Some(previous) = self.target.take() {
            previous.unbind();
        }

        let Some(target) = target else { return true };
        if !target.try_bind() {
            log::warn!("render target '{}' is already bound to another renderer", target.texture().name());
            return false;
        }
        self.target = Some(target);
        true
    }

    pub fn add(&mut self, geometry: BatchGeometry) -> GeometryId {
        let id = GeometryId(self.next_id);
        self.next_id += 1;
        self.geometry.insert(id, geometry);
        id
    }

    pub fn geometry(&self, id: GeometryId) -> Option<&BatchGeometry> {
        self.geometry.get(&id)
    }

    pub fn geometry_mut(&mut self, id: GeometryId) -> Option<&mut BatchGeometry> {
        self.geometry.get_mut(&id)
    }

    pub fn remove(&mut self, id: GeometryId) -> Option<BatchGeometry> {
        self.geometry.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.geometry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.is_empty()
    }

    pub fn clear(&mut self) {
        self.geometry.clear();
    }

    /// Draws every enabled geometry into the bound target (screen if none),
    /// clearing it to [`clear_color`](Self::clear_color) first when `clear`.
    ///
    /// Immediate geometry collected by this pass is removed afterwards.
    pub fn draw(&mut self, gpu: &mut dyn GraphicsApi, clear: bool) -> BatchStats {
        let mut stats = BatchStats::default();

        let (framebuffer, extent, own_texture) = match &self.target {
            Some(target) => {
                if !target.is_valid() {
                    log::warn!("skipping draw into invalid render target '{}'", target.texture().name());
                    self.geometry.retain(|_, g| !(g.is_immediate() && g.is_enabled()));
                    return stats;
                }
                (Some(target.framebuffer()), target.size(), target.texture().texture_id())
            }
            None => (None, gpu.screen_extent(), TextureId::NONE),
        };

        self.sorted.clear();
        self.sorted.extend(
            self.geometry
                .iter()
                .filter(|(_, g)| g.is_enabled())
                .map(|(id, g)| (BatchKey::new(g.depth(), g.group(), g.texture_id(), id.0), *id)),
        );
        self.sorted.sort_by(|a, b| a.0.cmp(&b.0));

        gpu.begin_pass(framebuffer, self.view.projection(extent), clear.then_some(self.clear_color));
        gpu.set_blend_mode(BlendMode::Alpha);

        let mut bound: Option<TextureId> = None;
        for (key, id) in &self.sorted {
            let Some(g) = self.geometry.get(id) else { continue };

            if !own_texture.is_none() && key.texture == own_texture {
                log::warn!("geometry {} samples the target it draws into; skipped", id.0);
                continue;
            }
            if g.vertices().is_empty() {
                continue;
            }

            // Hooks get the raw API and may bind their own texture.
            if let Some(state) = g.draw_state() {
                state.begin(gpu);
                bound = None;
            }
            if bound != Some(key.texture) {
                gpu.bind_texture((!key.texture.is_none()).then_some(key.texture));
                bound = Some(key.texture);
                stats.texture_binds += 1;
            }
            gpu.draw_triangles(g.vertices());
            stats.draw_calls += 1;
            stats.geometry += 1;
            if let Some(state) = g.draw_state() {
                state.end(gpu);
                bound = None;
            }
        }

        gpu.end_pass();

        for (_, id) in &self.sorted {
            if self.geometry.get(id).is_some_and(BatchGeometry::is_immediate) {
                self.geometry.remove(id);
            }
        }

        stats
    }
}

impl Default for BatchRenderer {
    fn default() -> Self {
        Self::new(View::default())
    }
}

impl Drop for BatchRenderer {
    fn drop(&mut self) {
        if let Some(target) = self.target.take() {
            target.unbind();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{BlendDrawState, DrawState, Primitive};
    use crate::coords::{Extent, Rect};
    use crate::error::GfxError;
    use crate::gfx::{FilterMode, FramebufferId, GpuVertex, PresentStatus, Projection, SoftwareApi};
    use crate::resource::Texture;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Begin(Option<FramebufferId>, Option<Color>),
        Blend(BlendMode),
        Bind(Option<TextureId>),
        /// x of the first vertex, identifying the geometry.
        Draw(f32),
        End,
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<Call>,
    }

    impl Recorder {
        fn draws(&self) -> Vec<f32> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    Call::Draw(x) => Some(*x),
                    _ => None,
                })
                .collect()
        }
    }

    impl GraphicsApi for Recorder {
        fn create_texture(&mut self, _: Extent, _: Option<&[u8]>, _: FilterMode) -> Result<TextureId, GfxError> {
            Ok(TextureId(1))
        }
        fn upload_texture(&mut self, _: TextureId, _: &[u8]) -> Result<(), GfxError> {
            Ok(())
        }
        fn read_texture(&mut self, id: TextureId) -> Result<Vec<u8>, GfxError> {
            Err(GfxError::UnknownTexture(id))
        }
        fn delete_texture(&mut self, _: TextureId) {}
        fn create_framebuffer(&mut self, _: TextureId) -> Result<FramebufferId, GfxError> {
            Ok(FramebufferId(1))
        }
        fn delete_framebuffer(&mut self, _: FramebufferId) {}
        fn begin_pass(&mut self, target: Option<FramebufferId>, _: Projection, clear: Option<Color>) {
            self.calls.push(Call::Begin(target, clear));
        }
        fn set_blend_mode(&mut self, mode: BlendMode) {
            self.calls.push(Call::Blend(mode));
        }
        fn bind_texture(&mut self, texture: Option<TextureId>) {
            self.calls.push(Call::Bind(texture));
        }
        fn draw_triangles(&mut self, vertices: &[GpuVertex]) {
            self.calls.push(Call::Draw(vertices[0].pos[0]));
        }
        fn end_pass(&mut self) {
            self.calls.push(Call::End);
        }
        fn screen_extent(&self) -> Extent {
            Extent::new(64, 64)
        }
        fn resize_screen(&mut self, _: Extent) {}
        fn present(&mut self) -> PresentStatus {
            PresentStatus::Presented
        }
    }

    fn texture(id: u64) -> Arc<Texture> {
        Arc::new(Texture::from_parts(TextureId(id), Extent::new(4, 4), format!("t{id}"), FilterMode::Nearest))
    }

    /// Rectangle whose first vertex sits at `x`.
    fn rect_at(x: f32, depth: f32, group: i32, texture: Option<Arc<Texture>>) -> BatchGeometry {
        let mut g = BatchGeometry::new(Primitive::Rectangle(Rect::new(x, 0.0, 1.0, 1.0)));
        g.set_depth(depth);
        g.set_group(group);
        g.set_texture(texture);
        g.update();
        g
    }

    #[test]
    fn lower_depth_is_drawn_first() {
        let mut r = BatchRenderer::default();
        r.add(rect_at(1.0, 5.0, 0, None));
        r.add(rect_at(2.0, -1.0, 0, None));
        r.add(rect_at(3.0, 0.0, 0, None));

        let mut gpu = Recorder::default();
        r.draw(&mut gpu, false);
        assert_eq!(gpu.draws(), vec![2.0, 3.0, 1.0]);
    }

    #[test]
    fn equal_depth_orders_by_group_then_texture() {
        let (t1, t2) = (texture(1), texture(2));
        let mut r = BatchRenderer::default();
        r.add(rect_at(1.0, 0.0, 1, Some(t1.clone())));
        r.add(rect_at(2.0, 0.0, 0, Some(t2.clone())));
        r.add(rect_at(3.0, 0.0, 0, Some(t1.clone())));
        r.add(rect_at(4.0, 0.0, 0, Some(t2.clone())));

        let mut gpu = Recorder::default();
        let stats = r.draw(&mut gpu, false);
        assert_eq!(gpu.draws(), vec![3.0, 2.0, 4.0, 1.0]);
        assert_eq!(stats, BatchStats { geometry: 4, texture_binds: 3, draw_calls: 4 });
    }

    #[test]
    fn pass_is_cleared_with_renderer_color() {
        let mut r = BatchRenderer::default();
        r.set_clear_color(Color::BLUE);
        r.add(rect_at(0.0, 0.0, 0, None));

        let mut gpu = Recorder::default();
        r.draw(&mut gpu, true);
        assert_eq!(
            gpu.calls,
            vec![
                Call::Begin(None, Some(Color::BLUE)),
                Call::Blend(BlendMode::Alpha),
                Call::Bind(None),
                Call::Draw(0.0),
                Call::End,
            ]
        );
    }

    #[test]
    fn immediate_geometry_is_drawn_once() {
        let mut r = BatchRenderer::default();
        let kept = r.add(rect_at(1.0, 0.0, 0, None));
        let mut once = rect_at(2.0, 0.0, 0, None);
        once.set_immediate(true);
        r.add(once);

        let mut gpu = Recorder::default();
        r.draw(&mut gpu, false);
        assert_eq!(r.len(), 1);
        assert!(r.geometry(kept).is_some());

        gpu.calls.clear();
        r.draw(&mut gpu, false);
        assert_eq!(gpu.draws(), vec![1.0]);
    }

    #[test]
    fn disabled_geometry_is_skipped_and_kept() {
        let mut r = BatchRenderer::default();
        let id = r.add(rect_at(1.0, 0.0, 0, None));
        r.geometry_mut(id).unwrap().set_enabled(false);

        let mut gpu = Recorder::default();
        let stats = r.draw(&mut gpu, false);
        assert_eq!(stats.geometry, 0);
        assert!(r.geometry(id).is_some());
    }

    #[test]
    fn draw_state_wraps_its_geometry() {
        let mut r = BatchRenderer::default();
        let mut g = rect_at(1.0, 0.0, 0, None);
        g.set_draw_state(Some(Arc::new(BlendDrawState::ADDITIVE)));
        r.add(g);

        let mut gpu = Recorder::default();
        r.draw(&mut gpu, false);
        assert_eq!(
            &gpu.calls[2..6],
            &[
                Call::Blend(BlendMode::Additive),
                Call::Bind(None),
                Call::Draw(1.0),
                Call::Blend(BlendMode::Alpha),
            ]
        );
    }

    /// Binds its own texture around the geometry it wraps.
    #[derive(Debug)]
    struct OverlayState;

    impl DrawState for OverlayState {
        fn begin(&self, gpu: &mut dyn GraphicsApi) {
            gpu.bind_texture(Some(TextureId(9)));
        }

        fn end(&self, _gpu: &mut dyn GraphicsApi) {}
    }

    #[test]
    fn texture_is_rebound_after_draw_state_hooks() {
        let t1 = texture(1);
        let mut r = BatchRenderer::default();
        r.add(rect_at(1.0, 0.0, 0, Some(t1.clone())));
        let mut hooked = rect_at(2.0, 0.0, 0, Some(t1.clone()));
        hooked.set_draw_state(Some(Arc::new(OverlayState)));
        r.add(hooked);
        r.add(rect_at(3.0, 0.0, 0, Some(t1.clone())));

        let mut gpu = Recorder::default();
        r.draw(&mut gpu, false);

        // The texture bound right before each draw.
        let mut current = None;
        let mut drawn_with = Vec::new();
        for call in &gpu.calls {
            match call {
                Call::Bind(t) => current = *t,
                Call::Draw(x) => drawn_with.push((*x, current)),
                _ => {}
            }
        }
        assert_eq!(
            drawn_with,
            vec![(1.0, Some(TextureId(1))), (2.0, Some(TextureId(1))), (3.0, Some(TextureId(1)))]
        );
    }

    #[test]
    fn target_binding_is_exclusive_and_released_on_drop() {
        let mut gpu = SoftwareApi::new(Extent::new(8, 8));
        let target = Arc::new(RenderTarget::new(&mut gpu, Extent::new(4, 4), FilterMode::Nearest));

        let mut a = BatchRenderer::default();
        let mut b = BatchRenderer::default();
        assert!(a.set_render_target(Some(target.clone())));
        assert!(!b.set_render_target(Some(target.clone())));
        assert!(b.render_target().is_none());

        drop(a);
        assert!(!target.is_bound());
        assert!(b.set_render_target(Some(target.clone())));
        assert!(b.set_render_target(None));
        assert!(!target.is_bound());
    }

    #[test]
    fn geometry_sampling_own_target_is_skipped() {
        let mut gpu = SoftwareApi::new(Extent::new(8, 8));
        let target = Arc::new(RenderTarget::new(&mut gpu, Extent::new(4, 4), FilterMode::Nearest));

        let mut r = BatchRenderer::default();
        r.set_render_target(Some(target.clone()));
        r.add(rect_at(0.0, 0.0, 0, Some(target.texture().clone())));
        r.add(rect_at(1.0, 0.0, 0, None));

        let stats = r.draw(&mut gpu, true);
        assert_eq!(stats.geometry, 1);
    }

    #[test]
    fn draws_through_software_backend() {
        let mut gpu = SoftwareApi::new(Extent::new(16, 16));
        let mut r = BatchRenderer::new(View::pixels(Extent::new(16, 16)));
        r.set_clear_color(Color::BLUE);

        let mut g = BatchGeometry::new(Primitive::Rectangle(Rect::new(4.0, 4.0, 8.0, 8.0)));
        g.set_color(Color::RED);
        g.update();
        r.add(g);

        r.draw(&mut gpu, true);
        gpu.present();

        assert_eq!(gpu.screen_pixel(6, 6), Some(Color::RED));
        assert_eq!(gpu.screen_pixel(1, 1), Some(Color::BLUE));
        assert_eq!(gpu.screen_pixel(12, 12), Some(Color::BLUE));
    }
}
