//! # OpenGL Toolpath Renderer
//!
//! Uploads a built mesh once and executes [`FramePlan`]s against it, plus
//! offscreen color picking.

use crate::visualizer::draw_planner::{DrawRange, ViewState};
use crate::visualizer::mesh_builder::MeshBuffers;
use crate::visualizer::mesh_shaders::{
    ATTRIB_COLOR, ATTRIB_NORMAL, ATTRIB_POSITION, FLAT_FRAGMENT_SHADER, FLAT_VERTEX_SHADER,
    LIT_FRAGMENT_SHADER, LIT_VERTEX_SHADER,
};
use crate::visualizer::model::{model_matrix, FramePlan, GcodeModel};
use crate::visualizer::picking;
use glam::{Mat3, Mat4, Vec3};
use glow::HasContext;
use toolview_core::{PickError, Rgba};
use toolview_settings::RenderConfig;
use tracing::{debug, warn};

/// Error type for toolpath rendering operations
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("OpenGL error: {0}")]
    OpenGLError(String),
    #[error("Shader compilation error: {0}")]
    ShaderError(String),
    #[error("Buffer creation error: {0}")]
    BufferError(String),
    /// Offscreen picking target could not be completed
    #[error("Framebuffer incomplete: status 0x{0:x}")]
    FramebufferIncomplete(u32),
    #[error(transparent)]
    Pick(#[from] PickError),
}

pub type RenderResult<T> = std::result::Result<T, RenderError>;

/// Lighting parameters for the lit movement pass
#[derive(Debug, Clone)]
pub struct LightingParams {
    /// Light direction (normalized)
    pub light_direction: Vec3,
    pub light_color: Vec3,
    pub ambient_color: Vec3,
}

impl Default for LightingParams {
    fn default() -> Self {
        Self {
            light_direction: Vec3::new(-0.3, -1.0, -0.7).normalize(),
            light_color: Vec3::new(0.8, 0.8, 0.8),
            ambient_color: Vec3::new(0.3, 0.3, 0.3),
        }
    }
}

/// Camera matrices and view state for one frame.
#[derive(Debug, Clone, Copy)]
pub struct RenderView {
    pub view: Mat4,
    pub projection: Mat4,
    pub state: ViewState,
    /// Platform offsets applied by the model matrix
    pub offsets: [f32; 3],
}

impl RenderView {
    fn mvp(&self) -> (Mat4, Mat3) {
        let model = model_matrix(self.state.mode, self.offsets);
        let model_view = Mat3::from_mat4(self.view * model);
        // Flat2D collapses Z, leaving no inverse
        let normal = if model_view.determinant().abs() > f32::EPSILON {
            model_view.inverse().transpose()
        } else {
            Mat3::IDENTITY
        };
        (self.projection * self.view * model, normal)
    }
}

/// OpenGL resources of an uploaded mesh
#[derive(Debug)]
struct MeshGLResources {
    mesh_vao: glow::VertexArray,
    pick_vao: glow::VertexArray,
    arrow_vao: glow::VertexArray,
    marker_vao: glow::VertexArray,
    vertex_arrays: Vec<glow::VertexArray>,
    buffers: Vec<glow::Buffer>,
}

/// GL objects created so far, deleted newest first on drop unless kept.
struct CreatedObjects<'a, T: Copy> {
    objects: Vec<T>,
    delete: Box<dyn FnMut(T) + 'a>,
}

impl<'a, T: Copy> CreatedObjects<'a, T> {
    fn new(delete: impl FnMut(T) + 'a) -> Self {
        Self {
            objects: Vec::new(),
            delete: Box::new(delete),
        }
    }

    fn track(&mut self, object: T) -> T {
        self.objects.push(object);
        object
    }

    /// Hand ownership to the caller; nothing is deleted.
    fn keep(mut self) -> Vec<T> {
        std::mem::take(&mut self.objects)
    }
}

impl<T: Copy> Drop for CreatedObjects<'_, T> {
    fn drop(&mut self) {
        while let Some(object) = self.objects.pop() {
            (self.delete)(object);
        }
    }
}

/// Capabilities the picking pass sets, with their value during the pass.
const PICK_CAPABILITIES: [(u32, bool); 4] = [
    (glow::BLEND, false),
    (glow::DITHER, false),
    (glow::MULTISAMPLE, false),
    (glow::DEPTH_TEST, true),
];

/// Toolpath renderer over a glow context.
pub struct GlRenderer {
    gl: glow::Context,
    lit_program: glow::Program,
    flat_program: glow::Program,
    resources: Option<MeshGLResources>,
    lighting: LightingParams,
    selection_color: Rgba,
    marker_color: Rgba,
    background_color: Rgba,
}

/// Saved pieces of GL state the picking pass changes.
struct SavedState {
    framebuffer: Option<glow::Framebuffer>,
    renderbuffer: Option<glow::Renderbuffer>,
    program: Option<glow::Program>,
    vertex_array: Option<glow::VertexArray>,
    viewport: [i32; 4],
    clear_color: [f32; 4],
    /// Enabled flag of each entry in [`PICK_CAPABILITIES`]
    capabilities: [bool; PICK_CAPABILITIES.len()],
}

impl GlRenderer {
    pub fn new(gl: glow::Context, config: &RenderConfig) -> RenderResult<Self> {
        let lit_program = Self::create_shader_program(&gl, LIT_VERTEX_SHADER, LIT_FRAGMENT_SHADER)?;
        let flat_program =
            match Self::create_shader_program(&gl, FLAT_VERTEX_SHADER, FLAT_FRAGMENT_SHADER) {
                Ok(program) => program,
                Err(e) => {
                    unsafe { gl.delete_program(lit_program) };
                    return Err(e);
                }
            };

        Ok(Self {
            gl,
            lit_program,
            flat_program,
            resources: None,
            lighting: LightingParams::default(),
            selection_color: config.selection.color,
            marker_color: config.marker_color,
            background_color: config.background_color,
        })
    }

    pub fn set_lighting(&mut self, lighting: LightingParams) {
        self.lighting = lighting;
    }

    pub fn background_color(&self) -> Rgba {
        self.background_color
    }

    /// Upload mesh data to the GPU, replacing any previous upload.
    pub fn upload(&mut self, mesh: &MeshBuffers) -> RenderResult<()> {
        self.release();

        let pick_colors =
            picking::vertex_pick_colors(mesh.movement_count(), mesh.vertices_per_movement())?;

        let gl = &self.gl;
        // dropped on an early return, deleting everything created before it
        let mut buffers = CreatedObjects::new(|buffer| unsafe { gl.delete_buffer(buffer) });
        let mut vertex_arrays = CreatedObjects::new(|vao| unsafe { gl.delete_vertex_array(vao) });

        let resources = unsafe {
            let positions = buffers.track(self.create_buffer(bytemuck::cast_slice(mesh.vertices()))?);
            let normals = buffers.track(self.create_buffer(bytemuck::cast_slice(mesh.normals()))?);
            let colors = buffers.track(self.create_buffer(bytemuck::cast_slice(mesh.colors()))?);
            let picks = buffers.track(self.create_buffer(bytemuck::cast_slice(&pick_colors))?);
            let arrow_positions =
                buffers.track(self.create_buffer(bytemuck::cast_slice(mesh.arrow_vertices()))?);
            let arrow_colors =
                buffers.track(self.create_buffer(bytemuck::cast_slice(mesh.arrow_colors()))?);
            let marker_positions = buffers.track(
                self.create_buffer(bytemuck::cast_slice(mesh.layer_marker_vertices()))?,
            );

            let mesh_vao = vertex_arrays.track(self.create_vertex_array(&[
                (ATTRIB_POSITION, 3, positions),
                (ATTRIB_NORMAL, 3, normals),
                (ATTRIB_COLOR, 4, colors),
            ])?);
            let pick_vao = vertex_arrays.track(
                self.create_vertex_array(&[(ATTRIB_POSITION, 3, positions), (ATTRIB_COLOR, 4, picks)])?,
            );
            let arrow_vao = vertex_arrays.track(self.create_vertex_array(&[
                (ATTRIB_POSITION, 3, arrow_positions),
                (ATTRIB_COLOR, 4, arrow_colors),
            ])?);
            let marker_vao = vertex_arrays
                .track(self.create_vertex_array(&[(ATTRIB_POSITION, 3, marker_positions)])?);

            MeshGLResources {
                mesh_vao,
                pick_vao,
                arrow_vao,
                marker_vao,
                vertex_arrays: vertex_arrays.keep(),
                buffers: buffers.keep(),
            }
        };
        self.resources = Some(resources);

        debug!(
            "Uploaded toolpath mesh: {} vertices, {} movements",
            mesh.vertex_count(),
            mesh.movement_count()
        );
        Ok(())
    }

    /// Draw one frame of `model`.
    pub fn draw(&self, model: &GcodeModel, view: &RenderView) -> RenderResult<()> {
        let Some(resources) = &self.resources else {
            return Ok(());
        };

        let plan = model.frame_plan(&view.state);
        if plan.is_empty() {
            return Ok(());
        }
        let (mvp, normal_matrix) = view.mvp();

        unsafe {
            self.gl.enable(glow::DEPTH_TEST);
            self.gl.enable(glow::BLEND);
            self.gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);

            self.gl.use_program(Some(self.lit_program));
            self.set_uniform_mat4(&self.lit_program, "mvp_matrix", &mvp);
            self.set_uniform_mat3(&self.lit_program, "normal_matrix", &normal_matrix);
            self.set_uniform_vec3(&self.lit_program, "light_direction", &self.lighting.light_direction);
            self.set_uniform_vec3(&self.lit_program, "light_color", &self.lighting.light_color);
            self.set_uniform_vec3(&self.lit_program, "ambient_color", &self.lighting.ambient_color);
            self.draw_ranges(resources.mesh_vao, &plan.movements)?;

            self.gl.use_program(Some(self.flat_program));
            self.set_uniform_mat4(&self.flat_program, "mvp_matrix", &mvp);
            self.draw_overlays(resources, &plan)?;

            self.gl.use_program(None);
            self.gl.disable(glow::BLEND);
        }

        Ok(())
    }

    /// Flat passes: selection highlight, arrows, markers.
    unsafe fn draw_overlays(&self, resources: &MeshGLResources, plan: &FramePlan) -> RenderResult<()> {
        if !plan.selection.is_empty() {
            self.set_override(Some(self.selection_color));
            self.gl.enable(glow::POLYGON_OFFSET_FILL);
            self.gl.polygon_offset(-1.0, -1.0);
            self.draw_ranges(resources.mesh_vao, &plan.selection)?;
            self.gl.disable(glow::POLYGON_OFFSET_FILL);
        }

        if let Some(arrows) = plan.arrows {
            self.set_override(None);
            self.draw_ranges(resources.arrow_vao, &[arrows])?;
        }

        if let Some(markers) = plan.markers {
            self.set_override(Some(self.marker_color));
            self.draw_ranges(resources.marker_vao, &[markers])?;
        }

        Ok(())
    }

    /// Source line of the movement drawn at window pixel (`x`, `y`), origin
    /// top-left, in a `width` x `height` viewport.
    ///
    /// Renders the visible movements into an offscreen framebuffer with
    /// unique flat colors and samples one pixel; the on-screen framebuffer
    /// and the GL state touched here are restored before returning.
    pub fn pick(
        &self,
        model: &GcodeModel,
        view: &RenderView,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    ) -> RenderResult<Option<u32>> {
        let Some(resources) = &self.resources else {
            return Ok(None);
        };
        if x < 0 || y < 0 || x >= width || y >= height {
            return Ok(None);
        }

        let plan = model.frame_plan(&view.state);
        let (mvp, _) = view.mvp();

        let gl = &self.gl;
        // declared before the pass so they are deleted after state is restored
        let mut framebuffers = CreatedObjects::new(|fb| unsafe { gl.delete_framebuffer(fb) });
        let mut renderbuffers = CreatedObjects::new(|rb| unsafe { gl.delete_renderbuffer(rb) });

        unsafe {
            let saved = self.save_state();

            let result = self
                .create_pick_target(&mut framebuffers, &mut renderbuffers)
                .and_then(|target| {
                    self.pick_offscreen(
                        resources,
                        &plan,
                        &mvp,
                        target,
                        (x, height - y - 1),
                        (width, height),
                    )
                });

            self.restore_state(&saved);

            let rgb = result?;
            Ok(model.pick_line(rgb))
        }
    }

    unsafe fn create_pick_target(
        &self,
        framebuffers: &mut CreatedObjects<'_, glow::Framebuffer>,
        renderbuffers: &mut CreatedObjects<'_, glow::Renderbuffer>,
    ) -> RenderResult<(glow::Framebuffer, glow::Renderbuffer, glow::Renderbuffer)> {
        let framebuffer =
            framebuffers.track(self.gl.create_framebuffer().map_err(RenderError::OpenGLError)?);
        let color =
            renderbuffers.track(self.gl.create_renderbuffer().map_err(RenderError::OpenGLError)?);
        let depth =
            renderbuffers.track(self.gl.create_renderbuffer().map_err(RenderError::OpenGLError)?);
        Ok((framebuffer, color, depth))
    }

    unsafe fn pick_offscreen(
        &self,
        resources: &MeshGLResources,
        plan: &FramePlan,
        mvp: &Mat4,
        (framebuffer, color, depth): (glow::Framebuffer, glow::Renderbuffer, glow::Renderbuffer),
        (px, py): (i32, i32),
        (width, height): (i32, i32),
    ) -> RenderResult<[u8; 3]> {
        let gl = &self.gl;

        gl.bind_renderbuffer(glow::RENDERBUFFER, Some(color));
        gl.renderbuffer_storage(glow::RENDERBUFFER, glow::RGBA8, width, height);
        gl.bind_renderbuffer(glow::RENDERBUFFER, Some(depth));
        gl.renderbuffer_storage(glow::RENDERBUFFER, glow::DEPTH_COMPONENT24, width, height);
        gl.bind_renderbuffer(glow::RENDERBUFFER, None);

        gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
        gl.framebuffer_renderbuffer(
            glow::FRAMEBUFFER,
            glow::COLOR_ATTACHMENT0,
            glow::RENDERBUFFER,
            Some(color),
        );
        gl.framebuffer_renderbuffer(
            glow::FRAMEBUFFER,
            glow::DEPTH_ATTACHMENT,
            glow::RENDERBUFFER,
            Some(depth),
        );
        let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
        if status != glow::FRAMEBUFFER_COMPLETE {
            warn!("Picking framebuffer incomplete: 0x{:x}", status);
            return Err(RenderError::FramebufferIncomplete(status));
        }

        gl.viewport(0, 0, width, height);
        for (capability, enabled) in PICK_CAPABILITIES {
            self.set_capability(capability, enabled);
        }
        gl.clear_color(0.0, 0.0, 0.0, 1.0);
        gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);

        gl.use_program(Some(self.flat_program));
        self.set_uniform_mat4(&self.flat_program, "mvp_matrix", mvp);
        self.set_override(None);
        self.draw_ranges(resources.pick_vao, &plan.movements)?;
        gl.use_program(None);

        let mut pixel = [0u8; 4];
        gl.read_pixels(
            px,
            py,
            1,
            1,
            glow::RGBA,
            glow::UNSIGNED_BYTE,
            glow::PixelPackData::Slice(&mut pixel[..]),
        );

        Ok([pixel[0], pixel[1], pixel[2]])
    }

    unsafe fn save_state(&self) -> SavedState {
        let mut viewport = [0i32; 4];
        self.gl.get_parameter_i32_slice(glow::VIEWPORT, &mut viewport);
        let mut clear_color = [0f32; 4];
        self.gl
            .get_parameter_f32_slice(glow::COLOR_CLEAR_VALUE, &mut clear_color);

        let mut capabilities = [false; PICK_CAPABILITIES.len()];
        for (enabled, (capability, _)) in capabilities.iter_mut().zip(PICK_CAPABILITIES) {
            *enabled = self.gl.is_enabled(capability);
        }

        SavedState {
            framebuffer: self.gl.get_parameter_framebuffer(glow::FRAMEBUFFER_BINDING),
            renderbuffer: self.gl.get_parameter_renderbuffer(glow::RENDERBUFFER_BINDING),
            program: self.gl.get_parameter_program(glow::CURRENT_PROGRAM),
            vertex_array: self.gl.get_parameter_vertex_array(glow::VERTEX_ARRAY_BINDING),
            viewport,
            clear_color,
            capabilities,
        }
    }

    unsafe fn restore_state(&self, saved: &SavedState) {
        self.gl.bind_framebuffer(glow::FRAMEBUFFER, saved.framebuffer);
        self.gl.bind_renderbuffer(glow::RENDERBUFFER, saved.renderbuffer);
        self.gl.use_program(saved.program);
        self.gl.bind_vertex_array(saved.vertex_array);
        let [x, y, w, h] = saved.viewport;
        self.gl.viewport(x, y, w, h);
        let [r, g, b, a] = saved.clear_color;
        self.gl.clear_color(r, g, b, a);
        for ((capability, _), enabled) in PICK_CAPABILITIES.into_iter().zip(saved.capabilities) {
            self.set_capability(capability, enabled);
        }
    }

    unsafe fn set_capability(&self, capability: u32, enabled: bool) {
        if enabled {
            self.gl.enable(capability);
        } else {
            self.gl.disable(capability);
        }
    }

    unsafe fn draw_ranges(&self, vao: glow::VertexArray, ranges: &[DrawRange]) -> RenderResult<()> {
        self.gl.bind_vertex_array(Some(vao));
        for range in ranges {
            let (first, count) = gl_range(range)?;
            self.gl.draw_arrays(glow::TRIANGLES, first, count);
        }
        self.gl.bind_vertex_array(None);
        Ok(())
    }

    unsafe fn set_override(&self, color: Option<Rgba>) {
        let program = &self.flat_program;
        self.set_uniform_bool(program, "use_override", color.is_some());
        if let Some(color) = color {
            self.set_uniform_vec4(program, "override_color", &color);
        }
    }

    unsafe fn create_buffer(&self, data: &[u8]) -> RenderResult<glow::Buffer> {
        let buffer = self.gl.create_buffer().map_err(RenderError::BufferError)?;
        self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
        self.gl
            .buffer_data_u8_slice(glow::ARRAY_BUFFER, data, glow::STATIC_DRAW);
        self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
        Ok(buffer)
    }

    /// VAO reading each `(location, components, buffer)` as tightly packed floats.
    unsafe fn create_vertex_array(
        &self,
        attributes: &[(u32, i32, glow::Buffer)],
    ) -> RenderResult<glow::VertexArray> {
        let vao = self
            .gl
            .create_vertex_array()
            .map_err(RenderError::BufferError)?;
        self.gl.bind_vertex_array(Some(vao));

        for &(location, components, buffer) in attributes {
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            self.gl
                .vertex_attrib_pointer_f32(location, components, glow::FLOAT, false, 0, 0);
            self.gl.enable_vertex_attrib_array(location);
        }

        self.gl.bind_vertex_array(None);
        self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
        Ok(vao)
    }

    fn release(&mut self) {
        if let Some(resources) = self.resources.take() {
            unsafe {
                for vao in resources.vertex_arrays {
                    self.gl.delete_vertex_array(vao);
                }
                for buffer in resources.buffers {
                    self.gl.delete_buffer(buffer);
                }
            }
        }
    }

    fn create_shader_program(
        gl: &glow::Context,
        vs_source: &str,
        fs_source: &str,
    ) -> RenderResult<glow::Program> {
        unsafe {
            let vs = gl
                .create_shader(glow::VERTEX_SHADER)
                .map_err(RenderError::ShaderError)?;
            gl.shader_source(vs, vs_source);
            gl.compile_shader(vs);

            if !gl.get_shader_compile_status(vs) {
                let info = gl.get_shader_info_log(vs);
                gl.delete_shader(vs);
                return Err(RenderError::ShaderError(format!("Vertex shader: {}", info)));
            }

            let fs = gl
                .create_shader(glow::FRAGMENT_SHADER)
                .map_err(RenderError::ShaderError)?;
            gl.shader_source(fs, fs_source);
            gl.compile_shader(fs);

            if !gl.get_shader_compile_status(fs) {
                let info = gl.get_shader_info_log(fs);
                gl.delete_shader(vs);
                gl.delete_shader(fs);
                return Err(RenderError::ShaderError(format!("Fragment shader: {}", info)));
            }

            let program = gl.create_program().map_err(RenderError::ShaderError)?;
            gl.attach_shader(program, vs);
            gl.attach_shader(program, fs);
            gl.link_program(program);

            if !gl.get_program_link_status(program) {
                let info = gl.get_program_info_log(program);
                gl.delete_shader(vs);
                gl.delete_shader(fs);
                gl.delete_program(program);
                return Err(RenderError::ShaderError(format!("Program linking: {}", info)));
            }

            gl.delete_shader(vs);
            gl.delete_shader(fs);

            Ok(program)
        }
    }

    unsafe fn set_uniform_mat4(&self, program: &glow::Program, name: &str, matrix: &Mat4) {
        if let Some(loc) = self.gl.get_uniform_location(*program, name) {
            self.gl
                .uniform_matrix_4_f32_slice(Some(&loc), false, &matrix.to_cols_array());
        }
    }

    unsafe fn set_uniform_mat3(&self, program: &glow::Program, name: &str, matrix: &Mat3) {
        if let Some(loc) = self.gl.get_uniform_location(*program, name) {
            self.gl
                .uniform_matrix_3_f32_slice(Some(&loc), false, &matrix.to_cols_array());
        }
    }

    unsafe fn set_uniform_vec3(&self, program: &glow::Program, name: &str, vec: &Vec3) {
        if let Some(loc) = self.gl.get_uniform_location(*program, name) {
            self.gl.uniform_3_f32(Some(&loc), vec.x, vec.y, vec.z);
        }
    }

    unsafe fn set_uniform_vec4(&self, program: &glow::Program, name: &str, vec: &[f32; 4]) {
        if let Some(loc) = self.gl.get_uniform_location(*program, name) {
            self.gl.uniform_4_f32(Some(&loc), vec[0], vec[1], vec[2], vec[3]);
        }
    }

    unsafe fn set_uniform_bool(&self, program: &glow::Program, name: &str, value: bool) {
        if let Some(loc) = self.gl.get_uniform_location(*program, name) {
            self.gl.uniform_1_i32(Some(&loc), value as i32);
        }
    }
}

impl Drop for GlRenderer {
    fn drop(&mut self) {
        self.release();

        unsafe {
            self.gl.delete_program(self.lit_program);
            self.gl.delete_program(self.flat_program);
        }
    }
}

/// `(first, count)` for `glDrawArrays`.
fn gl_range(range: &DrawRange) -> RenderResult<(i32, i32)> {
    let convert = |value: usize| {
        i32::try_from(value)
            .map_err(|_| RenderError::BufferError(format!("Vertex offset {} exceeds GLint", value)))
    };
    Ok((convert(range.start)?, convert(range.count)?))
}
