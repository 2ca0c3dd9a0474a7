//! The rendering context facade.
//!
//! Wraps a `glow::Context` together with the per-context
//! [`PixelUnpackState`] and the [`ObjectRegistry`]. Object-creating and
//! object-deleting calls, `pixel_storei`, and the texture upload paths
//! go through the facade so their side effects (registration, upload
//! preprocessing) happen; everything else in the GL surface is a plain
//! pass-through via [`gl()`](RenderingContext::gl), forwarded to the
//! driver unchanged.

use std::num::NonZeroU32;

use log::{debug, trace};

use crate::error::PreprocessError;
use crate::pixel_store::{PixelUnpackState, UnpackParameter};
use crate::preprocess::preprocess_upload;
use crate::registry::{ObjectKind, ObjectRecord, ObjectRegistry};
use crate::shader::{format_shader_error, stage_name, ShaderError};

/// A WebGL-style rendering context bound to one window surface.
///
/// Driver-reported errors remain queryable state
/// ([`get_error`](RenderingContext::get_error)) and are never turned
/// into Rust errors here; the only errors this facade produces itself
/// are preprocessing and shader build failures.
pub struct RenderingContext {
    gl: glow::Context,
    registry: ObjectRegistry,
    unpack: PixelUnpackState,
}

impl RenderingContext {
    /// Wraps a loaded GL function table.
    pub fn new(gl: glow::Context) -> Self {
        Self {
            gl,
            registry: ObjectRegistry::new(),
            unpack: PixelUnpackState::new(),
        }
    }

    /// The underlying `glow` context, for the pass-through part of the
    /// call surface. Creating or deleting objects through this handle
    /// bypasses the registry; use the facade's `create_*`/`delete_*`
    /// methods for those.
    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    /// The registry of live objects.
    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    /// Current upload transform flags.
    pub fn unpack_state(&self) -> PixelUnpackState {
        self.unpack
    }

    // --- pixel-store ------------------------------------------------------

    /// `pixelStorei`: the three extended pnames flip local flags; every
    /// other pname forwards to the driver unmodified. Unknown pnames are
    /// accepted silently here even when the driver records an error for
    /// them -- that error stays readable via [`get_error`](Self::get_error).
    #[allow(unsafe_code)]
    pub fn pixel_storei(&mut self, pname: u32, value: i32) {
        use glow::HasContext;

        match UnpackParameter::from_pname(pname) {
            Some(param) => self.unpack.set(param, value != 0),
            // SAFETY: plain state call forwarded to the driver.
            None => unsafe { self.gl.pixel_store_i32(pname, value) },
        }
    }

    /// Reads one of the three extended pixel-store flags
    /// (`getParameter`-equivalent for the extended pnames).
    pub fn unpack_parameter(&self, param: UnpackParameter) -> bool {
        self.unpack.get(param)
    }

    /// The driver's own error state, forwarded as-is.
    #[allow(unsafe_code)]
    pub fn get_error(&self) -> u32 {
        use glow::HasContext;

        // SAFETY: read-only query.
        unsafe { self.gl.get_error() }
    }

    // --- object creation / deletion --------------------------------------

    /// Creates a buffer and registers its handle.
    ///
    /// # Errors
    ///
    /// Returns the driver's message if allocation fails.
    #[allow(unsafe_code)]
    pub fn create_buffer(&mut self) -> Result<glow::Buffer, String> {
        use glow::HasContext;

        // SAFETY: object creation with no preconditions.
        let buffer = unsafe { self.gl.create_buffer()? };
        self.registry.register(ObjectKind::Buffer, buffer.0.get());
        Ok(buffer)
    }

    /// Creates a framebuffer and registers its handle.
    ///
    /// # Errors
    ///
    /// Returns the driver's message if allocation fails.
    #[allow(unsafe_code)]
    pub fn create_framebuffer(&mut self) -> Result<glow::Framebuffer, String> {
        use glow::HasContext;

        // SAFETY: object creation with no preconditions.
        let framebuffer = unsafe { self.gl.create_framebuffer()? };
        self.registry
            .register(ObjectKind::Framebuffer, framebuffer.0.get());
        Ok(framebuffer)
    }

    /// Creates a renderbuffer and registers its handle.
    ///
    /// # Errors
    ///
    /// Returns the driver's message if allocation fails.
    #[allow(unsafe_code)]
    pub fn create_renderbuffer(&mut self) -> Result<glow::Renderbuffer, String> {
        use glow::HasContext;

        // SAFETY: object creation with no preconditions.
        let renderbuffer = unsafe { self.gl.create_renderbuffer()? };
        self.registry
            .register(ObjectKind::Renderbuffer, renderbuffer.0.get());
        Ok(renderbuffer)
    }

    /// Creates a texture and registers its handle.
    ///
    /// # Errors
    ///
    /// Returns the driver's message if allocation fails.
    #[allow(unsafe_code)]
    pub fn create_texture(&mut self) -> Result<glow::Texture, String> {
        use glow::HasContext;

        // SAFETY: object creation with no preconditions.
        let texture = unsafe { self.gl.create_texture()? };
        self.registry.register(ObjectKind::Texture, texture.0.get());
        Ok(texture)
    }

    /// Creates a program and registers its handle.
    ///
    /// # Errors
    ///
    /// Returns the driver's message if allocation fails.
    #[allow(unsafe_code)]
    pub fn create_program(&mut self) -> Result<glow::Program, String> {
        use glow::HasContext;

        // SAFETY: object creation with no preconditions.
        let program = unsafe { self.gl.create_program()? };
        self.registry.register(ObjectKind::Program, program.0.get());
        Ok(program)
    }

    /// Creates a shader of the given type and registers its handle.
    ///
    /// # Errors
    ///
    /// Returns the driver's message if allocation fails.
    #[allow(unsafe_code)]
    pub fn create_shader(&mut self, shader_type: u32) -> Result<glow::Shader, String> {
        use glow::HasContext;

        // SAFETY: object creation; an invalid type sets the driver's
        // error state rather than faulting.
        let shader = unsafe { self.gl.create_shader(shader_type)? };
        self.registry.register(ObjectKind::Shader, shader.0.get());
        Ok(shader)
    }

    /// Deletes a buffer and unregisters its handle.
    #[allow(unsafe_code)]
    pub fn delete_buffer(&mut self, buffer: glow::Buffer) {
        use glow::HasContext;

        self.registry.unregister(buffer.0.get());
        // SAFETY: handle came from this context.
        unsafe { self.gl.delete_buffer(buffer) };
    }

    /// Deletes a framebuffer and unregisters its handle.
    #[allow(unsafe_code)]
    pub fn delete_framebuffer(&mut self, framebuffer: glow::Framebuffer) {
        use glow::HasContext;

        self.registry.unregister(framebuffer.0.get());
        // SAFETY: handle came from this context.
        unsafe { self.gl.delete_framebuffer(framebuffer) };
    }

    /// Deletes a renderbuffer and unregisters its handle.
    #[allow(unsafe_code)]
    pub fn delete_renderbuffer(&mut self, renderbuffer: glow::Renderbuffer) {
        use glow::HasContext;

        self.registry.unregister(renderbuffer.0.get());
        // SAFETY: handle came from this context.
        unsafe { self.gl.delete_renderbuffer(renderbuffer) };
    }

    /// Deletes a texture and unregisters its handle.
    #[allow(unsafe_code)]
    pub fn delete_texture(&mut self, texture: glow::Texture) {
        use glow::HasContext;

        self.registry.unregister(texture.0.get());
        // SAFETY: handle came from this context.
        unsafe { self.gl.delete_texture(texture) };
    }

    /// Deletes a program and unregisters its handle.
    #[allow(unsafe_code)]
    pub fn delete_program(&mut self, program: glow::Program) {
        use glow::HasContext;

        self.registry.unregister(program.0.get());
        // SAFETY: handle came from this context.
        unsafe { self.gl.delete_program(program) };
    }

    /// Deletes a shader and unregisters its handle.
    #[allow(unsafe_code)]
    pub fn delete_shader(&mut self, shader: glow::Shader) {
        use glow::HasContext;

        self.registry.unregister(shader.0.get());
        // SAFETY: handle came from this context.
        unsafe { self.gl.delete_shader(shader) };
    }

    // --- texture uploads --------------------------------------------------

    /// `texImage2D` with client pixel data: preprocesses the buffer in
    /// place according to the unpack flags, then uploads. Pass `None`
    /// to allocate storage without data.
    ///
    /// # Errors
    ///
    /// A preprocessing failure aborts the call; the upload never
    /// reaches the driver and the buffer is unmodified.
    #[allow(unsafe_code)]
    #[allow(clippy::too_many_arguments)]
    pub fn tex_image_2d(
        &mut self,
        target: u32,
        level: i32,
        internal_format: i32,
        width: i32,
        height: i32,
        border: i32,
        format: u32,
        ty: u32,
        pixels: Option<&mut [u8]>,
    ) -> Result<(), PreprocessError> {
        use glow::HasContext;

        match pixels {
            Some(data) => {
                preprocess_upload(&self.unpack, data, width, height, format, ty)?;
                // SAFETY: dimensions describe at most the slice we hand
                // over; glow passes the slice length-checked pointer.
                unsafe {
                    self.gl.tex_image_2d(
                        target,
                        level,
                        internal_format,
                        width,
                        height,
                        border,
                        format,
                        ty,
                        glow::PixelUnpackData::Slice(Some(data)),
                    );
                }
            }
            None => {
                // SAFETY: storage allocation without initial data.
                unsafe {
                    self.gl.tex_image_2d(
                        target,
                        level,
                        internal_format,
                        width,
                        height,
                        border,
                        format,
                        ty,
                        glow::PixelUnpackData::Slice(None),
                    );
                }
            }
        }
        Ok(())
    }

    /// `texSubImage2D` with client pixel data; same preprocessing
    /// contract as [`tex_image_2d`](Self::tex_image_2d).
    ///
    /// # Errors
    ///
    /// A preprocessing failure aborts the call before the driver runs.
    #[allow(unsafe_code)]
    #[allow(clippy::too_many_arguments)]
    pub fn tex_sub_image_2d(
        &mut self,
        target: u32,
        level: i32,
        x_offset: i32,
        y_offset: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: &mut [u8],
    ) -> Result<(), PreprocessError> {
        use glow::HasContext;

        preprocess_upload(&self.unpack, pixels, width, height, format, ty)?;
        // SAFETY: dimensions describe at most the slice we hand over.
        unsafe {
            self.gl.tex_sub_image_2d(
                target,
                level,
                x_offset,
                y_offset,
                width,
                height,
                format,
                ty,
                glow::PixelUnpackData::Slice(Some(pixels)),
            );
        }
        Ok(())
    }

    // --- shader build -----------------------------------------------------

    /// Compiles one shader stage, registering the handle it creates.
    ///
    /// # Errors
    ///
    /// Returns [`ShaderError::CompileError`] with a numbered-source log
    /// on failure; the failed shader object is deleted and unregistered.
    #[allow(unsafe_code)]
    pub fn compile_shader(
        &mut self,
        shader_type: u32,
        source: &str,
    ) -> Result<glow::Shader, ShaderError> {
        use glow::HasContext;

        let shader = self
            .create_shader(shader_type)
            .map_err(|e| ShaderError::CompileError {
                stage: stage_name(shader_type).to_string(),
                log: e,
            })?;

        // SAFETY: shader is a live handle from create_shader.
        unsafe {
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
        }

        // SAFETY: status/info-log queries on a live handle.
        let compiled = unsafe { self.gl.get_shader_compile_status(shader) };
        if compiled {
            return Ok(shader);
        }

        let info_log = unsafe { self.gl.get_shader_info_log(shader) };
        self.delete_shader(shader);
        Err(ShaderError::CompileError {
            stage: stage_name(shader_type).to_string(),
            log: format_shader_error(source, &info_log),
        })
    }

    /// Links a vertex and fragment shader into a program, registering
    /// the program handle. The shaders are detached after linking (the
    /// program keeps its own copies) but not deleted.
    ///
    /// # Errors
    ///
    /// Returns [`ShaderError::LinkError`]; the failed program object is
    /// deleted and unregistered.
    #[allow(unsafe_code)]
    pub fn link_program(
        &mut self,
        vertex: glow::Shader,
        fragment: glow::Shader,
    ) -> Result<glow::Program, ShaderError> {
        use glow::HasContext;

        let program = self.create_program().map_err(ShaderError::LinkError)?;

        // SAFETY: all handles are live and owned by this context.
        unsafe {
            self.gl.attach_shader(program, vertex);
            self.gl.attach_shader(program, fragment);
            self.gl.link_program(program);
            self.gl.detach_shader(program, vertex);
            self.gl.detach_shader(program, fragment);
        }

        // SAFETY: status/info-log queries on a live handle.
        let linked = unsafe { self.gl.get_program_link_status(program) };
        if linked {
            return Ok(program);
        }

        let info_log = unsafe { self.gl.get_program_info_log(program) };
        self.delete_program(program);
        Err(ShaderError::LinkError(info_log))
    }

    /// Compiles both stages and links them; the intermediate shader
    /// objects are deleted once the program exists.
    ///
    /// # Errors
    ///
    /// Propagates the first compile or link failure.
    pub fn compile_program(
        &mut self,
        vertex_src: &str,
        fragment_src: &str,
    ) -> Result<glow::Program, ShaderError> {
        let vert = self.compile_shader(glow::VERTEX_SHADER, vertex_src)?;
        let frag = match self.compile_shader(glow::FRAGMENT_SHADER, fragment_src) {
            Ok(f) => f,
            Err(e) => {
                self.delete_shader(vert);
                return Err(e);
            }
        };

        let result = self.link_program(vert, frag);
        self.delete_shader(vert);
        self.delete_shader(frag);
        result
    }

    // --- pass-through wrappers used by typical hosts ----------------------

    /// `viewport` pass-through.
    #[allow(unsafe_code)]
    pub fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        use glow::HasContext;

        // SAFETY: plain state call.
        unsafe { self.gl.viewport(x, y, width, height) };
    }

    /// `clearColor` pass-through.
    #[allow(unsafe_code)]
    pub fn clear_color(&self, red: f32, green: f32, blue: f32, alpha: f32) {
        use glow::HasContext;

        // SAFETY: plain state call.
        unsafe { self.gl.clear_color(red, green, blue, alpha) };
    }

    /// `clear` pass-through.
    #[allow(unsafe_code)]
    pub fn clear(&self, mask: u32) {
        use glow::HasContext;

        // SAFETY: plain draw-state call.
        unsafe { self.gl.clear(mask) };
    }

    /// `enable` pass-through.
    #[allow(unsafe_code)]
    pub fn enable(&self, cap: u32) {
        use glow::HasContext;

        // SAFETY: plain state call.
        unsafe { self.gl.enable(cap) };
    }

    /// `disable` pass-through.
    #[allow(unsafe_code)]
    pub fn disable(&self, cap: u32) {
        use glow::HasContext;

        // SAFETY: plain state call.
        unsafe { self.gl.disable(cap) };
    }

    /// `useProgram` pass-through.
    #[allow(unsafe_code)]
    pub fn use_program(&self, program: Option<glow::Program>) {
        use glow::HasContext;

        // SAFETY: handle, if any, came from this context.
        unsafe { self.gl.use_program(program) };
    }

    /// `bindBuffer` pass-through.
    #[allow(unsafe_code)]
    pub fn bind_buffer(&self, target: u32, buffer: Option<glow::Buffer>) {
        use glow::HasContext;

        // SAFETY: handle, if any, came from this context.
        unsafe { self.gl.bind_buffer(target, buffer) };
    }

    /// `bufferData` with f32 client data (the common host case).
    #[allow(unsafe_code)]
    pub fn buffer_data_f32(&self, target: u32, data: &[f32], usage: u32) {
        use glow::HasContext;

        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_ne_bytes()).collect();
        // SAFETY: the byte slice fully owns the uploaded range.
        unsafe { self.gl.buffer_data_u8_slice(target, &bytes, usage) };
    }

    /// `vertexAttribPointer` pass-through (float attributes).
    #[allow(unsafe_code)]
    pub fn vertex_attrib_pointer(
        &self,
        index: u32,
        size: i32,
        data_type: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    ) {
        use glow::HasContext;

        // SAFETY: offsets refer into the currently bound buffer, which
        // the driver validates.
        unsafe {
            self.gl
                .vertex_attrib_pointer_f32(index, size, data_type, normalized, stride, offset)
        };
    }

    /// `enableVertexAttribArray` pass-through.
    #[allow(unsafe_code)]
    pub fn enable_vertex_attrib_array(&self, index: u32) {
        use glow::HasContext;

        // SAFETY: plain state call.
        unsafe { self.gl.enable_vertex_attrib_array(index) };
    }

    /// `getAttribLocation` pass-through.
    #[allow(unsafe_code)]
    pub fn get_attrib_location(&self, program: glow::Program, name: &str) -> Option<u32> {
        use glow::HasContext;

        // SAFETY: query on a live program handle.
        unsafe { self.gl.get_attrib_location(program, name) }
    }

    /// `getUniformLocation` pass-through.
    #[allow(unsafe_code)]
    pub fn get_uniform_location(
        &self,
        program: glow::Program,
        name: &str,
    ) -> Option<glow::UniformLocation> {
        use glow::HasContext;

        // SAFETY: query on a live program handle.
        unsafe { self.gl.get_uniform_location(program, name) }
    }

    /// `uniformMatrix4fv` pass-through.
    #[allow(unsafe_code)]
    pub fn uniform_matrix4fv(
        &self,
        location: Option<&glow::UniformLocation>,
        transpose: bool,
        value: &[f32],
    ) {
        use glow::HasContext;

        // SAFETY: location belongs to the currently used program.
        unsafe { self.gl.uniform_matrix_4_f32_slice(location, transpose, value) };
    }

    /// `drawArrays` pass-through.
    #[allow(unsafe_code)]
    pub fn draw_arrays(&self, mode: u32, first: i32, count: i32) {
        use glow::HasContext;

        // SAFETY: draw call against fully bound driver state.
        unsafe { self.gl.draw_arrays(mode, first, count) };
    }

    // --- teardown ---------------------------------------------------------

    /// Releases every object still registered, exactly once.
    ///
    /// Iterates the drained records and issues the kind-appropriate
    /// delete for each; order across objects is unspecified and driver
    /// objections are swallowed -- this is best-effort cleanup. Must
    /// run while the GL context is still alive: deleting driver objects
    /// after the context is gone is undefined in the underlying API.
    pub fn release_all(&mut self) {
        let records = self.registry.begin_teardown();
        if records.is_empty() {
            return;
        }
        debug!("releasing {} live GL objects", records.len());
        for record in records {
            trace!("releasing {} {}", record.kind.label(), record.handle);
            release_object(&self.gl, record);
        }
    }
}

/// Issues the delete call matching the record's kind. Invalid handles
/// only set the driver's error state, which is ignored here.
#[allow(unsafe_code)]
fn release_object(gl: &glow::Context, record: ObjectRecord) {
    use glow::HasContext;

    let Some(handle) = NonZeroU32::new(record.handle) else {
        return;
    };
    // SAFETY: handles were registered when the driver issued them; a
    // stale handle makes the delete a no-op on the driver side.
    unsafe {
        match record.kind {
            ObjectKind::Buffer => gl.delete_buffer(glow::NativeBuffer(handle)),
            ObjectKind::Framebuffer => gl.delete_framebuffer(glow::NativeFramebuffer(handle)),
            ObjectKind::Program => gl.delete_program(glow::NativeProgram(handle)),
            ObjectKind::Renderbuffer => gl.delete_renderbuffer(glow::NativeRenderbuffer(handle)),
            ObjectKind::Shader => gl.delete_shader(glow::NativeShader(handle)),
            ObjectKind::Texture => gl.delete_texture(glow::NativeTexture(handle)),
        }
    }
}
