//! Shader program compilation, linking and uniform management.
//!
//! [`ShaderProgram`] owns one linked program plus its two stages, caches the
//! uniform and attribute reflection tables at link time, and resolves
//! uniforms missed by reflection with a direct driver query on first use.
//!
//! Uniform resolution runs in one of two process-wide modes. In the default
//! lenient mode a name the program does not know resolves to `None` and
//! setters silently skip it. In strict mode the same lookup fails with
//! [`RenderError::UnknownUniform`], which catches typos in development
//! builds. See [`set_strict_mode`] and [`StrictScope`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ahash::HashMap;
use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
use lantern_test_utils::{
    ActiveAttribute, AttributeType, ProgramId, RenderDevice, ShaderStage, StageId,
    UniformLocation, UniformValue,
};
use tracing::debug;

use crate::error::{RenderError, RenderResult};

static STRICT_MODE: AtomicBool = AtomicBool::new(false);

/// Whether unknown uniform names currently fail instead of resolving to
/// `None`. Process-wide.
pub fn strict_mode() -> bool {
    STRICT_MODE.load(Ordering::Relaxed)
}

pub fn set_strict_mode(enabled: bool) {
    STRICT_MODE.store(enabled, Ordering::Relaxed);
}

/// Restores the previous strict mode when dropped.
///
/// Internal code that probes for optional uniforms scopes itself lenient so
/// a strict application does not see spurious failures.
#[must_use = "the previous mode is restored when the scope drops"]
pub struct StrictScope {
    previous: bool,
}

impl StrictScope {
    pub fn enabled() -> Self {
        let previous = strict_mode();
        set_strict_mode(true);
        Self { previous }
    }

    pub fn disabled() -> Self {
        let previous = strict_mode();
        set_strict_mode(false);
        Self { previous }
    }
}

impl Drop for StrictScope {
    fn drop(&mut self) {
        set_strict_mode(self.previous);
    }
}

/// A linked shader program with cached reflection tables.
pub struct ShaderProgram {
    device: Arc<dyn RenderDevice>,
    program: Option<ProgramId>,
    vertex_stage: Option<StageId>,
    fragment_stage: Option<StageId>,
    /// Resolved locations by name. `None` marks a name the program is known
    /// not to have, so it is only queried once.
    uniforms: HashMap<String, Option<UniformLocation>>,
    attributes: Vec<ActiveAttribute>,
}

impl ShaderProgram {
    /// Compiles both stages and links them, leaving attribute locations to
    /// the driver.
    pub fn new(
        device: Arc<dyn RenderDevice>,
        vertex_source: &str,
        fragment_source: &str,
    ) -> RenderResult<Self> {
        Self::with_attributes(device, vertex_source, fragment_source, &[])
    }

    /// Compiles both stages and links them with attribute locations assigned
    /// up front, so vertex layouts can rely on fixed slots.
    ///
    /// Failed stages are deleted before returning; a failed link deletes
    /// both stages. The driver's info log travels inside the error.
    pub fn with_attributes(
        device: Arc<dyn RenderDevice>,
        vertex_source: &str,
        fragment_source: &str,
        bindings: &[(u32, &str)],
    ) -> RenderResult<Self> {
        let vertex_stage = device
            .compile_stage(ShaderStage::Vertex, vertex_source)
            .map_err(|log| RenderError::CompileFailed {
                stage: ShaderStage::Vertex,
                log,
            })?;
        let fragment_stage = match device.compile_stage(ShaderStage::Fragment, fragment_source) {
            Ok(id) => id,
            Err(log) => {
                device.delete_stage(vertex_stage);
                return Err(RenderError::CompileFailed {
                    stage: ShaderStage::Fragment,
                    log,
                });
            }
        };
        let program = match device.link_program(&[vertex_stage, fragment_stage], bindings) {
            Ok(id) => id,
            Err(log) => {
                device.delete_stage(vertex_stage);
                device.delete_stage(fragment_stage);
                return Err(RenderError::LinkFailed { log });
            }
        };

        let mut uniforms: HashMap<String, Option<UniformLocation>> = HashMap::default();
        for uniform in device.active_uniforms(program) {
            uniforms.insert(uniform.name, Some(uniform.location));
        }
        let attributes = device.active_attributes(program);
        debug!(
            uniforms = uniforms.len(),
            attributes = attributes.len(),
            "linked shader program"
        );

        Ok(Self {
            device,
            program: Some(program),
            vertex_stage: Some(vertex_stage),
            fragment_stage: Some(fragment_stage),
            uniforms,
            attributes,
        })
    }

    /// The linked program handle, or `None` after `dispose`.
    pub fn program_id(&self) -> Option<ProgramId> {
        self.program
    }

    pub fn is_valid(&self) -> bool {
        self.program.is_some()
    }

    /// Makes this program current on the device.
    pub fn use_program(&self) -> RenderResult<()> {
        let program = self.program.ok_or(RenderError::ProgramDisposed)?;
        self.device.use_program(program);
        Ok(())
    }

    /// Resolves a uniform name to its location.
    ///
    /// Names cached at link time answer without touching the driver; other
    /// names are queried once and the answer cached, including a negative
    /// one. In strict mode a negative answer becomes
    /// [`RenderError::UnknownUniform`].
    pub fn uniform_location(&mut self, name: &str) -> RenderResult<Option<UniformLocation>> {
        let program = self.program.ok_or(RenderError::ProgramDisposed)?;
        let location = match self.uniforms.get(name).copied() {
            Some(cached) => cached,
            None => {
                let queried = self.device.uniform_location(program, name);
                self.uniforms.insert(name.to_string(), queried);
                queried
            }
        };
        if location.is_none() && strict_mode() {
            return Err(RenderError::UnknownUniform {
                name: name.to_string(),
            });
        }
        Ok(location)
    }

    /// Writes a value at a previously resolved location. A `None` location
    /// is skipped, so callers can resolve once and set unconditionally.
    pub fn set_uniform_at(&self, location: Option<UniformLocation>, value: UniformValue) {
        if let Some(location) = location {
            self.device.set_uniform(location, value);
        }
    }

    pub fn set_uniform_f(&mut self, name: &str, value: f32) -> RenderResult<()> {
        let location = self.uniform_location(name)?;
        self.set_uniform_at(location, UniformValue::Float(value));
        Ok(())
    }

    pub fn set_uniform_2f(&mut self, name: &str, x: f32, y: f32) -> RenderResult<()> {
        let location = self.uniform_location(name)?;
        self.set_uniform_at(location, UniformValue::Vec2([x, y]));
        Ok(())
    }

    pub fn set_uniform_3f(&mut self, name: &str, x: f32, y: f32, z: f32) -> RenderResult<()> {
        let location = self.uniform_location(name)?;
        self.set_uniform_at(location, UniformValue::Vec3([x, y, z]));
        Ok(())
    }

    pub fn set_uniform_4f(
        &mut self,
        name: &str,
        x: f32,
        y: f32,
        z: f32,
        w: f32,
    ) -> RenderResult<()> {
        let location = self.uniform_location(name)?;
        self.set_uniform_at(location, UniformValue::Vec4([x, y, z, w]));
        Ok(())
    }

    pub fn set_uniform_i(&mut self, name: &str, value: i32) -> RenderResult<()> {
        let location = self.uniform_location(name)?;
        self.set_uniform_at(location, UniformValue::Int(value));
        Ok(())
    }

    pub fn set_uniform_2i(&mut self, name: &str, x: i32, y: i32) -> RenderResult<()> {
        let location = self.uniform_location(name)?;
        self.set_uniform_at(location, UniformValue::IVec2([x, y]));
        Ok(())
    }

    pub fn set_uniform_3i(&mut self, name: &str, x: i32, y: i32, z: i32) -> RenderResult<()> {
        let location = self.uniform_location(name)?;
        self.set_uniform_at(location, UniformValue::IVec3([x, y, z]));
        Ok(())
    }

    pub fn set_uniform_4i(
        &mut self,
        name: &str,
        x: i32,
        y: i32,
        z: i32,
        w: i32,
    ) -> RenderResult<()> {
        let location = self.uniform_location(name)?;
        self.set_uniform_at(location, UniformValue::IVec4([x, y, z, w]));
        Ok(())
    }

    pub fn set_uniform_vec2(&mut self, name: &str, value: Vec2) -> RenderResult<()> {
        self.set_uniform_2f(name, value.x, value.y)
    }

    pub fn set_uniform_vec3(&mut self, name: &str, value: Vec3) -> RenderResult<()> {
        self.set_uniform_3f(name, value.x, value.y, value.z)
    }

    pub fn set_uniform_vec4(&mut self, name: &str, value: Vec4) -> RenderResult<()> {
        self.set_uniform_4f(name, value.x, value.y, value.z, value.w)
    }

    pub fn set_uniform_mat3(&mut self, name: &str, value: &Mat3) -> RenderResult<()> {
        let location = self.uniform_location(name)?;
        self.set_uniform_at(location, UniformValue::Mat3(value.to_cols_array()));
        Ok(())
    }

    pub fn set_uniform_mat4(&mut self, name: &str, value: &Mat4) -> RenderResult<()> {
        let location = self.uniform_location(name)?;
        self.set_uniform_at(location, UniformValue::Mat4(value.to_cols_array()));
        Ok(())
    }

    /// Whether `name` resolved to a real location, from the cache only.
    pub fn has_uniform(&self, name: &str) -> bool {
        self.uniforms
            .get(name)
            .is_some_and(|location| location.is_some())
    }

    /// Names of every uniform known to exist in the program.
    pub fn uniform_names(&self) -> Vec<&str> {
        self.uniforms
            .iter()
            .filter(|(_, location)| location.is_some())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn attributes(&self) -> &[ActiveAttribute] {
        &self.attributes
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }

    pub fn attribute_location(&self, name: &str) -> Option<u32> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.location)
    }

    pub fn attribute_type(&self, name: &str) -> Option<AttributeType> {
        self.attributes.iter().find(|a| a.name == name).map(|a| a.ty)
    }

    pub fn attribute_size(&self, name: &str) -> Option<u32> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.size)
    }

    pub fn attribute_names(&self) -> Vec<&str> {
        self.attributes.iter().map(|a| a.name.as_str()).collect()
    }

    /// Detaches and deletes both stages, then the program. Safe to call
    /// more than once; later calls do nothing.
    pub fn dispose(&mut self) {
        let Some(program) = self.program.take() else {
            return;
        };
        if let Some(stage) = self.vertex_stage.take() {
            self.device.detach_stage(program, stage);
            self.device.delete_stage(stage);
        }
        if let Some(stage) = self.fragment_stage.take() {
            self.device.detach_stage(program, stage);
            self.device.delete_stage(stage);
        }
        self.device.delete_program(program);
        debug!("disposed shader program");
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        self.dispose();
    }
}
