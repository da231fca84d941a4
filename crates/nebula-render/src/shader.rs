//! Background shader program lifecycle.
//!
//! A [`ShaderProgram`] pairs a fixed vertex stage with a replaceable fragment
//! stage. Sources are parsed and validated on the CPU with naga before any
//! GPU object is created, so a bad fragment source can be rejected with
//! [`ShaderProgram::test`] while the running program keeps drawing.
//!
//! ```text
//! Uninitialized -> Compiled -> Linked -> Active
//!                      \          \
//!                       `----------`--> CompileError
//! (any state) -> Disposed
//! ```

use std::error::Error as _;
use std::fmt;

use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{Binding, Module};
use thiserror::Error;

use crate::uniforms::{UniformFrame, UniformTable};

/// Error types for shader compilation and program management.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShaderError {
    #[error("{stage} shader failed to parse:\n{diagnostic}")]
    Parse { stage: Stage, diagnostic: String },

    #[error("{stage} shader failed validation: {diagnostic}")]
    Validation { stage: Stage, diagnostic: String },

    #[error("{stage} shader has no `{entry_point}` entry point")]
    MissingEntryPoint {
        stage: Stage,
        entry_point: &'static str,
    },

    #[error("fragment inputs other than @builtin(position) are not supplied")]
    UnsupportedInput,

    #[error("fragment shader must write @location(0)")]
    MissingColorOutput,

    #[error("binding '{name}' is not supported; declare one uniform struct at @group(0) @binding(0)")]
    UnsupportedBinding { name: String },

    #[error("uniform '{member}' must be {expected}")]
    UniformType {
        member: &'static str,
        expected: &'static str,
    },

    #[error("program failed to link: {0}")]
    Link(String),

    #[error("shader source rejected: {0}")]
    Rejected(String),

    #[error("operation requires a {expected} program, found {found}")]
    InvalidState {
        expected: &'static str,
        found: &'static str,
    },

    #[error("program has been disposed")]
    Disposed,
}

/// Pipeline stage of a shader source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Vertex,
    Fragment,
}

impl Stage {
    /// Entry point function each stage must define.
    pub fn entry_point(self) -> &'static str {
        match self {
            Stage::Vertex => "vs_main",
            Stage::Fragment => "fs_main",
        }
    }

    fn naga_stage(self) -> naga::ShaderStage {
        match self {
            Stage::Vertex => naga::ShaderStage::Vertex,
            Stage::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Vertex => f.write_str("vertex"),
            Stage::Fragment => f.write_str("fragment"),
        }
    }
}

/// A parsed and validated shader stage.
#[derive(Debug, Clone)]
pub struct CompiledStage {
    stage: Stage,
    source: String,
    module: Module,
    uniforms: UniformTable,
}

impl CompiledStage {
    /// Parse, validate and reflect `source` as `stage`.
    pub fn compile(stage: Stage, source: &str) -> Result<Self, ShaderError> {
        let module = naga::front::wgsl::parse_str(source).map_err(|err| ShaderError::Parse {
            stage,
            diagnostic: err.emit_to_string(source),
        })?;

        Validator::new(ValidationFlags::all(), Capabilities::empty())
            .validate(&module)
            .map_err(|err| ShaderError::Validation {
                stage,
                diagnostic: error_chain(err.as_inner()),
            })?;

        let entry_point = module
            .entry_points
            .iter()
            .find(|ep| ep.name == stage.entry_point() && ep.stage == stage.naga_stage())
            .ok_or(ShaderError::MissingEntryPoint {
                stage,
                entry_point: stage.entry_point(),
            })?;

        if stage == Stage::Fragment {
            let reads_varyings = entry_point
                .function
                .arguments
                .iter()
                .any(|arg| !matches!(arg.binding, Some(Binding::BuiltIn(_))));
            if reads_varyings {
                return Err(ShaderError::UnsupportedInput);
            }
            let writes_color = entry_point.function.result.as_ref().is_some_and(|result| {
                matches!(result.binding, Some(Binding::Location { location: 0, .. }))
            });
            if !writes_color {
                return Err(ShaderError::MissingColorOutput);
            }
        }

        let uniforms = match stage {
            Stage::Fragment => UniformTable::reflect(&module)?,
            Stage::Vertex => UniformTable::default(),
        };

        Ok(Self {
            stage,
            source: source.to_owned(),
            module,
            uniforms,
        })
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn entry_point(&self) -> &'static str {
        self.stage.entry_point()
    }

    /// Uniform struct reflected from the source (empty for vertex stages).
    pub fn uniforms(&self) -> &UniformTable {
        &self.uniforms
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Trial-compile a fragment source without touching any program.
///
/// Returns `None` when the source is usable, otherwise a diagnostic.
pub fn test_fragment(source: &str) -> Option<String> {
    CompiledStage::compile(Stage::Fragment, source)
        .err()
        .map(|err| err.to_string())
}

/// Turns compiled stages into a drawable GPU program.
pub trait ProgramLinker {
    type Program;

    /// Create the program. The error string becomes the link diagnostic.
    fn link(
        &mut self,
        vertex: &CompiledStage,
        fragment: &CompiledStage,
    ) -> Result<Self::Program, String>;

    /// Allocate uniform storage of `size` bytes and bind it to the program.
    fn bind_uniforms(&mut self, program: &mut Self::Program, size: u64);

    /// Upload a full uniform buffer image.
    fn upload(&mut self, program: &Self::Program, bytes: &[u8]);

    /// Free the program and its uniform storage.
    fn release(&mut self, program: Self::Program);
}

/// Lifecycle state of a [`ShaderProgram`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramState {
    Uninitialized,
    Compiled,
    Linked,
    Active,
    CompileError { diagnostic: String },
    Disposed,
}

impl ProgramState {
    fn name(&self) -> &'static str {
        match self {
            ProgramState::Uninitialized => "uninitialized",
            ProgramState::Compiled => "compiled",
            ProgramState::Linked => "linked",
            ProgramState::Active => "active",
            ProgramState::CompileError { .. } => "failed",
            ProgramState::Disposed => "disposed",
        }
    }
}

/// A vertex + fragment program with a cached uniform table.
pub struct ShaderProgram<L: ProgramLinker> {
    linker: L,
    vertex_source: String,
    fragment_source: String,
    state: ProgramState,
    program: Option<L::Program>,
    compiled_uniforms: Option<UniformTable>,
    uniforms: Option<UniformTable>,
    staging: Vec<u8>,
}

impl<L: ProgramLinker> ShaderProgram<L> {
    pub fn new(linker: L, vertex_source: impl Into<String>, fragment_source: impl Into<String>) -> Self {
        Self {
            linker,
            vertex_source: vertex_source.into(),
            fragment_source: fragment_source.into(),
            state: ProgramState::Uninitialized,
            program: None,
            compiled_uniforms: None,
            uniforms: None,
            staging: Vec::new(),
        }
    }

    /// Trial-compile a candidate fragment source. Never changes this program.
    pub fn test(&self, source: &str) -> Option<String> {
        test_fragment(source)
    }

    /// Compile both stages and link them.
    pub fn setup(&mut self) -> Result<(), ShaderError> {
        if self.state == ProgramState::Disposed {
            return Err(ShaderError::Disposed);
        }

        let stages = CompiledStage::compile(Stage::Vertex, &self.vertex_source).and_then(|vertex| {
            CompiledStage::compile(Stage::Fragment, &self.fragment_source)
                .map(|fragment| (vertex, fragment))
        });
        let (vertex, fragment) = match stages {
            Ok(stages) => stages,
            Err(err) => return Err(self.fail(err)),
        };
        self.state = ProgramState::Compiled;

        match self.linker.link(&vertex, &fragment) {
            Ok(program) => {
                self.program = Some(program);
                self.compiled_uniforms = Some(fragment.uniforms().clone());
                self.state = ProgramState::Linked;
                log::debug!("Shader program linked");
                Ok(())
            }
            Err(diagnostic) => Err(self.fail(ShaderError::Link(diagnostic))),
        }
    }

    /// Resolve the uniform table and bind its storage. `Linked -> Active`.
    pub fn init(&mut self) -> Result<(), ShaderError> {
        if self.state != ProgramState::Linked {
            return Err(ShaderError::InvalidState {
                expected: ProgramState::Linked.name(),
                found: self.state.name(),
            });
        }
        let (Some(program), Some(table)) = (self.program.as_mut(), self.compiled_uniforms.take())
        else {
            return Err(ShaderError::InvalidState {
                expected: ProgramState::Linked.name(),
                found: self.state.name(),
            });
        };

        if !table.is_empty() {
            self.linker.bind_uniforms(program, u64::from(table.size()));
        }
        log::info!(
            "Shader program active with {} uniform(s) in {} bytes",
            table.slots().len(),
            table.size()
        );
        self.staging = vec![0; table.size() as usize];
        self.uniforms = Some(table);
        self.state = ProgramState::Active;
        Ok(())
    }

    /// Replace the fragment source and rebuild the program.
    ///
    /// The current program is released first, so callers gate this behind
    /// [`ShaderProgram::test`] (or use [`ShaderProgram::replace_if_valid`]).
    pub fn update_shader(&mut self, source: &str) -> Result<(), ShaderError> {
        if self.state == ProgramState::Disposed {
            return Err(ShaderError::Disposed);
        }
        self.reset();
        self.fragment_source = source.to_owned();
        self.setup()?;
        self.init()
    }

    /// Swap in `source` only if it passes [`ShaderProgram::test`].
    ///
    /// An active program is replaced only once the candidate has linked and
    /// its uniforms are bound; until then the current program keeps drawing.
    /// A candidate that fails to link leaves this program unchanged.
    pub fn replace_if_valid(&mut self, source: &str) -> Result<(), ShaderError> {
        if self.state == ProgramState::Disposed {
            return Err(ShaderError::Disposed);
        }
        if let Some(diagnostic) = self.test(source) {
            log::warn!("Keeping current shader, replacement rejected: {diagnostic}");
            return Err(ShaderError::Rejected(diagnostic));
        }
        if !self.is_active() {
            return self.update_shader(source);
        }

        let vertex = CompiledStage::compile(Stage::Vertex, &self.vertex_source)?;
        let fragment = CompiledStage::compile(Stage::Fragment, source)?;
        let mut candidate = match self.linker.link(&vertex, &fragment) {
            Ok(candidate) => candidate,
            Err(diagnostic) => {
                let err = ShaderError::Link(diagnostic);
                log::warn!("Keeping current shader, replacement failed to link: {err}");
                return Err(err);
            }
        };
        let table = fragment.uniforms().clone();
        if !table.is_empty() {
            self.linker.bind_uniforms(&mut candidate, u64::from(table.size()));
        }

        if let Some(previous) = self.program.replace(candidate) {
            self.linker.release(previous);
        }
        log::info!(
            "Shader program replaced with {} uniform(s) in {} bytes",
            table.slots().len(),
            table.size()
        );
        self.fragment_source = source.to_owned();
        self.staging = vec![0; table.size() as usize];
        self.uniforms = Some(table);
        Ok(())
    }

    /// Write this frame's values and upload them. Returns `false` unless active.
    pub fn write_uniforms(&mut self, frame: &UniformFrame<'_>) -> bool {
        if self.state != ProgramState::Active {
            return false;
        }
        let (Some(program), Some(table)) = (self.program.as_ref(), self.uniforms.as_ref()) else {
            return false;
        };
        if table.is_empty() {
            return true;
        }
        table.write(&mut self.staging, frame);
        self.linker.upload(program, &self.staging);
        true
    }

    /// Release the GPU program. Terminal; later calls are no-ops.
    pub fn dispose(&mut self) {
        if self.state == ProgramState::Disposed {
            return;
        }
        self.reset();
        self.state = ProgramState::Disposed;
        log::debug!("Shader program disposed");
    }

    pub fn state(&self) -> &ProgramState {
        &self.state
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == ProgramState::Active
    }

    /// The linked program, if any.
    pub fn program(&self) -> Option<&L::Program> {
        self.program.as_ref()
    }

    /// The resolved uniform table once active.
    pub fn uniform_table(&self) -> Option<&UniformTable> {
        self.uniforms.as_ref()
    }

    /// Last uploaded uniform bytes.
    pub fn uniform_bytes(&self) -> &[u8] {
        &self.staging
    }

    pub fn fragment_source(&self) -> &str {
        &self.fragment_source
    }

    pub fn linker(&self) -> &L {
        &self.linker
    }

    fn reset(&mut self) {
        if let Some(program) = self.program.take() {
            self.linker.release(program);
        }
        self.compiled_uniforms = None;
        self.uniforms = None;
        self.staging.clear();
        self.state = ProgramState::Uninitialized;
    }

    fn fail(&mut self, err: ShaderError) -> ShaderError {
        log::error!("{err}");
        self.state = ProgramState::CompileError {
            diagnostic: err.to_string(),
        };
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    const VERTEX: &str = r#"
        @vertex
        fn vs_main(@location(0) position: vec2<f32>) -> @builtin(position) vec4<f32> {
            return vec4<f32>(position, 0.0, 1.0);
        }
    "#;

    const FRAGMENT: &str = r#"
        struct Uniforms {
            resolution: vec2<f32>,
            time: f32,
            pointer_count: i32,
        }
        @group(0) @binding(0) var<uniform> u: Uniforms;

        @fragment
        fn fs_main(@builtin(position) frag: vec4<f32>) -> @location(0) vec4<f32> {
            return vec4<f32>(frag.xy / u.resolution, sin(u.time), 1.0);
        }
    "#;

    const OTHER_FRAGMENT: &str = r#"
        @fragment
        fn fs_main() -> @location(0) vec4<f32> {
            return vec4<f32>(0.2, 0.4, 0.6, 1.0);
        }
    "#;

    const BROKEN_FRAGMENT: &str = r#"
        @fragment
        fn fs_main() -> @location(0) vec4<f32> {
            return undeclared_variable;
        }
    "#;

    #[derive(Debug, Default)]
    struct RecordingLinker {
        next_id: u32,
        linked: Vec<u32>,
        released: Vec<u32>,
        bound: Vec<(u32, u64)>,
        uploads: Vec<(u32, Vec<u8>)>,
        fail_link: bool,
    }

    #[derive(Debug)]
    struct FakeProgram {
        id: u32,
    }

    impl ProgramLinker for RecordingLinker {
        type Program = FakeProgram;

        fn link(
            &mut self,
            vertex: &CompiledStage,
            fragment: &CompiledStage,
        ) -> Result<FakeProgram, String> {
            assert_eq!(vertex.entry_point(), "vs_main");
            assert_eq!(fragment.entry_point(), "fs_main");
            if self.fail_link {
                return Err("pipeline rejected".into());
            }
            self.next_id += 1;
            self.linked.push(self.next_id);
            Ok(FakeProgram { id: self.next_id })
        }

        fn bind_uniforms(&mut self, program: &mut FakeProgram, size: u64) {
            self.bound.push((program.id, size));
        }

        fn upload(&mut self, program: &FakeProgram, bytes: &[u8]) {
            self.uploads.push((program.id, bytes.to_vec()));
        }

        fn release(&mut self, program: FakeProgram) {
            self.released.push(program.id);
        }
    }

    fn active_program() -> ShaderProgram<RecordingLinker> {
        let mut program = ShaderProgram::new(RecordingLinker::default(), VERTEX, FRAGMENT);
        program.setup().unwrap();
        program.init().unwrap();
        program
    }

    fn frame(time: f32) -> UniformFrame<'static> {
        UniformFrame {
            resolution: Vec2::new(640.0, 480.0),
            time,
            ..UniformFrame::default()
        }
    }

    #[test]
    fn test_lifecycle_reaches_active() {
        let mut program = ShaderProgram::new(RecordingLinker::default(), VERTEX, FRAGMENT);
        assert_eq!(program.state(), &ProgramState::Uninitialized);
        program.setup().unwrap();
        assert_eq!(program.state(), &ProgramState::Linked);
        program.init().unwrap();
        assert!(program.is_active());
        assert_eq!(program.linker().bound, vec![(1, 16)]);
        assert_eq!(program.uniform_table().unwrap().slots().len(), 3);
    }

    #[test]
    fn test_init_requires_linked() {
        let mut program = ShaderProgram::new(RecordingLinker::default(), VERTEX, FRAGMENT);
        assert!(matches!(
            program.init(),
            Err(ShaderError::InvalidState { found: "uninitialized", .. })
        ));
    }

    #[test]
    fn test_compile_error_state_carries_diagnostic() {
        let mut program = ShaderProgram::new(RecordingLinker::default(), VERTEX, BROKEN_FRAGMENT);
        let err = program.setup().unwrap_err();
        assert!(matches!(err, ShaderError::Parse { stage: Stage::Fragment, .. }));
        match program.state() {
            ProgramState::CompileError { diagnostic } => {
                assert!(diagnostic.contains("undeclared_variable"));
            }
            other => panic!("unexpected state {other:?}"),
        }
        assert!(program.linker().linked.is_empty());
    }

    #[test]
    fn test_link_failure_is_compile_error() {
        let linker = RecordingLinker {
            fail_link: true,
            ..RecordingLinker::default()
        };
        let mut program = ShaderProgram::new(linker, VERTEX, FRAGMENT);
        assert_eq!(
            program.setup().unwrap_err(),
            ShaderError::Link("pipeline rejected".into())
        );
        assert!(matches!(program.state(), ProgramState::CompileError { .. }));
    }

    #[test]
    fn test_missing_entry_point() {
        let source = "@fragment fn main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }";
        let err = CompiledStage::compile(Stage::Fragment, source).unwrap_err();
        assert_eq!(
            err,
            ShaderError::MissingEntryPoint {
                stage: Stage::Fragment,
                entry_point: "fs_main"
            }
        );
    }

    #[test]
    fn test_entry_point_must_match_stage() {
        let err = CompiledStage::compile(Stage::Vertex, OTHER_FRAGMENT).unwrap_err();
        assert!(matches!(err, ShaderError::MissingEntryPoint { stage: Stage::Vertex, .. }));
    }

    #[test]
    fn test_fragment_varyings_rejected() {
        let source = r#"
            @fragment
            fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
                return vec4<f32>(uv, 0.0, 1.0);
            }
        "#;
        assert_eq!(
            CompiledStage::compile(Stage::Fragment, source).unwrap_err(),
            ShaderError::UnsupportedInput
        );
    }

    #[test]
    fn test_validation_error_reported() {
        let source = r#"
            @fragment
            fn fs_main() -> @location(0) vec4<f32> {
                let x: f32 = 1.0;
                return x;
            }
        "#;
        let diagnostic = test_fragment(source).unwrap();
        assert!(!diagnostic.is_empty());
    }

    #[test]
    fn test_test_accepts_valid_and_rejects_broken() {
        let program = ShaderProgram::new(RecordingLinker::default(), VERTEX, FRAGMENT);
        assert_eq!(program.test(OTHER_FRAGMENT), None);
        assert!(program.test(BROKEN_FRAGMENT).is_some());
    }

    #[test]
    fn test_failed_test_leaves_program_untouched() {
        let mut program = active_program();
        assert!(program.write_uniforms(&frame(2.0)));
        let bytes = program.uniform_bytes().to_vec();

        assert!(program.test(BROKEN_FRAGMENT).is_some());
        assert!(matches!(
            program.replace_if_valid(BROKEN_FRAGMENT),
            Err(ShaderError::Rejected(_))
        ));

        assert!(program.is_active());
        assert_eq!(program.uniform_bytes(), bytes.as_slice());
        assert_eq!(program.fragment_source(), FRAGMENT);
        assert!(program.linker().released.is_empty());
        assert_eq!(program.program().unwrap().id, 1);
    }

    #[test]
    fn test_update_shader_relinks_and_releases_old() {
        let mut program = active_program();
        program.replace_if_valid(OTHER_FRAGMENT).unwrap();
        assert!(program.is_active());
        assert_eq!(program.linker().released, vec![1]);
        assert_eq!(program.program().unwrap().id, 2);
        assert!(program.uniform_table().unwrap().is_empty());
    }

    #[test]
    fn test_link_failure_on_replace_keeps_active_program() {
        let mut program = active_program();
        assert!(program.write_uniforms(&frame(2.0)));
        let bytes = program.uniform_bytes().to_vec();

        program.linker.fail_link = true;
        assert_eq!(
            program.replace_if_valid(OTHER_FRAGMENT),
            Err(ShaderError::Link("pipeline rejected".into()))
        );

        assert!(program.is_active());
        assert_eq!(program.program().unwrap().id, 1);
        assert!(program.linker().released.is_empty());
        assert_eq!(program.fragment_source(), FRAGMENT);
        assert_eq!(program.uniform_bytes(), bytes.as_slice());
        assert!(program.write_uniforms(&frame(4.0)));
        assert_eq!(program.linker().uploads.last().unwrap().0, 1);
    }

    #[test]
    fn test_replace_links_new_program_before_releasing_old() {
        let mut program = active_program();
        program.replace_if_valid(FRAGMENT).unwrap();
        assert_eq!(program.linker().linked, vec![1, 2]);
        assert_eq!(program.linker().released, vec![1]);
        assert_eq!(program.linker().bound, vec![(1, 16), (2, 16)]);
        assert!(program.write_uniforms(&frame(1.0)));
        assert_eq!(program.linker().uploads.last().unwrap().0, 2);
    }

    #[test]
    fn test_update_shader_with_broken_source_fails() {
        let mut program = active_program();
        assert!(program.update_shader(BROKEN_FRAGMENT).is_err());
        assert!(matches!(program.state(), ProgramState::CompileError { .. }));
        assert!(!program.write_uniforms(&frame(1.0)));
    }

    #[test]
    fn test_write_uniforms_uses_cached_offsets() {
        let mut program = active_program();
        assert!(program.write_uniforms(&frame(3.0)));
        let (id, bytes) = &program.linker().uploads[0];
        assert_eq!(*id, 1);
        assert_eq!(bytes.len(), 16);
        assert_eq!(f32::from_le_bytes(bytes[8..12].try_into().unwrap()), 3.0);
    }

    #[test]
    fn test_write_uniforms_noop_unless_active() {
        let mut program = ShaderProgram::new(RecordingLinker::default(), VERTEX, FRAGMENT);
        assert!(!program.write_uniforms(&frame(1.0)));
        program.setup().unwrap();
        assert!(!program.write_uniforms(&frame(1.0)));
        assert!(program.linker().uploads.is_empty());
    }

    #[test]
    fn test_dispose_is_terminal() {
        let mut program = active_program();
        program.dispose();
        assert_eq!(program.state(), &ProgramState::Disposed);
        assert_eq!(program.linker().released, vec![1]);
        assert!(!program.write_uniforms(&frame(1.0)));
        assert_eq!(program.setup(), Err(ShaderError::Disposed));
        assert_eq!(program.update_shader(OTHER_FRAGMENT), Err(ShaderError::Disposed));

        program.dispose();
        assert_eq!(program.linker().released, vec![1]);
    }
}
