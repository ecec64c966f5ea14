//! `kefir-core`: the C11/C23 compiler middle-end pipeline — scope and
//! context resolution, AST analysis, AST→IR translation, the SSA-style
//! optimizer IR, AMD64 codegen (ABI classification, register allocation,
//! stack-frame layout), and textual assembly emission.
//!
//! The crate is a synchronous, single-threaded library with no persisted
//! state (spec §5, §6): a driver builds a [`PipelineConfig`], feeds it an
//! analyzed AST, and receives either assembly text or a [`KefirError`].

pub mod analyzer;
pub mod ast;
pub mod codegen;
pub mod emit;
pub mod error;
pub mod ir;
pub mod optimizer;
pub mod pool;
pub mod scope;

pub use error::{KefirError, KefirResult};

use codegen::FramePointerPolicy;
use emit::AsmSyntax;

/// The one fixed compilation target this core supports (spec §6): x86-64,
/// System-V ABI. Modeled after the teacher's `isa::Builder`/`Flags`
/// pattern, but with a single concrete target rather than a trait object,
/// since §1 scopes non-x86-64 targets out. `triple` is carried the same
/// way the teacher threads a `target_lexicon::Triple` through its own
/// target configuration, even though this crate only ever builds one.
#[derive(Debug, Clone)]
pub struct TargetConfig {
    pub triple: target_lexicon::Triple,
    pub syntax: AsmSyntax,
    pub frame_pointer: FramePointerPolicy,
    pub emit_debug_info: bool,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            triple: target_lexicon::Triple {
                architecture: target_lexicon::Architecture::X86_64,
                vendor: target_lexicon::Vendor::Unknown,
                operating_system: target_lexicon::OperatingSystem::Linux,
                environment: target_lexicon::Environment::Gnu,
                binary_format: target_lexicon::BinaryFormat::Elf,
            },
            syntax: AsmSyntax::AttT,
            frame_pointer: FramePointerPolicy::Auto,
            emit_debug_info: false,
        }
    }
}

/// A zero-sized stand-in for the explicit allocator handle every component
/// threads through its constructors in the original C implementation
/// (spec §5: "all components take a memory-allocator handle as their first
/// argument"). The hosted Rust port has no pluggable allocator, so this
/// exists purely for parity with that call-site shape rather than to do
/// anything at runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllocatorHandle;

/// Bundles a [`TargetConfig`] with the allocator-handle placeholder; this
/// is what a driver constructs once per compilation unit and passes down
/// through the pipeline stages.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub target: TargetConfig,
    pub allocator: AllocatorHandle,
}

impl PipelineConfig {
    pub fn new(target: TargetConfig) -> Self {
        Self { target, allocator: AllocatorHandle }
    }
}
