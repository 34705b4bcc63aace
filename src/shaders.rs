//! WGSL sources keyed by logical name.
//!
//! Programs are assembled from a prelude plus their own source. Full-screen
//! programs get the grid helpers and the screen-quad vertex stage; voxel
//! geometry programs get the grid helpers and the batched-cube vertex stage.

use crate::error::{SculptError, SculptResult};
use std::borrow::Cow;
use std::collections::HashMap;

const BUILTIN: &[(&str, &str)] = &[
    ("grid", include_str!("shaders/grid.wgsl")),
    ("screen-quad", include_str!("shaders/screen_quad.wgsl")),
    ("voxel", include_str!("shaders/voxel.wgsl")),
    ("init", include_str!("shaders/init.wgsl")),
    ("copy", include_str!("shaders/copy.wgsl")),
    ("edit", include_str!("shaders/edit.wgsl")),
    ("sculpt", include_str!("shaders/sculpt.wgsl")),
    ("paint", include_str!("shaders/paint.wgsl")),
    ("position", include_str!("shaders/position.wgsl")),
    ("wireframe", include_str!("shaders/wireframe.wgsl")),
    ("floor", include_str!("shaders/floor.wgsl")),
    ("compose", include_str!("shaders/compose.wgsl")),
];

#[derive(Clone, Debug)]
pub struct ShaderLibrary {
    sources: HashMap<String, Cow<'static, str>>,
}

impl Default for ShaderLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ShaderLibrary {
    pub fn builtin() -> Self {
        let sources = BUILTIN
            .iter()
            .map(|(name, source)| (name.to_string(), Cow::Borrowed(*source)))
            .collect();
        Self { sources }
    }

    /// Empty library; every program must be registered by the caller.
    pub fn empty() -> Self {
        Self {
            sources: HashMap::new(),
        }
    }

    /// Register or replace a source.
    pub fn insert(&mut self, name: impl Into<String>, source: impl Into<Cow<'static, str>>) {
        let name = name.into();
        if self.sources.insert(name.clone(), source.into()).is_some() {
            log::info!("Shader \"{name}\" overridden");
        }
    }

    pub fn get(&self, name: &str) -> SculptResult<&str> {
        self.sources
            .get(name)
            .map(|source| source.as_ref())
            .ok_or_else(|| SculptError::ShaderMissing {
                name: name.to_string(),
            })
    }

    /// Full WGSL text of `program` without the parameter header.
    pub fn program_source(&self, program: &str) -> SculptResult<String> {
        let mut source = String::new();
        for part in prelude(program).iter().copied().chain(std::iter::once(program)) {
            source.push_str(self.get(part)?);
            source.push('\n');
        }
        Ok(source)
    }
}

fn prelude(program: &str) -> &'static [&'static str] {
    match program {
        "position" | "wireframe" => &["grid", "voxel"],
        "floor" => &["grid"],
        _ => &["grid", "screen-quad"],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_programs_resolve() {
        let library = ShaderLibrary::builtin();
        for program in [
            "init", "copy", "edit", "sculpt", "paint", "position", "wireframe", "floor", "compose",
        ] {
            let source = library.program_source(program).unwrap();
            assert!(source.contains("fn fs_main"), "{program} has no fragment stage");
            assert!(source.contains("fn vs_main"), "{program} has no vertex stage");
        }
    }

    /// Parse and validate every builtin program against the header its material generates.
    #[test]
    fn builtin_programs_validate_with_their_layouts() {
        use crate::data_pass::{copy_layout, edit_layout, init_layout, tool_layout};
        use crate::material::assemble_source;
        use crate::scene::{compose_layout, floor_layout, voxel_layout};

        let library = ShaderLibrary::builtin();
        let programs = [
            ("edit", edit_layout()),
            ("copy", copy_layout()),
            ("sculpt", tool_layout()),
            ("paint", tool_layout()),
            ("init", init_layout()),
            ("position", voxel_layout()),
            ("wireframe", voxel_layout()),
            ("floor", floor_layout()),
            ("compose", compose_layout()),
        ];
        for (program, layout) in programs {
            let source = assemble_source(&layout.unwrap(), &library, program).unwrap();
            let module = match naga::front::wgsl::parse_str(&source) {
                Ok(module) => module,
                Err(err) => panic!("{program} does not parse:\n{}", err.emit_to_string(&source)),
            };
            let mut validator =
                naga::valid::Validator::new(naga::valid::ValidationFlags::all(), naga::valid::Capabilities::default());
            if let Err(err) = validator.validate(&module) {
                panic!("{program} does not validate: {err:?}");
            }
        }
    }

    #[test]
    fn missing_part_is_reported_by_name() {
        let mut library = ShaderLibrary::empty();
        library.insert("grid", "");
        let err = library.program_source("copy").unwrap_err();
        assert!(matches!(err, SculptError::ShaderMissing { name } if name == "screen-quad"));
    }

    #[test]
    fn overrides_replace_builtin_text() {
        let mut library = ShaderLibrary::builtin();
        library.insert("copy", "// custom");
        assert!(library.program_source("copy").unwrap().ends_with("// custom\n"));
    }
}
