//! Uniform reflection over WGSL source text.
//!
//! Programs address their uniforms by name. The name → byte-offset map is
//! built once at compile time by scanning the shader sources for the
//! `var<uniform>` block and the fields of its struct, applying the WGSL
//! uniform address-space layout rules. The map is immutable afterwards.

/// Location of one uniform within the program's uniform buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct UniformSlot {
    pub offset: u32,
    pub size: u32,
}

/// Name → slot map for one program, plus the padded block size.
#[derive(Debug, Clone, Default)]
pub struct UniformLayout {
    slots: Vec<(String, UniformSlot)>,
    size: u32,
}

impl UniformLayout {
    pub fn get(&self, name: &str) -> Option<UniformSlot> {
        self.slots
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, slot)| *slot)
    }

    /// Declared names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|(n, _)| n.as_str())
    }

    /// Buffer size for the block, padded to the 16-byte uniform alignment.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Scans WGSL source for uniform declarations.
///
/// Every struct referenced by a `var<uniform>` declaration is reflected.
/// When the same struct text appears in both the vertex and fragment source
/// (the sources are scanned concatenated), re-declared names are idempotent:
/// the last occurrence wins and the original position is kept.
pub fn reflect_uniforms(source: &str) -> UniformLayout {
    let mut layout = UniformLayout::default();

    for struct_name in uniform_struct_names(source) {
        reflect_struct(source, &struct_name, &mut layout);
    }

    layout
}

/// Names of struct types referenced by `var<uniform>` declarations,
/// in source order.
fn uniform_struct_names(source: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = source;

    while let Some(at) = rest.find("var<uniform>") {
        rest = &rest[at + "var<uniform>".len()..];
        // `var<uniform> name: Type;`
        let Some(colon) = rest.find(':') else { break };
        let after = &rest[colon + 1..];
        let ty: String = after
            .trim_start()
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        if !ty.is_empty() {
            names.push(ty);
        }
    }

    names
}

fn reflect_struct(source: &str, name: &str, layout: &mut UniformLayout) {
    let decl = format!("struct {name}");
    let mut rest = source;

    // The same struct may be declared in both stages; reflect each block.
    while let Some(at) = rest.find(&decl) {
        let after = &rest[at + decl.len()..];
        // Reject prefix matches (`struct P` inside `struct Params`).
        if after.starts_with(|c: char| c.is_alphanumeric() || c == '_') {
            rest = after;
            continue;
        }
        let Some(open) = after.find('{') else { return };
        let Some(close) = after[open..].find('}') else { return };
        reflect_fields(&after[open + 1..open + close], layout);
        rest = &after[open + close..];
    }
}

fn reflect_fields(body: &str, layout: &mut UniformLayout) {
    let mut cursor = 0u32;

    for field in body.split(',') {
        // Drop line comments, then whitespace.
        let field = match field.find("//") {
            Some(at) => &field[..at],
            None => field,
        };
        let field = field.trim();
        if field.is_empty() {
            continue;
        }

        let Some((name, ty)) = field.split_once(':') else {
            continue;
        };
        let name = name.trim();
        let ty = ty.trim();

        let Some((align, size)) = scalar_layout(ty) else {
            log::warn!("uniform field `{name}: {ty}` has an unsupported type; skipped");
            continue;
        };

        let offset = cursor.next_multiple_of(align);
        cursor = offset + size;

        let slot = UniformSlot { offset, size };
        match layout.slots.iter_mut().find(|(n, _)| n == name) {
            // Re-declaration (same struct in the other stage): last wins,
            // position is stable.
            Some(existing) => existing.1 = slot,
            None => layout.slots.push((name.to_string(), slot)),
        }
    }

    // Uniform blocks are 16-byte aligned.
    layout.size = layout.size.max(cursor.next_multiple_of(16)).max(16);
}

/// (align, size) per the WGSL uniform address-space layout.
fn scalar_layout(ty: &str) -> Option<(u32, u32)> {
    match ty {
        "f32" | "u32" | "i32" => Some((4, 4)),
        "vec2<f32>" => Some((8, 8)),
        "vec3<f32>" => Some((16, 12)),
        "vec4<f32>" => Some((16, 16)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DISTURB: &str = r#"
        struct DisturbParams {
            center: vec2<f32>,
            radius: f32,
            strength: f32,
        }
        @group(0) @binding(0) var<uniform> params: DisturbParams;
    "#;

    #[test]
    fn offsets_follow_wgsl_layout() {
        let layout = reflect_uniforms(DISTURB);
        assert_eq!(layout.get("center"), Some(UniformSlot { offset: 0, size: 8 }));
        assert_eq!(layout.get("radius"), Some(UniformSlot { offset: 8, size: 4 }));
        assert_eq!(layout.get("strength"), Some(UniformSlot { offset: 12, size: 4 }));
        assert_eq!(layout.size(), 16);
    }

    #[test]
    fn vec2_realigns_after_scalar() {
        let src = r#"
            struct P {
                scale: f32,
                offset: vec2<f32>,
            }
            var<uniform> u: P;
        "#;
        let layout = reflect_uniforms(src);
        // vec2 aligns to 8, leaving a 4-byte hole after the scalar.
        assert_eq!(layout.get("offset"), Some(UniformSlot { offset: 8, size: 8 }));
        assert_eq!(layout.size(), 16);
    }

    #[test]
    fn size_is_padded_to_uniform_alignment() {
        let src = r#"
            struct P {
                top_left: vec2<f32>,
                bottom_right: vec2<f32>,
                container_ratio: vec2<f32>,
                delta: vec2<f32>,
                perturbance: f32,
            }
            var<uniform> u: P;
        "#;
        let layout = reflect_uniforms(src);
        assert_eq!(layout.get("perturbance"), Some(UniformSlot { offset: 32, size: 4 }));
        assert_eq!(layout.size(), 48);
    }

    #[test]
    fn duplicate_declarations_are_idempotent() {
        // Vertex and fragment sources each declare the block; the scan runs
        // over their concatenation.
        let both = format!("{DISTURB}\n{DISTURB}");
        let layout = reflect_uniforms(&both);
        assert_eq!(layout.names().count(), 3);
        assert_eq!(layout.get("radius"), Some(UniformSlot { offset: 8, size: 4 }));
        // Order-stable: first declaration position is kept.
        assert_eq!(
            layout.names().collect::<Vec<_>>(),
            vec!["center", "radius", "strength"]
        );
    }

    #[test]
    fn source_without_uniforms_reflects_empty() {
        let layout = reflect_uniforms("@vertex fn vs_main() {}");
        assert!(layout.is_empty());
        assert_eq!(layout.get("anything"), None);
    }

    #[test]
    fn unrelated_structs_are_ignored() {
        let src = r#"
            struct VertexOut {
                position: vec4<f32>,
                coord: vec2<f32>,
            }
            struct P {
                delta: vec2<f32>,
            }
            var<uniform> u: P;
        "#;
        let layout = reflect_uniforms(src);
        assert!(layout.get("position").is_none());
        assert_eq!(layout.get("delta"), Some(UniformSlot { offset: 0, size: 8 }));
    }
}
