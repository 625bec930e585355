//! The assembly-equivalence oracle: the judge an atomic edit must satisfy
//! before it is accepted onto the work branch. Grounded wholesale in
//! `original_source/core/validators/asm_validator.py`.

mod canonicalize;
mod extract;

use std::collections::HashSet;

use tracing::debug;

use crate::compiler::{CompiledArtifact, OptimizationLevel};

/// Which optimization level an oracle run validates under. Acceptance
/// requires both a baseline (`O0`) and an optimized (`O3`) pass; `O1`/`O2`
/// are not part of the acceptance gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleProfile {
    O0,
    O3,
}

impl OracleProfile {
    pub fn optimization_level(&self) -> OptimizationLevel {
        match self {
            OracleProfile::O0 => OptimizationLevel::O0,
            OracleProfile::O3 => OptimizationLevel::O3,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            OracleProfile::O0 => "asm_o0",
            OracleProfile::O3 => "asm_o3",
        }
    }
}

/// Outcome of comparing two compiled artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Every original function has a matching body in the modified output,
    /// and every unmatched modified function is COMDAT.
    Equivalent,
    /// At least one original function has no match, or a non-COMDAT extra
    /// function appeared.
    Different,
    /// Neither listing's backend format could be identified, so no
    /// comparison was possible.
    Unknown,
}

/// Compares two assembly listings for semantic equivalence: exact
/// line-for-line match after identifier canonicalization, tolerating
/// extra COMDAT functions in the modified listing.
pub struct AsmOracle;

impl AsmOracle {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, original: &CompiledArtifact, modified: &CompiledArtifact) -> Verdict {
        let original_funcs = extract::extract_functions(&original.asm_text);
        let modified_funcs = extract::extract_functions(&modified.asm_text);

        if original_funcs.is_empty() && extract::detect_format(&original.asm_text) == extract::AsmFormat::Unknown {
            return Verdict::Unknown;
        }

        let modified_comdat = canonicalize::extract_comdat_function_names(&modified.asm_text);

        for (orig_name, orig_body) in &original_funcs {
            let matched = modified_funcs
                .values()
                .any(|mod_body| canonicalize::bodies_match(orig_body, mod_body));
            if !matched {
                debug!(function = %orig_name, "oracle: no matching body found in modified output");
                return Verdict::Different;
            }
        }

        let original_normalized: HashSet<Vec<String>> = original_funcs
            .values()
            .map(|body| canonicalize::normalize_body(body))
            .collect();

        for (mod_name, mod_body) in &modified_funcs {
            let normalized = canonicalize::normalize_body(mod_body);
            if !original_normalized.contains(&normalized) && !modified_comdat.contains(mod_name) {
                debug!(function = %mod_name, "oracle: extra non-COMDAT function in modified output");
                return Verdict::Different;
            }
        }

        Verdict::Equivalent
    }
}

impl Default for AsmOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn artifact(asm: &str) -> CompiledArtifact {
        CompiledArtifact {
            source_file: PathBuf::from("x.cpp"),
            asm_file: None,
            asm_text: asm.to_string(),
        }
    }

    #[test]
    fn identical_bodies_are_equivalent() {
        let asm = "foo PROC\nmov eax, 1\nret 0\nfoo ENDP\n";
        let oracle = AsmOracle::new();
        assert_eq!(
            oracle.validate(&artifact(asm), &artifact(asm)),
            Verdict::Equivalent
        );
    }

    #[test]
    fn renamed_local_labels_still_equivalent() {
        let original = "foo PROC\njmp $LN3@foo\nfoo ENDP\n";
        let modified = "foo PROC\njmp $LN9@foo\nfoo ENDP\n";
        let oracle = AsmOracle::new();
        assert_eq!(
            oracle.validate(&artifact(original), &artifact(modified)),
            Verdict::Equivalent
        );
    }

    #[test]
    fn missing_original_function_is_different() {
        let original = "foo PROC\nret 0\nfoo ENDP\nbar PROC\nret 0\nbar ENDP\n";
        let modified = "foo PROC\nret 0\nfoo ENDP\n";
        let oracle = AsmOracle::new();
        assert_eq!(
            oracle.validate(&artifact(original), &artifact(modified)),
            Verdict::Different
        );
    }

    #[test]
    fn extra_comdat_function_is_tolerated() {
        let original = "foo PROC\nret 0\nfoo ENDP\n";
        let modified = "\
; COMDAT bar
foo PROC
ret 0
foo ENDP
bar PROC
ret 0
bar ENDP
";
        let oracle = AsmOracle::new();
        assert_eq!(
            oracle.validate(&artifact(original), &artifact(modified)),
            Verdict::Equivalent
        );
    }

    #[test]
    fn extra_non_comdat_function_is_different() {
        let original = "foo PROC\nret 0\nfoo ENDP\n";
        let modified = "foo PROC\nret 0\nfoo ENDP\nbar PROC\nret 0\nbar ENDP\n";
        let oracle = AsmOracle::new();
        assert_eq!(
            oracle.validate(&artifact(original), &artifact(modified)),
            Verdict::Different
        );
    }

    #[test]
    fn unrecognized_format_is_unknown() {
        let oracle = AsmOracle::new();
        assert_eq!(
            oracle.validate(&artifact("not assembly at all"), &artifact("not assembly at all")),
            Verdict::Unknown
        );
    }
}
