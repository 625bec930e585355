//! Identifier canonicalization: rewrite mangled names, local labels, and
//! string/data labels to position-stable placeholders so two bodies that
//! differ only in the compiler's arbitrary numbering still compare equal.
//! Grounded in `asm_validator.py`'s `_normalize_body`.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

fn identifier_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\?[\w@]+Z\b)|(\$LN\d+@\w+)|(\$SG\d+)").expect("static regex is valid")
    })
}

/// Rewrite every mangled name / local label / string label in `body` to a
/// placeholder (`F0`, `L0`, `D0`, ...), consistently within this one body.
/// Counters and the identifier-to-placeholder map are local to the call —
/// the same raw identifier in two different bodies may map to different
/// placeholders, which is the point: only the per-body shape is compared.
pub fn normalize_body(body: &[String]) -> Vec<String> {
    let pattern = identifier_pattern();
    let mut local_map: HashMap<String, String> = HashMap::new();
    let mut func_counter = 0u32;
    let mut label_counter = 0u32;
    let mut data_counter = 0u32;

    body.iter()
        .map(|line| {
            let mut result = String::with_capacity(line.len());
            let mut last_end = 0;
            for m in pattern.find_iter(line) {
                result.push_str(&line[last_end..m.start()]);
                let identifier = m.as_str();
                let placeholder = local_map.entry(identifier.to_string()).or_insert_with(|| {
                    if identifier.starts_with('?') {
                        let p = format!("F{func_counter}");
                        func_counter += 1;
                        p
                    } else if identifier.starts_with("$LN") {
                        let p = format!("L{label_counter}");
                        label_counter += 1;
                        p
                    } else {
                        let p = format!("D{data_counter}");
                        data_counter += 1;
                        p
                    }
                });
                result.push_str(placeholder);
                last_end = m.end();
            }
            result.push_str(&line[last_end..]);
            result
        })
        .collect()
}

/// Two bodies are functionally equivalent iff their canonicalized forms are
/// identical line-for-line.
pub fn bodies_match(body1: &[String], body2: &[String]) -> bool {
    normalize_body(body1) == normalize_body(body2)
}

fn comdat_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*;\s*COMDAT\s+(\S+)").expect("static regex is valid"))
}

/// Names of functions marked COMDAT in a listing: inline/template
/// instantiations the linker is free to discard, so extra ones appearing
/// only in the modified output are tolerated.
pub fn extract_comdat_function_names(asm: &str) -> std::collections::HashSet<String> {
    if asm.is_empty() {
        return Default::default();
    }
    let pattern = comdat_pattern();
    asm.lines()
        .filter_map(|line| pattern.captures(line))
        .map(|c| c[1].to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mangled_names_canonicalize_consistently_within_a_body() {
        let body = vec![
            "call ?helper@@YAHXZ".to_string(),
            "mov eax, ?helper@@YAHXZ".to_string(),
        ];
        let normalized = normalize_body(&body);
        assert_eq!(normalized[0], "call F0");
        assert_eq!(normalized[1], "mov eax, F0");
    }

    #[test]
    fn local_labels_and_string_labels_get_distinct_counters() {
        let body = vec!["jmp $LN3@func".to_string(), "lea rax, $SG1234".to_string()];
        let normalized = normalize_body(&body);
        assert_eq!(normalized[0], "jmp L0");
        assert_eq!(normalized[1], "lea rax, D0");
    }

    #[test]
    fn bodies_match_ignores_renumbered_labels() {
        let a = vec!["jmp $LN3@foo".to_string(), "jmp $LN3@foo".to_string()];
        let b = vec!["jmp $LN9@bar".to_string(), "jmp $LN9@bar".to_string()];
        assert!(bodies_match(&a, &b));
    }

    #[test]
    fn bodies_match_rejects_different_shapes() {
        let a = vec!["mov eax, 1".to_string()];
        let b = vec!["mov eax, 2".to_string()];
        assert!(!bodies_match(&a, &b));
    }

    #[test]
    fn comdat_names_extracted_from_marker_comments() {
        let asm = "; COMDAT ?inline_func@@YAHXZ\nfoo PROC\n";
        let names = extract_comdat_function_names(asm);
        assert!(names.contains("?inline_func@@YAHXZ"));
    }
}
