//! Integration tests for the assembly-equivalence oracle against
//! hand-written listings shaped like real `cl.exe`/`clang` output, covering
//! the renamed-label and COMDAT-tolerance rules without needing an actual
//! compiler installed.

use std::path::PathBuf;

use levelup_core::compiler::CompiledArtifact;
use levelup_core::oracle::{AsmOracle, Verdict};

fn artifact(asm_text: &str) -> CompiledArtifact {
    CompiledArtifact {
        source_file: PathBuf::from("widget.cpp"),
        asm_file: None,
        asm_text: asm_text.to_string(),
    }
}

#[test]
fn msvc_listings_with_renumbered_locals_are_equivalent() {
    let original = artifact(
        r#"
?add@@YAHHH@Z PROC
        mov     eax, ecx
        add     eax, edx
        jmp     SHORT $LN3@add
$LN3@add:
        ret     0
?add@@YAHHH@Z ENDP
"#,
    );
    let modified = artifact(
        r#"
?add@@YAHHH@Z PROC
        mov     eax, ecx
        add     eax, edx
        jmp     SHORT $LN7@add
$LN7@add:
        ret     0
?add@@YAHHH@Z ENDP
"#,
    );

    let oracle = AsmOracle::new();
    assert_eq!(oracle.validate(&original, &modified), Verdict::Equivalent);
}

#[test]
fn msvc_listing_missing_a_function_is_different() {
    let original = artifact(
        r#"
?add@@YAHHH@Z PROC
        mov     eax, ecx
        add     eax, edx
        ret     0
?add@@YAHHH@Z ENDP

?sub@@YAHHH@Z PROC
        mov     eax, ecx
        sub     eax, edx
        ret     0
?sub@@YAHHH@Z ENDP
"#,
    );
    let modified = artifact(
        r#"
?add@@YAHHH@Z PROC
        mov     eax, ecx
        add     eax, edx
        ret     0
?add@@YAHHH@Z ENDP
"#,
    );

    let oracle = AsmOracle::new();
    assert_eq!(oracle.validate(&original, &modified), Verdict::Different);
}

#[test]
fn clang_listing_with_extra_comdat_helper_is_tolerated() {
    let original = artifact(
        r#"
        .text
        .globl  _Z3addii
_Z3addii:
        addl    %esi, %edi
        movl    %edi, %eax
        retq
"#,
    );
    let modified = artifact(
        r#"
        .text
        .globl  _Z3addii
_Z3addii:
        addl    %esi, %edi
        movl    %edi, %eax
        retq
        .globl  _ZN6WidgetC2Ev
; COMDAT _ZN6WidgetC2Ev
_ZN6WidgetC2Ev:
        retq
"#,
    );

    let oracle = AsmOracle::new();
    assert_eq!(oracle.validate(&original, &modified), Verdict::Equivalent);
}

#[test]
fn clang_listing_with_extra_non_comdat_function_is_different() {
    let original = artifact(
        r#"
        .text
        .globl  _Z3addii
_Z3addii:
        addl    %esi, %edi
        movl    %edi, %eax
        retq
"#,
    );
    let modified = artifact(
        r#"
        .text
        .globl  _Z3addii
_Z3addii:
        addl    %esi, %edi
        movl    %edi, %eax
        retq

        .globl  _Z3subii
_Z3subii:
        subl    %esi, %edi
        movl    %edi, %eax
        retq
"#,
    );

    let oracle = AsmOracle::new();
    assert_eq!(oracle.validate(&original, &modified), Verdict::Different);
}
