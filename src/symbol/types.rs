//! Symbol type definitions: a tagged variant over {Function, Class/Struct,
//! Enum} sharing a common header, grounded in
//! `original_source/core/parsers/symbol.py` and the Doxygen
//! `FunctionInfo`/`Symbol` split in `core/doxygen/doxygen_parser.py`.
//!
//! A tagged enum replaces the source's class-hierarchy dispatch: the
//! parser emits a discriminated value and consumers pattern-match instead
//! of calling virtual methods.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Stable opaque id assigned by the underlying parser. Not guaranteed
/// stable across independent parser runs (see `SymbolTable` merge rule).
pub type SymbolId = String;

/// Inclusive `[start, end]` line span of a symbol's definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
}

impl LineSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Fields common to every symbol kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolHeader {
    pub id: SymbolId,
    pub simple_name: String,
    pub qualified_name: String,
    pub file: PathBuf,
    pub span: LineSpan,
}

/// A function or method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSymbol {
    pub header: SymbolHeader,
    pub return_type: String,
    pub parameters: Vec<(String, String)>,
    pub member_of: Option<String>,
    #[serde(default)]
    pub calls: HashSet<SymbolId>,
    #[serde(default)]
    pub called_by: HashSet<SymbolId>,
}

/// A class or struct (`is_struct` distinguishes the two).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassSymbol {
    pub header: SymbolHeader,
    pub is_struct: bool,
}

/// An enum declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumSymbol {
    pub header: SymbolHeader,
}

/// The tagged union of program entities the symbol table indexes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Symbol {
    Function(FunctionSymbol),
    Class(ClassSymbol),
    Enum(EnumSymbol),
}

impl Symbol {
    pub fn header(&self) -> &SymbolHeader {
        match self {
            Symbol::Function(f) => &f.header,
            Symbol::Class(c) => &c.header,
            Symbol::Enum(e) => &e.header,
        }
    }

    pub fn header_mut(&mut self) -> &mut SymbolHeader {
        match self {
            Symbol::Function(f) => &mut f.header,
            Symbol::Class(c) => &mut c.header,
            Symbol::Enum(e) => &mut e.header,
        }
    }

    pub fn qualified_name(&self) -> &str {
        &self.header().qualified_name
    }

    pub fn file(&self) -> &Path {
        &self.header().file
    }

    pub fn as_function(&self) -> Option<&FunctionSymbol> {
        match self {
            Symbol::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_function_mut(&mut self) -> Option<&mut FunctionSymbol> {
        match self {
            Symbol::Function(f) => Some(f),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(name: &str) -> SymbolHeader {
        SymbolHeader {
            id: format!("id::{name}"),
            simple_name: name.to_string(),
            qualified_name: format!("ns::{name}"),
            file: PathBuf::from("src/widget.cpp"),
            span: LineSpan::new(10, 12),
        }
    }

    #[test]
    fn pattern_matching_replaces_virtual_dispatch() {
        let sym = Symbol::Function(FunctionSymbol {
            header: header("compute"),
            return_type: "int".into(),
            parameters: vec![("int".into(), "x".into())],
            member_of: None,
            calls: HashSet::new(),
            called_by: HashSet::new(),
        });

        assert_eq!(sym.qualified_name(), "ns::compute");
        assert!(sym.as_function().is_some());

        let klass = Symbol::Class(ClassSymbol {
            header: header("Widget"),
            is_struct: false,
        });
        assert!(klass.as_function().is_none());
    }
}
