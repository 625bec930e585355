//! Keyed symbol index with by-name and by-file lookups, a dirty-set for
//! deferred re-parsing, and in-place prototype refresh after an accepted
//! prototype edit.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::errors::{LevelupError, Result};
use crate::symbol::types::Symbol;

/// A keyed collection of symbols with two indexes: by qualified name and by
/// source file.
///
/// Files touched since the last full parse accumulate in a dirty-set;
/// marking a file dirty only affects the *next* end-to-end run's decision
/// to re-parse (Doxygen is too slow to run per-edit), never the current one.
#[derive(Debug, Default)]
pub struct SymbolTable {
    by_qualified_name: HashMap<String, Symbol>,
    by_file: HashMap<PathBuf, Vec<String>>,
    dirty: HashSet<PathBuf>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the table contents wholesale with the result of a fresh parse.
    /// Does not clear the dirty-set: that's the caller's job once the
    /// re-parse it was signaling has actually happened.
    pub fn populate(&mut self, symbols: Vec<Symbol>) {
        self.by_qualified_name.clear();
        self.by_file.clear();
        for symbol in symbols {
            let qname = symbol.qualified_name().to_string();
            self.by_file
                .entry(symbol.file().to_path_buf())
                .or_default()
                .push(qname.clone());
            self.by_qualified_name.insert(qname, symbol);
        }
    }

    pub fn get(&self, qualified_name: &str) -> Option<&Symbol> {
        self.by_qualified_name.get(qualified_name)
    }

    pub fn list_in_file(&self, file: &Path) -> Vec<&Symbol> {
        self.by_file
            .get(file)
            .into_iter()
            .flatten()
            .filter_map(|qname| self.by_qualified_name.get(qname))
            .collect()
    }

    pub fn list_all(&self) -> impl Iterator<Item = &Symbol> {
        self.by_qualified_name.values()
    }

    /// Update (or insert) a symbol in place. If the symbol's qualified name
    /// changed since it was last indexed, callers must remove the old entry
    /// themselves first; this method only ever touches one key.
    pub fn update(&mut self, symbol: Symbol) {
        let qname = symbol.qualified_name().to_string();
        let file = symbol.file().to_path_buf();
        if !self
            .by_file
            .get(&file)
            .is_some_and(|names| names.contains(&qname))
        {
            self.by_file.entry(file).or_default().push(qname.clone());
        }
        self.by_qualified_name.insert(qname, symbol);
    }

    /// Mark a file as modified since the last full parse. Does not trigger
    /// an immediate re-parse.
    pub fn mark_dirty(&mut self, file: impl Into<PathBuf>) {
        self.dirty.insert(file.into());
    }

    /// Whether a full re-parse should run before the next end-to-end job.
    pub fn needs_reparse(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Clear the dirty-set after a full re-parse has actually happened.
    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
    }

    /// Re-read the prototype region of a Function symbol from disk and
    /// replace its return type/parameters in place, without re-running the
    /// parser. `read_prototype_line` returns the raw source line the
    /// symbol's span starts at.
    pub fn refresh_from_source<F>(&mut self, qualified_name: &str, read_line: F) -> Result<()>
    where
        F: FnOnce(&Path, usize) -> Result<String>,
    {
        let (file, start_line) = {
            let symbol = self.by_qualified_name.get(qualified_name).ok_or_else(|| {
                LevelupError::Internal(format!("refresh_from_source: unknown symbol {qualified_name}"))
            })?;
            (symbol.file().to_path_buf(), symbol.header().span.start)
        };
        let line = read_line(&file, start_line)?;
        let (return_type, parameters) = parse_prototype_line(&line)?;

        let symbol = self
            .by_qualified_name
            .get_mut(qualified_name)
            .and_then(Symbol::as_function_mut)
            .ok_or_else(|| {
                LevelupError::Internal(format!(
                    "refresh_from_source: {qualified_name} is not a function"
                ))
            })?;
        symbol.return_type = return_type;
        symbol.parameters = parameters;
        Ok(())
    }
}

/// Parse a simplified `ReturnType name(type name, type name) ...` prototype
/// line into `(return_type, [(type, name)])`. Good enough for the
/// single-line prototypes the edit generators produce; a prototype spanning
/// multiple lines is the caller's responsibility to join first.
fn parse_prototype_line(line: &str) -> Result<(String, Vec<(String, String)>)> {
    let open = line.find('(').ok_or_else(|| {
        LevelupError::Internal(format!("refresh_from_source: no '(' in prototype: {line}"))
    })?;
    let close = line.rfind(')').ok_or_else(|| {
        LevelupError::Internal(format!("refresh_from_source: no ')' in prototype: {line}"))
    })?;

    let before_paren = line[..open].trim();
    let name_start = before_paren
        .rfind(|c: char| c.is_whitespace() || c == '*' || c == '&')
        .map_or(0, |i| i + 1);
    let return_type = before_paren[..name_start].trim().to_string();

    let params_str = &line[open + 1..close];
    let parameters = params_str
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|param| {
            let split_at = param
                .rfind(|c: char| c.is_whitespace() || c == '*' || c == '&')
                .map_or(0, |i| i + 1);
            (
                param[..split_at].trim().to_string(),
                param[split_at..].trim().to_string(),
            )
        })
        .collect();

    Ok((return_type, parameters))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::types::{FunctionSymbol, LineSpan, SymbolHeader};
    use std::collections::HashSet;

    fn func(name: &str, file: &str) -> Symbol {
        Symbol::Function(FunctionSymbol {
            header: SymbolHeader {
                id: format!("id::{name}"),
                simple_name: name.to_string(),
                qualified_name: format!("ns::{name}"),
                file: PathBuf::from(file),
                span: LineSpan::new(1, 1),
            },
            return_type: "int".into(),
            parameters: vec![],
            member_of: None,
            calls: HashSet::new(),
            called_by: HashSet::new(),
        })
    }

    #[test]
    fn list_in_file_returns_only_that_files_symbols() {
        let mut table = SymbolTable::new();
        table.populate(vec![func("a", "x.cpp"), func("b", "x.cpp"), func("c", "y.cpp")]);

        assert_eq!(table.list_in_file(Path::new("x.cpp")).len(), 2);
        assert_eq!(table.list_in_file(Path::new("y.cpp")).len(), 1);
        assert_eq!(table.list_in_file(Path::new("z.cpp")).len(), 0);
    }

    #[test]
    fn dirty_set_does_not_force_immediate_reparse() {
        let mut table = SymbolTable::new();
        assert!(!table.needs_reparse());
        table.mark_dirty(PathBuf::from("x.cpp"));
        assert!(table.needs_reparse());
        table.clear_dirty();
        assert!(!table.needs_reparse());
    }

    #[test]
    fn refresh_from_source_updates_prototype_in_place() {
        let mut table = SymbolTable::new();
        table.populate(vec![func("add", "math.cpp")]);

        table
            .refresh_from_source("ns::add", |_file, _line| {
                Ok("long add(int a, int b)".to_string())
            })
            .unwrap();

        let updated = table.get("ns::add").unwrap().as_function().unwrap();
        assert_eq!(updated.return_type, "long");
        assert_eq!(
            updated.parameters,
            vec![("int".to_string(), "a".to_string()), ("int".to_string(), "b".to_string())]
        );
    }

    #[test]
    fn parse_prototype_line_handles_pointer_and_reference_returns() {
        let (ret, params) = parse_prototype_line("const Widget& find(int* id)").unwrap();
        assert_eq!(ret, "const Widget&");
        assert_eq!(params, vec![("int*".to_string(), "id".to_string())]);
    }
}
