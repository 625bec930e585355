//! Registry of edit generators keyed by stable string id, grounded in
//! `original_source/core/mods/mod_factory.py`'s id-to-class lookup.

use std::collections::HashMap;

use crate::edits::{AddQualifierGenerator, EditGenerator, MsMacroReplacementGenerator, RemoveQualifierGenerator};
use crate::errors::{LevelupError, Result};

pub struct EditLibrary {
    generators: HashMap<&'static str, Box<dyn EditGenerator>>,
}

impl EditLibrary {
    /// The built-in generator set: qualifier add/remove for the keywords
    /// named in the component design, plus the MS-macro replacement.
    /// `change_prototype` is deliberately absent here: a `HashMap<&str, Box<dyn
    /// EditGenerator>>` can only hold generators with no per-request state,
    /// but a `PrototypeChangeGenerator` needs the caller's change worklist.
    /// `job::executor::process_one` dispatches that id directly, building
    /// the generator from the request instead of looking it up here.
    pub fn with_builtins() -> Self {
        let mut library = Self {
            generators: HashMap::new(),
        };
        library.register(Box::new(AddQualifierGenerator::new("override")));
        library.register(Box::new(AddQualifierGenerator::new("const")));
        library.register(Box::new(AddQualifierGenerator::new("noexcept")));
        library.register(Box::new(AddQualifierGenerator::new("final")));
        library.register(Box::new(AddQualifierGenerator::new("[[nodiscard]]")));
        library.register(Box::new(RemoveQualifierGenerator::new("inline")));
        library.register(Box::new(RemoveQualifierGenerator::new("static")));
        library.register(Box::new(MsMacroReplacementGenerator::new()));
        library
    }

    pub fn register(&mut self, generator: Box<dyn EditGenerator>) {
        self.generators.insert(generator.id(), generator);
    }

    pub fn get(&self, id: &str) -> Result<&dyn EditGenerator> {
        self.generators
            .get(id)
            .map(|g| g.as_ref())
            .ok_or_else(|| LevelupError::Config(format!("unknown mod_type: {id}")))
    }

    pub fn ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.generators.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for EditLibrary {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_builtins_registers_all_named_generators() {
        let library = EditLibrary::with_builtins();
        assert!(library.get("add_override").is_ok());
        assert!(library.get("remove_inline").is_ok());
        assert!(library.get("ms_macro_replacement").is_ok());
        assert!(library.get("no_such_mod").is_err());
    }

    #[test]
    fn change_prototype_is_not_in_the_registry() {
        let library = EditLibrary::with_builtins();
        assert!(library.get("change_prototype").is_err());
    }
}
