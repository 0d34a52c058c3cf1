use std::collections::HashMap;

const PREFIX: &str = "_:BNsk";

/// Mints blank node identifiers for one document.
///
/// Author-supplied names (`_:a`, `[_:a]`) are memoized so the same name
/// always maps to the same generated identifier within a parse.
#[derive(Debug, Default)]
pub struct BlankNodeAllocator {
    counter: u64,
    names: HashMap<String, String>,
}

impl BlankNodeAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `_:BNskN` for the next `N`, starting at 1.
    pub fn allocate(&mut self) -> String {
        self.counter += 1;
        format!("{PREFIX}{}", self.counter)
    }

    pub fn map_name(&mut self, name: &str) -> String {
        if let Some(id) = self.names.get(name) {
            return id.clone();
        }

        let id = self.allocate();
        tracing::trace!(name, %id, "mapped author blank node");
        self.names.insert(name.to_string(), id.clone());
        id
    }
}
