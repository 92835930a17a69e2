use std::collections::BTreeMap;

/// Name-keyed collection of factories.
///
/// Names are unique: adding under an existing name replaces the earlier
/// entry. Iteration is in name order.
pub struct Registry<F> {
    entries: BTreeMap<String, F>,
}

impl<F> Registry<F> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Register `factory` under `name`, returning the entry it replaced, if any.
    pub fn add(&mut self, name: impl Into<String>, factory: F) -> Option<F> {
        self.entries.insert(name.into(), factory)
    }

    pub fn get(&self, name: &str) -> Option<&F> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &F)> {
        self.entries.iter().map(|(name, f)| (name.as_str(), f))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<F> Default for Registry<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> std::fmt::Debug for Registry<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}

impl<'a, F> IntoIterator for &'a Registry<F> {
    type Item = (&'a str, &'a F);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a F)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
