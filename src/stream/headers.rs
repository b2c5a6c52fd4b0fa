use std::fmt;

/// Headers a stream contributes to its part when sent in a multipart body.
///
/// Names are normalized to `Title-Case`, so lookups ignore case. Each name
/// keeps its values in insertion order.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PartHeaders {
    entries: Vec<(String, Vec<String>)>,
}

impl PartHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a header, replacing any previous values for the name.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let name = normalize(name);
        let value = value.into();
        match self.position(&name) {
            Some(i) => self.entries[i].1 = vec![value],
            None => self.entries.push((name, vec![value])),
        }
    }

    /// Add a value to a header, keeping previous values.
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        let name = normalize(name);
        let value = value.into();
        match self.position(&name) {
            Some(i) => self.entries[i].1.push(value),
            None => self.entries.push((name, vec![value])),
        }
    }

    pub fn remove(&mut self, name: &str) {
        if let Some(i) = self.position(&normalize(name)) {
            self.entries.remove(i);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(&normalize(name)).is_some()
    }

    /// All values of a header. Empty if not set.
    pub fn get(&self, name: &str) -> &[String] {
        match self.position(&normalize(name)) {
            Some(i) => &self.entries[i].1,
            None => &[],
        }
    }

    /// All values of a header joined with `,`. Empty if not set.
    pub fn get_line(&self, name: &str) -> String {
        self.get(name).join(",")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, normalized: &str) -> Option<usize> {
        self.entries.iter().position(|(n, _)| n == normalized)
    }
}

fn normalize(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let lower = part.to_ascii_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

impl fmt::Debug for PartHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(n, v)| (n, v)))
            .finish()
    }
}
