//! In-memory model, parser and serializer for the flat format.

/// One `[name]` section with its ordered `key=value` entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    name: String,
    entries: Vec<(String, String)>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set `key`, keeping its position if it already exists.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(k, _)| k != key);
        self.entries.len() != before
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An ordered collection of uniquely named sections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatDocument {
    sections: Vec<Section>,
}

impl FlatDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse flat-format text.
    ///
    /// Blank lines, `;`/`#` comments, lines before the first header and lines
    /// without `=` are skipped. Values are split on the first `=`.
    pub fn parse(text: &str) -> Self {
        let mut doc = Self::new();
        let mut current: Option<usize> = None;

        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if let Some(name) = section_header(line) {
                current = Some(doc.open_section(name));
                continue;
            }

            let (Some(idx), Some((key, value))) = (current, line.split_once('=')) else {
                continue;
            };
            let key = key.trim();
            if !key.is_empty() {
                doc.sections[idx].set(key, value.trim());
            }
        }
        doc
    }

    /// Render as text: a header per section, one `key=value` per line and a
    /// blank line between sections.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push('[');
            out.push_str(&section.name);
            out.push_str("]\n");
            for (key, value) in &section.entries {
                out.push_str(key);
                out.push('=');
                out.push_str(value);
                out.push('\n');
            }
        }
        out
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn section_mut(&mut self, name: &str) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.name == name)
    }

    /// Return the named section, appending an empty one if absent.
    pub fn section_or_insert(&mut self, name: &str) -> &mut Section {
        let idx = match self.sections.iter().position(|s| s.name == name) {
            Some(idx) => idx,
            None => {
                self.sections.push(Section::new(name));
                self.sections.len() - 1
            }
        };
        &mut self.sections[idx]
    }

    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.name.as_str())
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section)?.get(key)
    }

    pub fn set(&mut self, section: &str, key: impl Into<String>, value: impl Into<String>) {
        self.section_or_insert(section).set(key, value);
    }

    pub fn remove_key(&mut self, section: &str, key: &str) -> bool {
        self.section_mut(section).is_some_and(|s| s.remove(key))
    }

    pub fn remove_section(&mut self, name: &str) -> bool {
        let before = self.sections.len();
        self.sections.retain(|s| s.name != name);
        self.sections.len() != before
    }

    /// Overlay every key of `source` onto this document.
    pub fn merge_from(&mut self, source: &FlatDocument) {
        for section in &source.sections {
            let target = self.section_or_insert(&section.name);
            for (key, value) in &section.entries {
                target.set(key.clone(), value.clone());
            }
        }
    }

    pub fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.parse_value(section, key).unwrap_or(default)
    }

    pub fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.parse_value(section, key).unwrap_or(default)
    }

    /// `true`/`false` in any letter case; anything else yields `default`.
    pub fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        match self.get(section, key) {
            Some(v) if v.eq_ignore_ascii_case("true") => true,
            Some(v) if v.eq_ignore_ascii_case("false") => false,
            _ => default,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    fn parse_value<T: std::str::FromStr>(&self, section: &str, key: &str) -> Option<T> {
        self.get(section, key)?.trim().parse().ok()
    }

    /// Open `name` for parsing, discarding any earlier section of that name.
    fn open_section(&mut self, name: &str) -> usize {
        match self.sections.iter().position(|s| s.name == name) {
            Some(idx) => {
                self.sections[idx].entries.clear();
                idx
            }
            None => {
                self.sections.push(Section::new(name));
                self.sections.len() - 1
            }
        }
    }
}

fn section_header(line: &str) -> Option<&str> {
    let name = line.strip_prefix('[')?.strip_suffix(']')?.trim();
    (!name.is_empty()).then_some(name)
}
