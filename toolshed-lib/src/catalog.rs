use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A named group of installable packages, as listed in the flat catalog
/// file (`#Category` markers followed by one package name per line).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub tools: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub categories: Vec<Category>,
}

impl Catalog {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Cannot read tools catalog: {}", path.display()))?;
        Ok(Self::parse(&text))
    }

    /// Lines starting with `#` open a category (marker stripped, trimmed);
    /// following non-empty lines are tool names for the most recent
    /// category. Blank lines are skipped, and tool lines before the first
    /// marker are ignored.
    pub fn parse(text: &str) -> Self {
        let mut categories: Vec<Category> = Vec::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(name) = line.strip_prefix('#') {
                categories.push(Category {
                    name: name.trim().to_string(),
                    tools: Vec::new(),
                });
            } else if let Some(current) = categories.last_mut() {
                current.tools.push(line.to_string());
            }
        }

        Self { categories }
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Category> {
        self.categories.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_categories_with_their_tools() {
        let catalog = Catalog::parse("#Networking\nnmap\nwireshark\n\n#Forensics\nautopsy\n");
        assert_eq!(catalog.categories.len(), 2);
        assert_eq!(catalog.categories[0].name, "Networking");
        assert_eq!(catalog.categories[0].tools, vec!["nmap", "wireshark"]);
        assert_eq!(catalog.categories[1].name, "Forensics");
        assert_eq!(catalog.categories[1].tools, vec!["autopsy"]);
    }

    #[test]
    fn tool_lines_before_any_marker_are_ignored() {
        let catalog = Catalog::parse("stray\n#Web\nnikto\n");
        assert_eq!(catalog.categories.len(), 1);
        assert_eq!(catalog.categories[0].tools, vec!["nikto"]);
    }

    #[test]
    fn marker_whitespace_is_trimmed() {
        let catalog = Catalog::parse("#  Password Attacks  \n  hydra  \n");
        assert_eq!(catalog.categories[0].name, "Password Attacks");
        assert_eq!(catalog.categories[0].tools, vec!["hydra"]);
    }

    #[test]
    fn empty_text_parses_to_empty_catalog() {
        assert!(Catalog::parse("").is_empty());
        assert!(Catalog::parse("\n\n  \n").is_empty());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(Catalog::load(Path::new("/definitely/not/here.txt")).is_err());
    }
}
