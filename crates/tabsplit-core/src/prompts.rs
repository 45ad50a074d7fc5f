//! Prompt library for the structured receipt parser
//!
//! Prompts are loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/tabsplit/prompts/overrides/)
//! 2. Fall back to embedded defaults (compiled into binary)

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Embedded default prompts (compiled into binary)
mod defaults {
    pub const PARSE_RECEIPT_TEXT: &str = include_str!("../../../prompts/parse_receipt_text.md");
}

/// Known prompt IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    /// OCR text to receipt JSON
    ParseReceiptText,
}

impl PromptId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParseReceiptText => "parse_receipt_text",
        }
    }

    pub fn all() -> &'static [PromptId] {
        &[Self::ParseReceiptText]
    }

    fn default_content(&self) -> &'static str {
        match self {
            Self::ParseReceiptText => defaults::PARSE_RECEIPT_TEXT,
        }
    }
}

/// Prompt frontmatter metadata
#[derive(Debug, Clone, Deserialize)]
pub struct PromptMetadata {
    pub id: String,
    /// Bumped whenever the wording changes
    pub version: u32,
    pub task_type: String,
}

/// A loaded prompt with metadata and content
#[derive(Debug, Clone)]
pub struct Prompt {
    pub metadata: PromptMetadata,
    /// Body with `# System` and `# User` sections
    pub content: String,
    pub is_override: bool,
    pub override_path: Option<PathBuf>,
}

impl Prompt {
    pub fn system_section(&self) -> Option<&str> {
        extract_section(&self.content, "# System")
    }

    pub fn user_section(&self) -> Option<&str> {
        extract_section(&self.content, "# User")
    }

    /// Render the user section (or whole body if it has none) with `{{var}}` replaced
    pub fn render_user(&self, vars: &HashMap<&str, &str>) -> String {
        let mut result = self.user_section().unwrap_or(&self.content).to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Full prompt text for completion-style backends: system then rendered user
    pub fn render_full(&self, vars: &HashMap<&str, &str>) -> String {
        match self.system_section() {
            Some(system) => format!("{}\n\n{}", system, self.render_user(vars)),
            None => self.render_user(vars),
        }
    }
}

/// Prompt library for loading and caching prompts
pub struct PromptLibrary {
    override_dir: Option<PathBuf>,
    cache: HashMap<PromptId, Prompt>,
}

impl PromptLibrary {
    pub fn new() -> Self {
        Self {
            override_dir: default_prompts_dir(),
            cache: HashMap::new(),
        }
    }

    pub fn with_override_dir(path: PathBuf) -> Self {
        Self {
            override_dir: Some(path),
            cache: HashMap::new(),
        }
    }

    /// No override directory (embedded prompts only)
    pub fn embedded_only() -> Self {
        Self {
            override_dir: None,
            cache: HashMap::new(),
        }
    }

    /// Get a prompt by ID, loading from override or default
    pub fn get(&mut self, id: PromptId) -> Result<&Prompt> {
        if !self.cache.contains_key(&id) {
            let prompt = self.load(id)?;
            self.cache.insert(id, prompt);
        }
        self.cache
            .get(&id)
            .ok_or_else(|| Error::Configuration(format!("Prompt {} not loaded", id.as_str())))
    }

    fn load(&self, id: PromptId) -> Result<Prompt> {
        if let Some(ref override_dir) = self.override_dir {
            let override_path = override_dir.join(format!("{}.md", id.as_str()));
            if override_path.exists() {
                let content = fs::read_to_string(&override_path).map_err(|e| {
                    Error::Configuration(format!("Failed to read prompt override: {}", e))
                })?;
                let (metadata, body) = parse_prompt(&content)?;
                tracing::debug!(
                    prompt = id.as_str(),
                    path = %override_path.display(),
                    "Using prompt override"
                );
                return Ok(Prompt {
                    metadata,
                    content: body,
                    is_override: true,
                    override_path: Some(override_path),
                });
            }
        }

        let (metadata, body) = parse_prompt(id.default_content())?;
        Ok(Prompt {
            metadata,
            content: body,
            is_override: false,
            override_path: None,
        })
    }

    pub fn has_override(&self, id: PromptId) -> bool {
        self.override_dir
            .as_ref()
            .is_some_and(|d| d.join(format!("{}.md", id.as_str())).exists())
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::new()
    }
}

/// Default prompts override directory
pub fn default_prompts_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("tabsplit").join("prompts").join("overrides"))
}

/// Split a prompt file into YAML frontmatter and body
fn parse_prompt(content: &str) -> Result<(PromptMetadata, String)> {
    let content = content.trim();

    let rest = content.strip_prefix("---").ok_or_else(|| {
        Error::Configuration("Prompt must start with YAML frontmatter (---)".into())
    })?;
    let end = rest.find("---").ok_or_else(|| {
        Error::Configuration("Prompt frontmatter not closed (missing second ---)".into())
    })?;

    let metadata: PromptMetadata = serde_yaml::from_str(rest[..end].trim())
        .map_err(|e| Error::Configuration(format!("Invalid prompt frontmatter: {}", e)))?;

    Ok((metadata, rest[end + 3..].trim().to_string()))
}

fn extract_section<'a>(content: &'a str, header: &str) -> Option<&'a str> {
    let start = content.find(header)?;
    let after_header = &content[start + header.len()..];
    let end = after_header.find("\n# ").unwrap_or(after_header.len());
    Some(after_header[..end].trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts_parse() {
        for id in PromptId::all() {
            let (metadata, body) = parse_prompt(id.default_content()).unwrap();
            assert_eq!(metadata.id, id.as_str());
            assert!(body.contains("# System"));
            assert!(body.contains("# User"));
        }
    }

    #[test]
    fn test_render_user_substitutes_ocr_text() {
        let mut lib = PromptLibrary::embedded_only();
        let prompt = lib.get(PromptId::ParseReceiptText).unwrap();

        let mut vars = HashMap::new();
        vars.insert("ocr_text", "JOE'S DINER\nBurger 12.00");
        let rendered = prompt.render_user(&vars);

        assert!(rendered.contains("Burger 12.00"));
        assert!(!rendered.contains("{{ocr_text}}"));
        assert!(!rendered.contains("# System"));

        let full = prompt.render_full(&vars);
        assert!(full.starts_with("You convert"));
    }

    #[test]
    fn test_missing_frontmatter_rejected() {
        assert!(parse_prompt("# System\nhello").is_err());
        assert!(parse_prompt("---\nid: x\nversion: 1\n").is_err());
    }

    #[test]
    fn test_override_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("parse_receipt_text.md"),
            "---\nid: parse_receipt_text\nversion: 7\ntask_type: structured_extraction\n---\n# User\nCustom {{ocr_text}}",
        )
        .unwrap();

        let mut lib = PromptLibrary::with_override_dir(dir.path().to_path_buf());
        assert!(lib.has_override(PromptId::ParseReceiptText));
        let prompt = lib.get(PromptId::ParseReceiptText).unwrap();
        assert!(prompt.is_override);
        assert_eq!(prompt.metadata.version, 7);
    }
}
