use anyhow::{Result, bail};

/// Prompt asking the notes backend to explain a chunk.
pub const NOTES_PROMPT: PromptTemplate =
    PromptTemplate::new("Provide detailed notes about the following topic: {topic}");

/// Prompt asking the quiz backend for questions about a chunk.
pub const QUIZ_PROMPT: PromptTemplate =
    PromptTemplate::new("Create a detailed quiz about the following topic: {topic}");

/// Prompt combining the aggregated notes and quizzes.
pub const MERGE_PROMPT: PromptTemplate = PromptTemplate::new(
    "Merge the following notes --> {notes} and quizzes --> {quizes} into a single document",
);

/// A prompt with `{name}` placeholders.
///
/// Rendering is single-pass: substituted values are never scanned for
/// placeholders themselves, so document text containing braces is safe.
/// Braces that do not enclose an identifier are copied through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    template: &'static str,
}

impl PromptTemplate {
    pub const fn new(template: &'static str) -> Self {
        Self { template }
    }

    /// Placeholder names in order of appearance.
    #[cfg(test)]
    pub fn variables(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        let mut rest = self.template;
        while let Some((_, name, tail)) = next_placeholder(rest) {
            if !names.contains(&name) {
                names.push(name);
            }
            rest = tail;
        }
        names
    }

    pub fn render(&self, vars: &[(&str, &str)]) -> Result<String> {
        let mut out = String::with_capacity(
            self.template.len() + vars.iter().map(|(_, v)| v.len()).sum::<usize>(),
        );
        let mut rest = self.template;

        while let Some((literal, name, tail)) = next_placeholder(rest) {
            out.push_str(literal);
            let Some((_, value)) = vars.iter().find(|(k, _)| *k == name) else {
                bail!("Missing prompt variable '{name}'");
            };
            out.push_str(value);
            rest = tail;
        }
        out.push_str(rest);

        Ok(out)
    }
}

/// Splits `s` at the first `{identifier}` into (text before, identifier,
/// text after).
fn next_placeholder(s: &str) -> Option<(&str, &str, &str)> {
    let mut offset = 0;
    while let Some(open) = s[offset..].find('{').map(|i| i + offset) {
        let after_open = &s[open + 1..];
        if let Some(close) = after_open.find('}') {
            let name = &after_open[..close];
            if is_identifier(name) {
                return Some((&s[..open], name, &after_open[close + 1..]));
            }
        }
        offset = open + 1;
    }
    None
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
