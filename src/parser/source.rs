//! Embed directive parser
//!
//! Classifies the line under the cursor as a comment, and extracts the path of
//! an embed directive when the comment is one:
//! - `//go:embed data.txt` and `// go:embed data.txt`
//! - `/* go:embed data.txt */` (opened and closed on the same line)
//!
//! Classification only looks at the cursor's line. Block comments spanning
//! several lines are not tracked and the cursor column is ignored.

use regex::Regex;
use tower_lsp::lsp_types::Position;
use tracing::debug;

/// Directive recognised when no other keyword is configured
pub const DEFAULT_DIRECTIVE: &str = "go:embed";

/// Lexical context of the cursor's line
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SourceContext {
    #[default]
    Unknown,
    InComment {
        /// Path token of an embed directive on this line
        embed: Option<String>,
    },
}

impl SourceContext {
    pub fn embed_path(&self) -> Option<&str> {
        match self {
            SourceContext::InComment { embed } => embed.as_deref(),
            SourceContext::Unknown => None,
        }
    }
}

/// Parser for embed directives in source comments
#[derive(Debug, Clone)]
pub struct SourceParser {
    line_directive: Regex,
    block_directive: Regex,
}

impl SourceParser {
    /// Creates a parser recognising `directive` (e.g. `go:embed`)
    pub fn new(directive: &str) -> Self {
        let keyword = regex::escape(directive);
        Self {
            line_directive: Regex::new(&format!(r"^//\s*{}\s+(.+?)\s*$", keyword))
                .expect("line directive pattern is valid"),
            block_directive: Regex::new(&format!(r"^/\*\s*{}\s+(.+?)\s*\*/", keyword))
                .expect("block directive pattern is valid"),
        }
    }

    /// Classifies the line at `position` in `source`
    pub fn parse_position(&self, source: Option<&str>, position: Position) -> SourceContext {
        let Some(source) = source else {
            return SourceContext::Unknown;
        };
        let Some(line) = source.lines().nth(position.line as usize) else {
            return SourceContext::Unknown;
        };
        self.parse_line(line)
    }

    /// Classifies a single line
    pub fn parse_line(&self, line: &str) -> SourceContext {
        let trimmed = line.trim_start();

        let directive = if trimmed.starts_with("//") {
            &self.line_directive
        } else if trimmed.starts_with("/*") {
            &self.block_directive
        } else {
            return SourceContext::Unknown;
        };

        let embed = directive
            .captures(trimmed)
            .and_then(|captures| captures.get(1))
            .map(|path| path.as_str().to_string());
        debug!("Comment line {:?} embeds {:?}", line, embed);

        SourceContext::InComment { embed }
    }
}

impl Default for SourceParser {
    fn default() -> Self {
        Self::new(DEFAULT_DIRECTIVE)
    }
}
