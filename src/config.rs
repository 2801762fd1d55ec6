use serde::{Deserialize, Serialize};

/// Parser limits and output options, read once at the start of every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Deepest element nesting accepted.
    pub max_depth: usize,
    /// Element starts plus text runs accepted in one document.
    pub max_node_count: u64,
    pub max_document_chars: u64,
    pub max_entity_chars: u64,
    pub allow_dtd: bool,
    pub allow_external_resolver: bool,
    /// Pretty-print serialized documents.
    pub indent: bool,
}

pub const DEFAULT_MAX_DEPTH: usize = 128;
pub const DEFAULT_MAX_NODE_COUNT: u64 = 100_000;
pub const DEFAULT_MAX_DOCUMENT_CHARS: u64 = 10 * 1024 * 1024;
pub const DEFAULT_MAX_ENTITY_CHARS: u64 = 1024 * 1024;

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            max_depth: DEFAULT_MAX_DEPTH,
            max_node_count: DEFAULT_MAX_NODE_COUNT,
            max_document_chars: DEFAULT_MAX_DOCUMENT_CHARS,
            max_entity_chars: DEFAULT_MAX_ENTITY_CHARS,
            allow_dtd: false,
            allow_external_resolver: false,
            indent: false,
        }
    }
}

impl Settings {
    pub fn with_max_depth(mut self, max_depth: usize) -> Settings {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_node_count(mut self, max_node_count: u64) -> Settings {
        self.max_node_count = max_node_count;
        self
    }

    pub fn with_max_document_chars(mut self, max_document_chars: u64) -> Settings {
        self.max_document_chars = max_document_chars;
        self
    }

    pub fn with_max_entity_chars(mut self, max_entity_chars: u64) -> Settings {
        self.max_entity_chars = max_entity_chars;
        self
    }

    pub fn allow_dtd(mut self, allow: bool) -> Settings {
        self.allow_dtd = allow;
        self
    }

    pub fn allow_external_resolver(mut self, allow: bool) -> Settings {
        self.allow_external_resolver = allow;
        self
    }

    pub fn indent(mut self, indent: bool) -> Settings {
        self.indent = indent;
        self
    }
}
