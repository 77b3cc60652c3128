//! Backend identification.

/// Identifies the type of document-store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// In-process store.
    Memory,
    /// MongoDB.
    MongoDB,
    /// Custom or unknown backend.
    Custom(&'static str),
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Memory => write!(f, "memory"),
            BackendKind::MongoDB => write!(f, "mongodb"),
            BackendKind::Custom(name) => write!(f, "{}", name),
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(BackendKind::Memory),
            "mongodb" | "mongo" => Ok(BackendKind::MongoDB),
            other => Err(format!("unknown backend: {}", other)),
        }
    }
}
