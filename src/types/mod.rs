#![forbid(unsafe_code)]
//! Shared identifiers and the crate-wide error type.

use std::fmt;

/// Cell timestamp as delivered by the wide-column store (milliseconds).
pub type Timestamp = i64;

/// Which kind of graph element a row materializes into.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ElementKind {
    /// A vertex row carrying properties and edge references.
    Vertex,
    /// An edge row carrying properties, a label and both endpoints.
    Edge,
}

impl ElementKind {
    /// Single-byte tag written at the start of every encoded record body.
    pub const fn type_id(self) -> u8 {
        match self {
            ElementKind::Vertex => 1,
            ElementKind::Edge => 2,
        }
    }

    /// Maps a type tag back to the element kind.
    pub fn from_type_id(tag: u8) -> Result<Self> {
        match tag {
            1 => Ok(ElementKind::Vertex),
            2 => Ok(ElementKind::Edge),
            other => Err(PushdownError::format(
                "element type tag",
                "1 (vertex) or 2 (edge)",
                other,
            )),
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Vertex => write!(f, "vertex"),
            ElementKind::Edge => write!(f, "edge"),
        }
    }
}

/// Direction of an edge reference stored on a vertex row.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Direction {
    /// Edge leaves this vertex.
    Out,
    /// Edge arrives at this vertex.
    In,
}

impl Direction {
    /// Tag byte used by the record format.
    pub const fn tag(self) -> u8 {
        match self {
            Direction::Out => b'O',
            Direction::In => b'I',
        }
    }

    /// Decodes a direction tag byte.
    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            b'O' => Ok(Direction::Out),
            b'I' => Ok(Direction::In),
            other => Err(PushdownError::format("direction tag", "'O' or 'I'", other)),
        }
    }

    /// Lower-case name used in decode errors.
    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::Out => "out",
            Direction::In => "in",
        }
    }
}

/// Errors raised while resolving or (de)serializing elements.
#[derive(thiserror::Error, Debug)]
pub enum PushdownError {
    /// Header, type tag or length prefix did not match on decode.
    #[error("format error in {context}: expected {expected}, found {found}")]
    Format {
        /// Which field was being read.
        context: &'static str,
        /// What the decoder required.
        expected: String,
        /// What the input actually contained.
        found: String,
    },
    /// A column qualifier could not be split into its discriminator parts.
    #[error("malformed {context} qualifier: expected {expected} parts, found {found}")]
    Configuration {
        /// Which column family the qualifier belonged to.
        context: &'static str,
        /// Token count the family requires.
        expected: usize,
        /// Token count actually present.
        found: usize,
    },
    /// A column family tag that neither the vertex nor the edge table knows.
    #[error("unrecognized column family {family:?} for {kind} row")]
    ProtocolViolation {
        /// The raw family tag, lossily rendered.
        family: String,
        /// Element kind whose table was consulted.
        kind: ElementKind,
    },
    /// Caller supplied an argument the layer cannot honor.
    #[error("invalid argument: {0}")]
    Invalid(&'static str),
    /// Reading an options file failed.
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    /// An options document did not parse.
    #[error("config: {0}")]
    Config(#[from] toml::de::Error),
}

impl PushdownError {
    /// Builds a [`PushdownError::Format`] from displayable expected/found values.
    pub fn format(
        context: &'static str,
        expected: impl fmt::Display,
        found: impl fmt::Display,
    ) -> Self {
        PushdownError::Format {
            context,
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, PushdownError>;
