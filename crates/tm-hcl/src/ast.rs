//! Typed AST nodes handed to block handlers.

use std::collections::BTreeMap;

/// Position of a node in a source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceRange {
    /// File path as given to the reader.
    pub file: String,
    /// One-based line.
    pub line: u32,
    /// One-based column.
    pub column: u32,
}

impl SourceRange {
    /// Creates a range.
    #[must_use]
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

/// Number literal kept as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberText(String);

/// A number narrowed to the most precise wire type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// Exactly representable as `i64`.
    Int(i64),
    /// Anything else.
    Float(f64),
}

/// Bounds of the integral `f64` values that fit in `i64`.
const I64_LOWER: f64 = -9_223_372_036_854_775_808.0;
const I64_UPPER_EXCLUSIVE: f64 = 9_223_372_036_854_775_808.0;

impl NumberText {
    /// Wraps number text.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Number text as written.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns [`Number::Int`] when the value is an exact `i64`, including
    /// integral values written with a fraction or exponent (`10.0`, `1e3`),
    /// and [`Number::Float`] otherwise. `None` when the text is not a number.
    ///
    /// # Example
    ///
    /// ```
    /// use tm_hcl::{Number, NumberText};
    ///
    /// assert_eq!(NumberText::new("1e3").classify(), Some(Number::Int(1000)));
    /// assert_eq!(NumberText::new("2.5").classify(), Some(Number::Float(2.5)));
    /// ```
    #[must_use]
    pub fn classify(&self) -> Option<Number> {
        if let Ok(int) = self.0.parse::<i64>() {
            return Some(Number::Int(int));
        }
        let float = self.0.parse::<f64>().ok()?;
        Some(exact_int(float).map_or(Number::Float(float), Number::Int))
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "the value is integral and inside the i64 range"
)]
fn exact_int(value: f64) -> Option<i64> {
    if !value.is_finite() || value.fract().abs() > 0.0 {
        return None;
    }
    if value < I64_LOWER || value >= I64_UPPER_EXCLUSIVE {
        return None;
    }
    Some(value as i64)
}

/// Known value of an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiteralValue {
    /// String value.
    String(String),
    /// Boolean value.
    Bool(bool),
    /// Number value.
    Number(NumberText),
    /// `null`.
    Null,
    /// A known value of another type (list, object).
    Other,
}

/// An attribute's right-hand side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    source: String,
    literal: Option<LiteralValue>,
    constant: Option<LiteralValue>,
}

impl Expression {
    /// An expression with no statically known value.
    #[must_use]
    pub fn dynamic(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            literal: None,
            constant: None,
        }
    }

    /// A literal token such as `true`, `42`, or `null`.
    #[must_use]
    pub fn literal(source: impl Into<String>, value: LiteralValue) -> Self {
        Self {
            source: source.into(),
            literal: Some(value),
            constant: None,
        }
    }

    /// An expression that evaluates without context, such as a template
    /// with no interpolation.
    #[must_use]
    pub fn constant(source: impl Into<String>, value: LiteralValue) -> Self {
        Self {
            source: source.into(),
            literal: None,
            constant: Some(value),
        }
    }

    /// Source text exactly as written after `=`.
    #[must_use]
    pub const fn source(&self) -> &str {
        self.source.as_str()
    }

    /// Value of a literal token.
    #[must_use]
    pub const fn literal_value(&self) -> Option<&LiteralValue> {
        self.literal.as_ref()
    }

    /// Value from context-free evaluation.
    #[must_use]
    pub const fn constant_value(&self) -> Option<&LiteralValue> {
        self.constant.as_ref()
    }
}

/// `name = expr` inside a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name.
    pub name: String,
    /// Right-hand side; `None` when the parser recovered from an error.
    pub expr: Option<Expression>,
    /// Position of the name.
    pub range: SourceRange,
}

/// A syntactic block occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    /// Block type.
    pub block_type: String,
    /// Labels in source order.
    pub labels: Vec<String>,
    /// Attributes by name.
    pub attributes: BTreeMap<String, Attribute>,
    /// Nested blocks in source order.
    pub blocks: Vec<Self>,
    /// Position of the block type.
    pub range: SourceRange,
}

/// Key of a merged block: its type and label values.
///
/// `num_labels` is the fixed label count of the block type; zero means the
/// label list is open-ended and ends at the first empty entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelBlockType {
    /// Block type.
    pub block_type: String,
    /// Label values.
    pub labels: Vec<String>,
    /// Fixed label count, or zero.
    pub num_labels: usize,
}

impl LabelBlockType {
    /// Key for a block type with an exact label list.
    #[must_use]
    pub fn new(block_type: impl Into<String>, labels: Vec<String>) -> Self {
        let num_labels = labels.len();
        Self {
            block_type: block_type.into(),
            labels,
            num_labels,
        }
    }

    /// Key for a block type with an open-ended label list.
    #[must_use]
    pub fn open(block_type: impl Into<String>, labels: Vec<String>) -> Self {
        Self {
            block_type: block_type.into(),
            labels,
            num_labels: 0,
        }
    }
}

/// All occurrences of a block type merged into one logical block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedBlock {
    /// Type and labels of the merged block.
    pub label_type: LabelBlockType,
    /// Position of every merged occurrence, in source order.
    pub raw_origins: Vec<SourceRange>,
    /// Union of the occurrences' attributes.
    pub attributes: BTreeMap<String, Attribute>,
    /// Merged children keyed by type and labels.
    pub blocks: BTreeMap<LabelBlockType, Self>,
}
