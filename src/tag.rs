//! Tag expression parsing.
//!
//! Logix tag expressions look like `Program:Main.Recipe.Setpoints[3,4].Value.2`: dot-separated
//! symbolic segments, optional comma-separated array subscripts, and an optional trailing integer
//! selecting a single bit out of the addressed word.

use crate::error::TagError;

/// One dot-separated step of a tag expression: a symbol name plus any array subscripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    /// Symbol name, e.g. `Setpoints`.
    pub name: String,
    /// Array subscripts, one per dimension. Empty for unsubscripted segments.
    pub indices: Vec<u32>,
}

/// A parsed tag expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPath {
    full: String,
    base: String,
    segments: Vec<PathSegment>,
    bit_index: Option<u32>,
}

impl TagPath {
    /// Parse a free-form tag expression.
    pub fn parse(tag: &str) -> Result<Self, TagError> {
        if tag.is_empty() {
            return Err(TagError::Empty);
        }

        let mut raw_segments = tag.split('.').collect::<Vec<_>>();

        // A final all-digit segment with no subscript brackets selects a bit of the addressed
        // word. It contributes nothing to the symbolic path.
        let bit_index = match raw_segments.last() {
            Some(last) if raw_segments.len() > 1 && is_integer(last) => {
                let bit = last
                    .parse::<u32>()
                    .map_err(|_| TagError::BadBitIndex { segment: last.to_string() })?;

                raw_segments.pop();

                Some(bit)
            }
            _ => None,
        };

        let mut segments = Vec::with_capacity(raw_segments.len());

        for raw in raw_segments {
            segments.push(parse_segment(raw)?);
        }

        let mut base = segments
            .iter()
            .map(|segment| segment.name.as_str())
            .collect::<Vec<_>>()
            .join(".");

        // The cache key keeps the bit suffix: `Status.3` and `Status` are distinct expressions
        // even though they address the same symbol.
        if let Some(bit) = bit_index {
            base.push('.');
            base.push_str(&bit.to_string());
        }

        Ok(Self {
            full: tag.to_string(),
            base,
            segments,
            bit_index,
        })
    }

    /// The expression as given.
    pub fn full(&self) -> &str {
        &self.full
    }

    /// The expression with array subscripts stripped, used as the known-tag cache key.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// The dot-separated path segments.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// The trailing bit-of-word selector, if any.
    pub fn bit_index(&self) -> Option<u32> {
        self.bit_index
    }

    /// The final array subscript, or 0 when the expression is unsubscripted.
    ///
    /// For packed BOOL arrays this is the bit offset into the array; for multi-dimensional
    /// subscripts the last dimension varies fastest and is the one the bit offset lives in.
    pub fn element_index(&self) -> u32 {
        self.segments
            .last()
            .and_then(|segment| segment.indices.last())
            .copied()
            .unwrap_or(0)
    }
}

impl core::fmt::Display for TagPath {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.full)
    }
}

fn parse_segment(raw: &str) -> Result<PathSegment, TagError> {
    if raw.is_empty() {
        return Err(TagError::EmptySegment);
    }

    let Some(open) = raw.find('[') else {
        return Ok(PathSegment {
            name: raw.to_string(),
            indices: Vec::new(),
        });
    };

    let name = &raw[..open];

    if name.is_empty() {
        return Err(TagError::EmptySegment);
    }

    let Some(subscript) = raw[open + 1..].strip_suffix(']') else {
        return Err(TagError::BadSubscript { segment: raw.to_string() });
    };

    let indices = subscript
        .split(',')
        .map(|index| index.trim().parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| TagError::BadSubscript { segment: raw.to_string() })?;

    Ok(PathSegment {
        name: name.to_string(),
        indices,
    })
}

fn is_integer(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|byte| byte.is_ascii_digit())
}
