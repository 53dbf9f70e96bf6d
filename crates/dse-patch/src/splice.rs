//! Range substitution on text snapshots

use std::ops::Range;

use crate::PatchError;

/// Replace `range` of `text` with `replacement`.
pub fn splice(text: &str, range: Range<usize>, replacement: &str) -> Result<String, PatchError> {
    let invalid = PatchError::InvalidRange {
        start: range.start,
        end: range.end,
    };
    if range.start > range.end {
        return Err(invalid);
    }
    let (Some(before), Some(after)) = (text.get(..range.start), text.get(range.end..)) else {
        return Err(invalid);
    };

    let mut out = String::with_capacity(before.len() + replacement.len() + after.len());
    out.push_str(before);
    out.push_str(replacement);
    out.push_str(after);
    Ok(out)
}

/// One range replacement, offsets relative to the unpatched text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPatch {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl TextPatch {
    pub fn new(range: Range<usize>, text: impl Into<String>) -> Self {
        Self {
            start: range.start,
            end: range.end,
            text: text.into(),
        }
    }
}

/// Apply several non-overlapping patches, last range first so earlier
/// offsets stay valid.
pub fn apply_patches(text: &str, patches: &[TextPatch]) -> Result<String, PatchError> {
    let mut ordered: Vec<&TextPatch> = patches.iter().collect();
    ordered.sort_by_key(|p| p.start);

    for pair in ordered.windows(2) {
        if pair[0].end > pair[1].start {
            return Err(PatchError::Overlap(pair[1].start));
        }
    }

    let mut result = text.to_string();
    for patch in ordered.iter().rev() {
        result = splice(&result, patch.start..patch.end, &patch.text)?;
    }
    Ok(result)
}
