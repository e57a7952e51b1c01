/// One rubric entry, e.g. `1, A`: a label, a comma and a space, then the value
/// token whose first character is the correctable grade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RubricLine {
    text: String,
}

/// A single applied correction: `from` was replaced by `to` in `exercise`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RubricEdit {
    pub(crate) exercise: usize,
    pub(crate) from: char,
    pub(crate) to: char,
}

impl RubricLine {
    pub(crate) fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.text
    }

    pub(crate) fn label(&self) -> Option<&str> {
        self.split().map(|(label, _)| label)
    }

    // Label is everything before the first comma; the value must follow exactly one
    // separating space.
    fn split(&self) -> Option<(&str, &str)> {
        let comma = self.text.find(',')?;
        let value = self.text[comma + 1..].strip_prefix(' ')?;
        Some((&self.text[..comma], value))
    }

    /// Advances the first character of the value by one code point.
    ///
    /// Returns `None` and leaves the line untouched when the line has no
    /// `label, value` shape or the next code point is not a valid `char`.
    pub(crate) fn apply_correction(&mut self, exercise: usize) -> Option<RubricEdit> {
        let (label, value) = self.split()?;
        let mut chars = value.chars();
        let from = chars.next()?;
        let to = char::from_u32(u32::from(from) + 1)?;
        let corrected = format!("{label}, {to}{}", chars.as_str());

        self.text = corrected;
        Some(RubricEdit { exercise, from, to })
    }
}
