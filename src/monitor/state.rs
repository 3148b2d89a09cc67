//! Layout classification and observed-layout state.
//!
//! A layout identifier is a 16-bit LANGID whose low 10 bits encode the
//! primary language. Classification only distinguishes "English" from
//! everything else; the sub-language (US, UK, AU, ...) is ignored.

/// Primary-language value for English in a LANGID.
pub const PRIMARY_LANG_ENGLISH: u16 = 0x0009;

/// Mask selecting the primary-language bits of a LANGID.
const PRIMARY_LANG_MASK: u16 = 0x03FF;

/// Returns whether a LANGID is an English layout.
///
/// `0x0409` (en-US), `0x0809` (en-GB) and `0x0C09` (en-AU) all
/// classify English; `0x0404` (zh-TW) does not.
pub fn is_english_langid(langid: u16) -> bool {
    langid & PRIMARY_LANG_MASK == PRIMARY_LANG_ENGLISH
}

/// Edge transition reported by [`LayoutState::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutTransition {
    BecameEnglish,
    LeftEnglish,
}

/// Last observed layout of the monitored target.
///
/// Only the polling task mutates this, under the session's lock; it
/// must only ever be fed codes read from a foreground window that
/// matched the current target.
#[derive(Debug, Default)]
pub struct LayoutState {
    last_langid: Option<u16>,
    is_english: bool,
}

impl LayoutState {
    /// Records a newly observed layout code.
    ///
    /// Returns the edge transition when the English flag flips, `None`
    /// while the classification is unchanged.
    pub fn observe(&mut self, langid: u16) -> Option<LayoutTransition> {
        self.last_langid = Some(langid);

        let english = is_english_langid(langid);
        if english == self.is_english {
            return None;
        }
        self.is_english = english;

        Some(if english {
            LayoutTransition::BecameEnglish
        } else {
            LayoutTransition::LeftEnglish
        })
    }

    pub fn is_english(&self) -> bool {
        self.is_english
    }

    pub fn last_langid(&self) -> Option<u16> {
        self.last_langid
    }

    /// Display tag for the last layout code: `"0409"`, or `"----"`
    /// before anything has been observed.
    pub fn layout_tag(&self) -> String {
        match self.last_langid {
            Some(langid) => format!("{langid:04X}"),
            None => "----".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_english_variants() {
        assert!(is_english_langid(0x0409)); // en-US
        assert!(is_english_langid(0x0809)); // en-GB, sub-language differs
        assert!(is_english_langid(0x0C09)); // en-AU
    }

    #[test]
    fn test_classify_non_english() {
        assert!(!is_english_langid(0x0404)); // zh-TW
        assert!(!is_english_langid(0x0419)); // ru-RU
        assert!(!is_english_langid(0x0000));
    }

    #[test]
    fn test_observe_reports_edges_only() {
        let mut state = LayoutState::default();
        assert_eq!(state.observe(0x0409), Some(LayoutTransition::BecameEnglish));
        assert_eq!(state.observe(0x0409), None);
        assert_eq!(state.observe(0x0809), None); // still English
        assert_eq!(state.observe(0x0404), Some(LayoutTransition::LeftEnglish));
        assert_eq!(state.observe(0x0419), None); // still non-English
        assert_eq!(state.observe(0x0409), Some(LayoutTransition::BecameEnglish));
    }

    #[test]
    fn test_layout_tag_formatting() {
        let mut state = LayoutState::default();
        assert_eq!(state.layout_tag(), "----");
        state.observe(0x0409);
        assert_eq!(state.layout_tag(), "0409");
        state.observe(0x0019);
        assert_eq!(state.layout_tag(), "0019");
    }
}
