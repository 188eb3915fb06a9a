use bitflags::bitflags;

use crate::utils::names_equal;

bitflags! {
    /// Selects members by visibility and storage, the way reflection's binding flags do
    ///
    /// A member passes when every applicable test passes: a static member needs `STATIC`, an
    /// instance member needs `INSTANCE`, a public member needs `PUBLIC` and a non-public member
    /// needs `NON_PUBLIC`. Nested types only take the public tests. `IGNORE_CASE` switches name
    /// comparisons to case-insensitive.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct VisibilityMask: u32 {
        /// Include public members
        const PUBLIC = 0x01;
        /// Include non-public members
        const NON_PUBLIC = 0x02;
        /// Include static members
        const STATIC = 0x04;
        /// Include instance members
        const INSTANCE = 0x08;
        /// Compare names ignoring case
        const IGNORE_CASE = 0x10;
        /// Public static and instance members
        const PUBLIC_MEMBERS = Self::PUBLIC.bits() | Self::STATIC.bits() | Self::INSTANCE.bits();
        /// Every member
        const ALL = Self::PUBLIC.bits() | Self::NON_PUBLIC.bits() | Self::STATIC.bits() | Self::INSTANCE.bits();
    }
}

impl Default for VisibilityMask {
    fn default() -> Self {
        VisibilityMask::PUBLIC_MEMBERS
    }
}

impl VisibilityMask {
    /// Tests a method or field
    #[must_use]
    pub fn accepts(self, is_static: bool, is_public: bool) -> bool {
        if is_static && !self.contains(VisibilityMask::STATIC) {
            return false;
        }

        if !is_static && !self.contains(VisibilityMask::INSTANCE) {
            return false;
        }

        self.accepts_visibility(is_public)
    }

    /// Tests only the public / non-public bits
    #[must_use]
    pub fn accepts_visibility(self, is_public: bool) -> bool {
        if is_public {
            self.contains(VisibilityMask::PUBLIC)
        } else {
            self.contains(VisibilityMask::NON_PUBLIC)
        }
    }

    /// Compares member names, honoring `IGNORE_CASE`
    #[must_use]
    pub fn names_match(self, left: &str, right: &str) -> bool {
        names_equal(left, right, self.contains(VisibilityMask::IGNORE_CASE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_semantics() {
        let mask = VisibilityMask::PUBLIC | VisibilityMask::STATIC;

        assert!(mask.accepts(true, true));
        assert!(!mask.accepts(false, true));
        assert!(!mask.accepts(true, false));
        assert!(VisibilityMask::ALL.accepts(false, false));
        assert!(!VisibilityMask::empty().accepts(true, true));
    }

    #[test]
    fn visibility_only() {
        assert!(VisibilityMask::NON_PUBLIC.accepts_visibility(false));
        assert!(!VisibilityMask::NON_PUBLIC.accepts_visibility(true));
    }

    #[test]
    fn names() {
        assert!(!VisibilityMask::ALL.names_match("Value", "value"));
        assert!((VisibilityMask::ALL | VisibilityMask::IGNORE_CASE).names_match("Value", "value"));
    }
}
