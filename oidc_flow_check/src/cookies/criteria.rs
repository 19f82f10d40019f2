use std::ops::{BitAnd, BitOr, Not};

/// Which fields of an [`ExpectedCookie`](super::ExpectedCookie) are checked.
///
/// Each check is a named flag. The bitwise operators compose sets the same way
/// a flags enum would, so `STRICT & !NAME_EQUALS | NAME_STARTS_WITH` keeps every
/// strict check but matches the name as a prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ComparisonCriteria {
    pub name_equals: bool,
    pub name_starts_with: bool,
    pub value: bool,
    pub path: bool,
    pub domain: bool,
    pub secure: bool,
    pub http_only: bool,
    pub expires: bool,
    /// Actual `Expires` must be the Unix epoch
    pub delete: bool,
}

impl ComparisonCriteria {
    pub const NONE: Self = Self {
        name_equals: false,
        name_starts_with: false,
        value: false,
        path: false,
        domain: false,
        secure: false,
        http_only: false,
        expires: false,
        delete: false,
    };
    pub const NAME_EQUALS: Self = Self {
        name_equals: true,
        ..Self::NONE
    };
    pub const NAME_STARTS_WITH: Self = Self {
        name_starts_with: true,
        ..Self::NONE
    };
    pub const VALUE: Self = Self {
        value: true,
        ..Self::NONE
    };
    pub const PATH: Self = Self {
        path: true,
        ..Self::NONE
    };
    pub const DOMAIN: Self = Self {
        domain: true,
        ..Self::NONE
    };
    pub const SECURE: Self = Self {
        secure: true,
        ..Self::NONE
    };
    pub const HTTP_ONLY: Self = Self {
        http_only: true,
        ..Self::NONE
    };
    pub const EXPIRES: Self = Self {
        expires: true,
        ..Self::NONE
    };
    pub const DELETE: Self = Self {
        delete: true,
        ..Self::NONE
    };
    /// Every field except prefix matching and deletion
    pub const STRICT: Self = Self {
        name_equals: true,
        value: true,
        path: true,
        domain: true,
        secure: true,
        http_only: true,
        expires: true,
        ..Self::NONE
    };

    fn zip(self, other: Self, op: impl Fn(bool, bool) -> bool) -> Self {
        Self {
            name_equals: op(self.name_equals, other.name_equals),
            name_starts_with: op(self.name_starts_with, other.name_starts_with),
            value: op(self.value, other.value),
            path: op(self.path, other.path),
            domain: op(self.domain, other.domain),
            secure: op(self.secure, other.secure),
            http_only: op(self.http_only, other.http_only),
            expires: op(self.expires, other.expires),
            delete: op(self.delete, other.delete),
        }
    }

    /// True when every check enabled in `other` is enabled here
    pub fn contains(self, other: Self) -> bool {
        (self & other) == other
    }

    pub fn is_empty(self) -> bool {
        self == Self::NONE
    }
}

impl BitOr for ComparisonCriteria {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.zip(rhs, |a, b| a || b)
    }
}

impl BitAnd for ComparisonCriteria {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        self.zip(rhs, |a, b| a && b)
    }
}

impl Not for ComparisonCriteria {
    type Output = Self;

    fn not(self) -> Self {
        self.zip(Self::NONE, |a, _| !a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type C = ComparisonCriteria;

    #[test]
    fn test_swap_exact_name_for_prefix() {
        let criteria = C::STRICT & !C::NAME_EQUALS | C::NAME_STARTS_WITH;

        assert!(!criteria.name_equals);
        assert!(criteria.name_starts_with);
        assert!(criteria.contains(C::VALUE | C::PATH | C::SECURE | C::HTTP_ONLY | C::EXPIRES));
        assert!(!criteria.delete);
    }

    #[test]
    fn test_strict_excludes_prefix_and_delete() {
        assert!(!C::STRICT.name_starts_with);
        assert!(!C::STRICT.delete);
        assert!(C::STRICT.contains(C::NAME_EQUALS));
    }

    #[test]
    fn test_not_of_none_is_everything() {
        let all = !C::NONE;
        assert!(all.contains(C::STRICT | C::NAME_STARTS_WITH | C::DELETE));
        assert!((!all).is_empty());
    }

    #[test]
    fn test_default_is_empty() {
        assert!(C::default().is_empty());
    }
}
