/// Declares a dense `u32` index newtype.
///
/// The generated type reserves `u32::MAX` as the invalid sentinel so that a
/// `Vec` of indices can be initialized to "not yet assigned".
#[macro_export]
macro_rules! make_index {
    ($vis:vis $name:ident) => {
        #[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
        $vis struct $name(u32);

        impl $name {
            #[inline(always)]
            $vis fn new(x: usize) -> Self {
                debug_assert!(x < u32::MAX as usize);
                Self(x as u32)
            }

            #[inline(always)]
            $vis fn index(&self) -> usize {
                self.0 as usize
            }

            #[inline(always)]
            $vis fn invalid() -> Self {
                Self(u32::MAX)
            }

            #[inline(always)]
            $vis fn is_valid(&self) -> bool {
                self.0 != u32::MAX
            }
        }

        impl ::std::default::Default for $name {
            fn default() -> Self {
                Self::invalid()
            }
        }

        impl ::std::convert::From<usize> for $name {
            fn from(x: usize) -> Self {
                Self::new(x)
            }
        }

        impl ::std::convert::From<$name> for usize {
            fn from(x: $name) -> Self {
                x.index()
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    make_index!(TestIndex);

    #[test]
    fn new_and_index_round_trip() {
        let idx = TestIndex::new(42);
        assert_eq!(idx.index(), 42);
        assert_eq!(usize::from(idx), 42);
        assert_eq!(TestIndex::from(42_usize), idx);
    }

    #[test]
    fn invalid_is_default() {
        assert_eq!(TestIndex::default(), TestIndex::invalid());
        assert!(!TestIndex::default().is_valid());
        assert!(TestIndex::new(0).is_valid());
    }

    #[test]
    fn display() {
        assert_eq!(TestIndex::new(7).to_string(), "7");
    }
}
