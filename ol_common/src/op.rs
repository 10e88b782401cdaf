/// Implements the standard arithmetic operator traits for a single-field newtype.
///
/// Three forms are supported:
/// * `op!(binary Wrapper, Add, add)` for `Wrapper ⊕ Wrapper -> Wrapper`,
/// * `op!(inplace Wrapper, AddAssign, add_assign)` for `Wrapper ⊕= Wrapper`,
/// * `op!(unary Wrapper, Neg, neg)` for `⊖Wrapper -> Wrapper`.
#[macro_export]
macro_rules! op {
    (binary $type:ty, $trait:ident, $method:ident) => {
        impl std::ops::$trait for $type {
            type Output = Self;

            fn $method(self, rhs: Self) -> Self::Output {
                Self(std::ops::$trait::$method(self.0, rhs.0))
            }
        }
    };
    (inplace $type:ty, $trait:ident, $method:ident) => {
        impl std::ops::$trait for $type {
            fn $method(&mut self, rhs: Self) {
                std::ops::$trait::$method(&mut self.0, rhs.0)
            }
        }
    };
    (unary $type:ty, $trait:ident, $method:ident) => {
        impl std::ops::$trait for $type {
            type Output = Self;

            fn $method(self) -> Self::Output {
                Self(std::ops::$trait::$method(self.0))
            }
        }
    };
}
