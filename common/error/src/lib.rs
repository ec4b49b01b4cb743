/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Declarative error enums with a stable `{PREFIX}{n}` code per variant,
//! `Display`, and `std::error::Error::source` chaining. Every public error
//! type in this workspace is generated with [`domain_error`] rather than
//! hand-rolled, so error codes stay stable as variants are added.

use std::fmt;

/// Defines an error enum. Each variant declares a numeric code, a format
/// string, zero or more named fields used by the format string, and an
/// optional `(source: SomeError)` clause for chaining.
///
/// ```ignore
/// domain_error! {
///     pub MyError(domain = "My", prefix = "MY") {
///         NotFound(1, "could not find '{name}'.", name: String),
///         Io(2, "I/O failure.", (source: std::io::Error)),
///     }
/// }
/// ```
#[macro_export]
macro_rules! domain_error {
    (
        $vis:vis $name:ident (domain = $domain:literal, prefix = $prefix:literal) {
            $($variants:tt)*
        }
    ) => {
        $crate::__domain_error_munch! {
            vis = [$vis], name = [$name], domain = [$domain], prefix = [$prefix],
            enum_body = [], code_arms = [], display_arms = [], source_arms = [],
            rest = [ $($variants)* ]
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __domain_error_munch {
    (
        vis = [$vis:vis], name = [$name:ident], domain = [$domain:literal], prefix = [$prefix:literal],
        enum_body = [$($enum_body:tt)*], code_arms = [$($code_arms:tt)*],
        display_arms = [$($display_arms:tt)*], source_arms = [$($source_arms:tt)*],
        rest = []
    ) => {
        #[derive(Debug)]
        $vis enum $name {
            $($enum_body)*
        }

        impl $name {
            pub const DOMAIN: &'static str = $domain;

            pub fn code(&self) -> String {
                match self {
                    $($code_arms)*
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "[{}] ", self.code())?;
                match self {
                    $($display_arms)*
                }
            }
        }

        impl ::std::error::Error for $name {
            fn source(&self) -> Option<&(dyn ::std::error::Error + 'static)> {
                match self {
                    $($source_arms)*
                }
            }
        }
    };

    // variant with fields and a chained source
    (
        vis = [$vis:vis], name = [$name:ident], domain = [$domain:literal], prefix = [$prefix:literal],
        enum_body = [$($enum_body:tt)*], code_arms = [$($code_arms:tt)*],
        display_arms = [$($display_arms:tt)*], source_arms = [$($source_arms:tt)*],
        rest = [ $variant:ident ( $code:literal, $fmt:literal $(, $field:ident : $ftype:ty)* , ( source : $stype:ty ) ) $(, $($rest:tt)*)? ]
    ) => {
        $crate::__domain_error_munch! {
            vis = [$vis], name = [$name], domain = [$domain], prefix = [$prefix],
            enum_body = [ $($enum_body)* $variant { $($field: $ftype,)* source: $stype, }, ],
            code_arms = [ $($code_arms)* Self::$variant { .. } => format!("{}{}", $prefix, $code), ],
            display_arms = [ $($display_arms)*
                #[allow(unused_variables)]
                Self::$variant { $($field,)* source } => write!(f, concat!($fmt, " caused by: {source}") $(, $field = $field)*), ],
            source_arms = [ $($source_arms)* Self::$variant { source, .. } => Some(source), ],
            rest = [ $($($rest)*)? ]
        }
    };

    // variant with fields, no source
    (
        vis = [$vis:vis], name = [$name:ident], domain = [$domain:literal], prefix = [$prefix:literal],
        enum_body = [$($enum_body:tt)*], code_arms = [$($code_arms:tt)*],
        display_arms = [$($display_arms:tt)*], source_arms = [$($source_arms:tt)*],
        rest = [ $variant:ident ( $code:literal, $fmt:literal $(, $field:ident : $ftype:ty)* ) $(, $($rest:tt)*)? ]
    ) => {
        $crate::__domain_error_munch! {
            vis = [$vis], name = [$name], domain = [$domain], prefix = [$prefix],
            enum_body = [ $($enum_body)* $variant { $($field: $ftype,)* }, ],
            code_arms = [ $($code_arms)* Self::$variant { .. } => format!("{}{}", $prefix, $code), ],
            display_arms = [ $($display_arms)*
                #[allow(unused_variables)]
                Self::$variant { $($field,)* } => write!(f, $fmt $(, $field = $field)*), ],
            source_arms = [ $($source_arms)* Self::$variant { .. } => None, ],
            rest = [ $($($rest)*)? ]
        }
    };
}

/// Joins several instances of the same error into one `Display`/`Error`,
/// used by the validator to report every invariant violation found in a
/// single commit attempt instead of only the first.
#[derive(Debug)]
pub struct Aggregate<E> {
    pub failures: Vec<E>,
}

impl<E> Aggregate<E> {
    pub fn new(failures: Vec<E>) -> Self {
        Self { failures }
    }
}

impl<E: fmt::Display> fmt::Display for Aggregate<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} invariant violation(s):", self.failures.len())?;
        for failure in &self.failures {
            writeln!(f, "  - {failure}")?;
        }
        Ok(())
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for Aggregate<E> {}

#[cfg(test)]
mod tests {
    domain_error! {
        pub ExampleError(domain = "Example", prefix = "EX") {
            NotFound(1, "could not find '{name}'.", name: String),
            Conflict(2, "conflicting values '{a}' and '{b}'.", a: String, b: String),
            Io(3, "I/O failure.", (source: std::io::Error)),
            Unreachable(4, "this should never happen."),
        }
    }

    #[test]
    fn codes_are_stable() {
        let e = ExampleError::NotFound { name: "alice".to_string() };
        assert_eq!(e.code(), "EX1");
        assert_eq!(e.to_string(), "[EX1] could not find 'alice'.");
    }

    #[test]
    fn source_chains() {
        use std::error::Error;
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let e = ExampleError::Io { source: io };
        assert!(e.source().is_some());
    }

    #[test]
    fn aggregate_reports_all_failures() {
        let agg = Aggregate::new(vec![
            ExampleError::Unreachable {},
            ExampleError::Conflict { a: "x".to_string(), b: "y".to_string() },
        ]);
        let rendered = agg.to_string();
        assert!(rendered.contains("2 invariant violation"));
        assert!(rendered.contains("EX4"));
        assert!(rendered.contains("EX2"));
    }
}
