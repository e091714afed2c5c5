use std::fmt::Display;

/// Error types buildable from a bare message.
///
/// Implement it for a crate's error, then call [`impl_context!`](crate::impl_context)
/// next to it to get `.context()` / `.with_context()` on `Result` and `Option`.
pub trait FromMessage: Sized {
    fn from_message(message: String) -> Self;
}

#[doc(hidden)]
pub fn prefixed<E: FromMessage>(context: String, source: impl Display) -> E {
    E::from_message(format!("{context}: {source}"))
}

/// Defines a crate-local `Context` trait over that crate's `Error` and
/// `Result<T>`.
///
/// ```ignore
/// // crates/foo/src/error.rs
/// impl tollgate_common::FromMessage for Error { /* ... */ }
/// tollgate_common::impl_context!();
/// ```
#[macro_export]
macro_rules! impl_context {
    () => {
        pub trait Context<T>: Sized {
            fn with_context<C: Into<String>>(self, f: impl FnOnce() -> C) -> Result<T>;

            fn context(self, context: impl Into<String>) -> Result<T> {
                let context = context.into();
                self.with_context(move || context)
            }
        }

        impl<T, E: ::std::fmt::Display> Context<T> for ::std::result::Result<T, E> {
            fn with_context<C: Into<String>>(self, f: impl FnOnce() -> C) -> Result<T> {
                self.map_err(|source| $crate::context::prefixed(f().into(), source))
            }
        }

        impl<T> Context<T> for Option<T> {
            fn with_context<C: Into<String>>(self, f: impl FnOnce() -> C) -> Result<T> {
                self.ok_or_else(|| <Error as $crate::FromMessage>::from_message(f().into()))
            }
        }
    };
}
