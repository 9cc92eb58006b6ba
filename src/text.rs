//! Line-oriented text form of sequence elements.
//!
//! File sinks and the process bridge only accept element types that can be
//! turned into a single line of text. Integers go through `itoa`, floats
//! through `ryu`, so serialization allocates once per element at most.

use memchr::memchr2;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

/// Deterministic single-line text form of a value.
///
/// The returned text must not contain `\n` or `\r`; sinks reject elements
/// that do (see [`contains_line_break`]).
pub trait ToLine {
    fn to_line(&self) -> Cow<'_, str>;
}

/// True if `text` contains a line feed or carriage return.
#[inline]
pub fn contains_line_break(text: &str) -> bool {
    memchr2(b'\n', b'\r', text.as_bytes()).is_some()
}

impl ToLine for str {
    fn to_line(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

impl ToLine for String {
    fn to_line(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.as_str())
    }
}

impl ToLine for Cow<'_, str> {
    fn to_line(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.as_ref())
    }
}

impl ToLine for char {
    fn to_line(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }
}

impl ToLine for bool {
    fn to_line(&self) -> Cow<'_, str> {
        Cow::Borrowed(if *self { "true" } else { "false" })
    }
}

impl ToLine for Path {
    fn to_line(&self) -> Cow<'_, str> {
        self.to_string_lossy()
    }
}

impl ToLine for PathBuf {
    fn to_line(&self) -> Cow<'_, str> {
        self.to_string_lossy()
    }
}

impl<T: ToLine + ?Sized> ToLine for &T {
    fn to_line(&self) -> Cow<'_, str> {
        (**self).to_line()
    }
}

impl<T: ToLine + ?Sized> ToLine for Box<T> {
    fn to_line(&self) -> Cow<'_, str> {
        (**self).to_line()
    }
}

impl<T: ToLine + ?Sized> ToLine for Rc<T> {
    fn to_line(&self) -> Cow<'_, str> {
        (**self).to_line()
    }
}

impl<T: ToLine + ?Sized> ToLine for Arc<T> {
    fn to_line(&self) -> Cow<'_, str> {
        (**self).to_line()
    }
}

macro_rules! impl_to_line_int {
    ($($t:ty),*) => {
        $(
            impl ToLine for $t {
                #[inline]
                fn to_line(&self) -> Cow<'_, str> {
                    Cow::Owned(itoa::Buffer::new().format(*self).to_owned())
                }
            }
        )*
    };
}

impl_to_line_int!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);

macro_rules! impl_to_line_float {
    ($($t:ty),*) => {
        $(
            impl ToLine for $t {
                #[inline]
                fn to_line(&self) -> Cow<'_, str> {
                    Cow::Owned(ryu::Buffer::new().format(*self).to_owned())
                }
            }
        )*
    };
}

impl_to_line_float!(f32, f64);
