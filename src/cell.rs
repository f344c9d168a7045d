use std::borrow::Cow;
use std::str;

use bstr::ByteSlice;

use crate::error::{Error, Result};

/// A value that can be written as one CSV cell.
///
/// A cell is either text or null. Null is written as an empty quoted field,
/// which reads back as an empty string.
///
/// Implementations hand the cell's text to a callback rather than returning
/// it, so numbers can be formatted on the stack.
pub trait ToCell {
    /// Call `f` with the text of this cell, or `None` for null.
    fn with_cell<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(Option<&str>) -> Result<T>;
}

/// A dynamically typed cell, for rows whose values are not all of the same
/// type.
///
/// ```
/// use fastcsv::{Cell, Writer};
///
/// let mut wtr = Writer::from_sink(String::new());
/// wtr.write_row(&[Cell::from("a"), Cell::from(1), Cell::Null]).unwrap();
/// assert_eq!(wtr.into_inner().unwrap(), "\"a\",\"1\",\"\"\r\n");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Cell<'a> {
    /// The null marker.
    Null,
    /// Text, written as is.
    Text(Cow<'a, str>),
    /// Bytes, which must be valid UTF-8.
    Bytes(Cow<'a, [u8]>),
    /// A boolean, written as `true` or `false`.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// An unsigned integer.
    Uint(u64),
    /// A floating point number.
    Float(f64),
}

impl<'a> ToCell for Cell<'a> {
    fn with_cell<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(Option<&str>) -> Result<T>,
    {
        match *self {
            Cell::Null => f(None),
            Cell::Text(ref s) => s.with_cell(f),
            Cell::Bytes(ref b) => b.with_cell(f),
            Cell::Bool(b) => b.with_cell(f),
            Cell::Int(n) => n.with_cell(f),
            Cell::Uint(n) => n.with_cell(f),
            Cell::Float(n) => n.with_cell(f),
        }
    }
}

impl<'a> From<&'a str> for Cell<'a> {
    fn from(s: &'a str) -> Cell<'a> {
        Cell::Text(Cow::Borrowed(s))
    }
}

impl<'a> From<String> for Cell<'a> {
    fn from(s: String) -> Cell<'a> {
        Cell::Text(Cow::Owned(s))
    }
}

impl<'a> From<&'a [u8]> for Cell<'a> {
    fn from(b: &'a [u8]) -> Cell<'a> {
        Cell::Bytes(Cow::Borrowed(b))
    }
}

impl<'a> From<Vec<u8>> for Cell<'a> {
    fn from(b: Vec<u8>) -> Cell<'a> {
        Cell::Bytes(Cow::Owned(b))
    }
}

impl<'a> From<bool> for Cell<'a> {
    fn from(b: bool) -> Cell<'a> {
        Cell::Bool(b)
    }
}

impl<'a> From<f64> for Cell<'a> {
    fn from(n: f64) -> Cell<'a> {
        Cell::Float(n)
    }
}

impl<'a, T: Into<Cell<'a>>> From<Option<T>> for Cell<'a> {
    fn from(v: Option<T>) -> Cell<'a> {
        v.map_or(Cell::Null, Into::into)
    }
}

macro_rules! cell_from_int {
    ($variant:ident, $wide:ty, $($ty:ty),*) => {
        $(
            impl<'a> From<$ty> for Cell<'a> {
                fn from(n: $ty) -> Cell<'a> {
                    Cell::$variant(<$wide>::from(n))
                }
            }
        )*
    };
}

cell_from_int!(Int, i64, i8, i16, i32, i64);
cell_from_int!(Uint, u64, u8, u16, u32, u64);

impl ToCell for str {
    fn with_cell<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(Option<&str>) -> Result<T>,
    {
        f(Some(self))
    }
}

impl ToCell for String {
    fn with_cell<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(Option<&str>) -> Result<T>,
    {
        f(Some(self.as_str()))
    }
}

impl<'a> ToCell for Cow<'a, str> {
    fn with_cell<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(Option<&str>) -> Result<T>,
    {
        f(Some(&**self))
    }
}

impl ToCell for [u8] {
    fn with_cell<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(Option<&str>) -> Result<T>,
    {
        match str::from_utf8(self) {
            Ok(s) => f(Some(s)),
            Err(err) => Err(Error::InvalidValue(format!(
                "cell {:?} is not valid UTF-8 (valid up to byte {})",
                self.as_bstr(),
                err.valid_up_to()
            ))),
        }
    }
}

impl ToCell for Vec<u8> {
    fn with_cell<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(Option<&str>) -> Result<T>,
    {
        self.as_slice().with_cell(f)
    }
}

impl<'a> ToCell for Cow<'a, [u8]> {
    fn with_cell<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(Option<&str>) -> Result<T>,
    {
        (**self).with_cell(f)
    }
}

impl ToCell for char {
    fn with_cell<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(Option<&str>) -> Result<T>,
    {
        let mut buf = [0; 4];
        f(Some(self.encode_utf8(&mut buf)))
    }
}

impl ToCell for bool {
    fn with_cell<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(Option<&str>) -> Result<T>,
    {
        f(Some(if *self { "true" } else { "false" }))
    }
}

macro_rules! int_to_cell {
    ($($ty:ty),*) => {
        $(
            impl ToCell for $ty {
                fn with_cell<T, F>(&self, f: F) -> Result<T>
                where
                    F: FnOnce(Option<&str>) -> Result<T>,
                {
                    let mut buf = itoa::Buffer::new();
                    f(Some(buf.format(*self)))
                }
            }
        )*
    };
}

int_to_cell!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

macro_rules! float_to_cell {
    ($($ty:ty),*) => {
        $(
            impl ToCell for $ty {
                fn with_cell<T, F>(&self, f: F) -> Result<T>
                where
                    F: FnOnce(Option<&str>) -> Result<T>,
                {
                    let mut buf = ryu::Buffer::new();
                    f(Some(buf.format(*self)))
                }
            }
        )*
    };
}

float_to_cell!(f32, f64);

impl<C: ToCell> ToCell for Option<C> {
    fn with_cell<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(Option<&str>) -> Result<T>,
    {
        match *self {
            None => f(None),
            Some(ref v) => v.with_cell(f),
        }
    }
}

impl<'c, C: ToCell + ?Sized> ToCell for &'c C {
    fn with_cell<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(Option<&str>) -> Result<T>,
    {
        (**self).with_cell(f)
    }
}

impl<C: ToCell + ?Sized> ToCell for Box<C> {
    fn with_cell<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(Option<&str>) -> Result<T>,
    {
        (**self).with_cell(f)
    }
}
