use std::fmt;
use std::iter::FromIterator;
use std::ops;

/// A single CSV row.
///
/// Every field is stored contiguously in one `String`, alongside the end
/// offset of each field. Reading many rows into the same `Row` therefore
/// reuses the same two allocations.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct Row {
    /// All fields in this row, stored contiguously.
    fields: String,
    /// The ending offset of each field in `fields`. Guaranteed to fall on
    /// character boundaries.
    ends: Vec<usize>,
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let fields: Vec<&str> = self.iter().collect();
        write!(f, "Row({:?})", fields)
    }
}

impl Row {
    /// Create a new empty `Row`.
    pub fn new() -> Row {
        Row::default()
    }

    /// Create a new empty `Row` with room for `buffer` bytes of field data
    /// and `fields` fields.
    pub fn with_capacity(buffer: usize, fields: usize) -> Row {
        Row {
            fields: String::with_capacity(buffer),
            ends: Vec::with_capacity(fields),
        }
    }

    /// Returns the number of fields in this row.
    pub fn len(&self) -> usize {
        self.ends.len()
    }

    /// Returns true if and only if this row has no fields.
    ///
    /// A row read from CSV data always has at least one field. An empty line
    /// is a row with one empty field.
    pub fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }

    /// Return the field at index `i`.
    ///
    /// If no field at index `i` exists, then this returns `None`.
    pub fn get(&self, i: usize) -> Option<&str> {
        let end = *self.ends.get(i)?;
        let start = if i == 0 { 0 } else { self.ends[i - 1] };
        Some(&self.fields[start..end])
    }

    /// Returns an iterator over all fields in this row.
    pub fn iter(&self) -> RowIter<'_> {
        self.into_iter()
    }

    /// Clear this row so that it has zero fields.
    ///
    /// The allocations are kept.
    pub fn clear(&mut self) {
        self.fields.clear();
        self.ends.clear();
    }

    /// Add a new field to this row.
    pub fn push_field(&mut self, field: &str) {
        self.fields.push_str(field);
        self.ends.push(self.fields.len());
    }

    /// Return the text of every field in this row, concatenated.
    pub fn as_slice(&self) -> &str {
        &self.fields
    }

    /// The raw parts that the row assembler appends to.
    pub(crate) fn as_parts(&mut self) -> (&mut String, &mut Vec<usize>) {
        (&mut self.fields, &mut self.ends)
    }
}

impl ops::Index<usize> for Row {
    type Output = str;

    fn index(&self, i: usize) -> &str {
        match self.get(i) {
            Some(field) => field,
            None => panic!(
                "index out of bounds: the row has {} fields but the index \
                 is {}",
                self.len(),
                i
            ),
        }
    }
}

impl<T: AsRef<str>> From<Vec<T>> for Row {
    fn from(xs: Vec<T>) -> Row {
        Row::from_iter(xs)
    }
}

impl<'a, T: AsRef<str>> From<&'a [T]> for Row {
    fn from(xs: &'a [T]) -> Row {
        Row::from_iter(xs)
    }
}

impl<T: AsRef<str>> FromIterator<T> for Row {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Row {
        let mut row = Row::new();
        row.extend(iter);
        row
    }
}

impl<T: AsRef<str>> Extend<T> for Row {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for x in iter {
            self.push_field(x.as_ref());
        }
    }
}

impl<T: AsRef<str>> PartialEq<Vec<T>> for Row {
    fn eq(&self, other: &Vec<T>) -> bool {
        self == other.as_slice()
    }
}

impl<T: AsRef<str>> PartialEq<[T]> for Row {
    fn eq(&self, other: &[T]) -> bool {
        self.len() == other.len()
            && self.iter().zip(other).all(|(a, b)| a == b.as_ref())
    }
}

impl<'a, T: AsRef<str>> PartialEq<&'a [T]> for Row {
    fn eq(&self, other: &&'a [T]) -> bool {
        self == *other
    }
}

/// A double-ended iterator over the fields in a row.
///
/// The `'r` lifetime variable refers to the lifetime of the `Row` that is
/// being iterated over.
#[derive(Clone, Debug)]
pub struct RowIter<'r> {
    row: &'r Row,
    /// The start of the next field yielded by `next`.
    last_start: usize,
    front: usize,
    back: usize,
}

impl<'r> IntoIterator for &'r Row {
    type IntoIter = RowIter<'r>;
    type Item = &'r str;

    fn into_iter(self) -> RowIter<'r> {
        RowIter { row: self, last_start: 0, front: 0, back: self.len() }
    }
}

impl<'r> Iterator for RowIter<'r> {
    type Item = &'r str;

    fn next(&mut self) -> Option<&'r str> {
        if self.front == self.back {
            return None;
        }
        let end = self.row.ends[self.front];
        let field = &self.row.fields[self.last_start..end];
        self.last_start = end;
        self.front += 1;
        Some(field)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.back - self.front;
        (n, Some(n))
    }

    fn count(self) -> usize {
        self.len()
    }
}

impl<'r> DoubleEndedIterator for RowIter<'r> {
    fn next_back(&mut self) -> Option<&'r str> {
        if self.front == self.back {
            return None;
        }
        self.back -= 1;
        self.row.get(self.back)
    }
}

impl<'r> ExactSizeIterator for RowIter<'r> {}

#[cfg(feature = "serde")]
impl serde::Serialize for Row {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeSeq;

        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for field in self {
            seq.serialize_element(field)?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::Row;

    #[test]
    fn push_and_get() {
        let mut row = Row::new();
        row.push_field("foo");
        row.push_field("");
        row.push_field("quux");
        assert_eq!(row.len(), 3);
        assert_eq!(row.get(0), Some("foo"));
        assert_eq!(row.get(1), Some(""));
        assert_eq!(row.get(2), Some("quux"));
        assert_eq!(row.get(3), None);
        assert_eq!(&row[2], "quux");
        assert_eq!(row.as_slice(), "fooquux");
    }

    #[test]
    fn clear_keeps_nothing() {
        let mut row = Row::from(vec!["a", "b"]);
        row.clear();
        assert!(row.is_empty());
        assert_eq!(row.get(0), None);
        row.push_field("c");
        assert_eq!(row, vec!["c"]);
    }

    #[test]
    fn iter_both_ends() {
        let row = Row::from(vec!["1", "22", "333"]);
        let fwd: Vec<&str> = row.iter().collect();
        assert_eq!(fwd, vec!["1", "22", "333"]);
        let rev: Vec<&str> = row.iter().rev().collect();
        assert_eq!(rev, vec!["333", "22", "1"]);

        let mut it = row.iter();
        assert_eq!(it.len(), 3);
        assert_eq!(it.next(), Some("1"));
        assert_eq!(it.next_back(), Some("333"));
        assert_eq!(it.next(), Some("22"));
        assert_eq!(it.next(), None);
        assert_eq!(it.next_back(), None);
    }

    #[test]
    fn equality_with_slices() {
        let row: Row = vec!["a", "b"].into_iter().collect();
        assert_eq!(row, vec!["a", "b"]);
        assert_eq!(row, vec![String::from("a"), String::from("b")]);
        assert_eq!(row, &["a", "b"][..]);
        assert!(row != vec!["a"]);
        assert!(row != vec!["a", "c"]);
        // Same text, different boundaries.
        assert!(Row::from(vec!["ab", ""]) != Row::from(vec!["a", "b"]));
    }

    #[test]
    fn debug_lists_fields() {
        let row = Row::from(vec!["a", "b,c"]);
        assert_eq!(format!("{:?}", row), "Row([\"a\", \"b,c\"])");
    }

    #[test]
    #[should_panic]
    fn index_out_of_bounds() {
        let row = Row::from(vec!["a"]);
        let _ = &row[1];
    }
}
