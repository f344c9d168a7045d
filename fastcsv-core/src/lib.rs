/*!
`fastcsv-core` provides the two state machines at the heart of `fastcsv`: a
push based row assembler for reading CSV text and a cell escaper for writing
it.

Neither machine does any I/O. The reader is handed slices of already decoded
text and reports how much of each slice it consumed; the writer hands back the
pieces of text that make up an escaped cell. Buffering, refilling and flushing
are the caller's job (the `fastcsv` crate does all of that for you).

# Example: reading

```
use fastcsv_core::{ReadRowResult, Reader};

let mut rdr = Reader::new();
let (mut fields, mut ends) = (String::new(), Vec::new());

let (res, nin) = rdr.read_row("a,\"b,c\"\r\nrest", &mut fields, &mut ends)
    .unwrap();
assert_eq!(res, ReadRowResult::Row);
assert_eq!(nin, 9);
assert_eq!(fields, "ab,c");
assert_eq!(ends, vec![1, 4]);
```

# Example: writing

```
use fastcsv_core::Writer;

let mut wtr = Writer::new();
let mut out = String::new();

wtr.start_row().unwrap();
for piece in wtr.field(Some("a")) {
    out.push_str(piece);
}
for piece in wtr.field(Some("say \"hi\"")) {
    out.push_str(piece);
}
for piece in wtr.field(None) {
    out.push_str(piece);
}
wtr.end_row();
assert_eq!(out, "\"a\",\"say \"\"hi\"\"\",\"\"");
```
*/

#![deny(missing_docs)]

pub use crate::reader::{
    seek, BreakReason, InvalidNewline, NewlineMode, ParseError,
    ReadRowResult, Reader, ReaderBuilder, Seek,
};
pub use crate::writer::{Field, QuoteStyle, WriteError, Writer, WriterBuilder};

mod reader;
mod writer;
