/*!
The `fastcsv` crate provides a streaming CSV reader and a buffered,
always-quoting CSV writer.

# Brief overview

The primary types in this crate are [`Reader`](struct.Reader.html) and
[`Writer`](struct.Writer.html), for reading and writing CSV data
respectively. Both work on text streams: a reader pulls text from a
[`Source`](stream/trait.Source.html) and a writer pushes text into a
[`Sink`](stream/trait.Sink.html). Adapters exist for in-memory strings and
for any `std::io::Read` or `std::io::Write`, which covers files, sockets
and standard I/O.

The dialect is fixed: cells are separated by `,` and may be quoted with
`"`. Inside a quoted cell a doubled quote stands for one quote, and
separators and line endings are literal. By default a reader accepts
`\r`, `\n` and `\r\n` as line endings. It can be restricted to exactly one of
them with [`ReaderBuilder::newline`](struct.ReaderBuilder.html#method.newline).

A writer quotes every cell and ends every row with `\r\n` unless
configured otherwise. Values are converted to cells with the
[`ToCell`](trait.ToCell.html) trait, which is implemented for strings,
numbers, booleans and `Option` (where `None` is written as an empty quoted
cell). With the `serde` feature (enabled by default), whole structs and
tuples can be written as rows with
[`Writer::serialize`](struct.Writer.html#method.serialize).

The state machines that do the actual parsing and escaping live in the
[`fastcsv-core`](https://docs.rs/fastcsv-core) crate, which does no I/O and
can be used on its own.

# Example

This example shows how to read CSV data from stdin and print each row to
stdout.

```no_run
use std::error::Error;
use std::io;
use std::process;

fn example() -> Result<(), Box<dyn Error>> {
    // Build the CSV reader and iterate over each row.
    let mut rdr = fastcsv::Reader::from_reader(io::stdin());
    for result in rdr.rows() {
        // The iterator yields Result<Row, Error>, so we check the
        // error here.
        let row = result?;
        println!("{:?}", row);
    }
    Ok(())
}

fn main() {
    if let Err(err) = example() {
        println!("error running example: {}", err);
        process::exit(1);
    }
}
```

# Example: scoped writing

A writer entered with `enter` is flushed and its sink is closed when the
scope ends.

```
use fastcsv::Writer;

# fn main() { example().unwrap(); }
fn example() -> fastcsv::Result<()> {
    let mut out = String::new();
    let mut wtr = Writer::from_sink(&mut out);
    {
        let mut scope = wtr.enter()?;
        scope.write_row(&["a", "b,c"])?;
        scope.write_row(vec![Some("x"), None])?;
    }
    drop(wtr);
    assert_eq!(out, "\"a\",\"b,c\"\r\n\"x\",\"\"\r\n");
    Ok(())
}
```
*/

#![deny(missing_docs)]

pub use fastcsv_core::{
    InvalidNewline, NewlineMode, ParseError, QuoteStyle, WriteError,
};

pub use crate::cell::{Cell, ToCell};
pub use crate::error::{Error, IntoInnerError, Result};
pub use crate::reader::{
    Position, Reader, ReaderBuilder, RowsIntoIter, RowsIter,
};
pub use crate::row::{Row, RowIter};
pub use crate::scope::{Scope, Scoped};
pub use crate::stream::{IoSink, IoSource, Sink, Source, StrSource};
pub use crate::writer::{Writer, WriterBuilder};

mod buffered;
mod cell;
mod error;
mod reader;
mod row;
mod scope;
#[cfg(feature = "serde")]
mod serializer;
pub mod stream;
mod writer;
