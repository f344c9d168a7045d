use std::fmt;

use serde::ser::{
    Error as SerdeError, Impossible, Serialize, SerializeSeq,
    SerializeStruct, SerializeTuple, SerializeTupleStruct, Serializer,
};

use crate::cell::ToCell;
use crate::error::Error;
use crate::stream::Sink;
use crate::writer::Writer;

/// Serialize the given value as the fields of one row.
///
/// The caller is responsible for starting and ending the row.
pub fn serialize<S: ?Sized + Serialize, K: Sink>(
    wtr: &mut Writer<K>,
    value: &S,
) -> Result<(), Error> {
    value.serialize(&mut SeRow { wtr })
}

/// The top level serializer. Compound values become a row, scalars become
/// a row with a single field.
struct SeRow<'w, K: 'w> {
    wtr: &'w mut Writer<K>,
}

/// The serializer for a single field. Only scalars are accepted.
struct SeField<'a, K: 'a> {
    wtr: &'a mut Writer<K>,
}

impl<'a, K: Sink> SeField<'a, K> {
    fn new(wtr: &'a mut Writer<K>) -> SeField<'a, K> {
        SeField { wtr }
    }

    fn cell<C: ToCell + ?Sized>(self, value: &C) -> Result<(), Error> {
        let wtr = self.wtr;
        value.with_cell(|cell| wtr.write_cell(cell))
    }
}

fn nested(what: &str) -> Error {
    Error::custom(format!("cannot serialize {} as a CSV field", what))
}

macro_rules! scalars {
    ($($method:ident($ty:ty)),*) => {
        $(
            fn $method(self, v: $ty) -> Result<(), Error> {
                self.cell(&v)
            }
        )*
    };
}

macro_rules! forward_scalars {
    ($($method:ident($ty:ty)),*) => {
        $(
            fn $method(self, v: $ty) -> Result<(), Error> {
                SeField::new(&mut *self.wtr).$method(v)
            }
        )*
    };
}

impl<'a, K: Sink> Serializer for SeField<'a, K> {
    type Ok = ();
    type Error = Error;
    type SerializeSeq = Impossible<(), Error>;
    type SerializeTuple = Impossible<(), Error>;
    type SerializeTupleStruct = Impossible<(), Error>;
    type SerializeTupleVariant = Impossible<(), Error>;
    type SerializeMap = Impossible<(), Error>;
    type SerializeStruct = Impossible<(), Error>;
    type SerializeStructVariant = Impossible<(), Error>;

    scalars! {
        serialize_bool(bool),
        serialize_i8(i8),
        serialize_i16(i16),
        serialize_i32(i32),
        serialize_i64(i64),
        serialize_u8(u8),
        serialize_u16(u16),
        serialize_u32(u32),
        serialize_u64(u64),
        serialize_f32(f32),
        serialize_f64(f64),
        serialize_char(char),
        serialize_str(&str),
        serialize_bytes(&[u8])
    }

    fn serialize_none(self) -> Result<(), Error> {
        self.cell(&None::<&str>)
    }

    fn serialize_some<T: ?Sized + Serialize>(
        self,
        value: &T,
    ) -> Result<(), Error> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<(), Error> {
        self.serialize_none()
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<(), Error> {
        self.cell(name)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<(), Error> {
        self.cell(variant)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), Error> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        value: &T,
    ) -> Result<(), Error> {
        value.serialize(self)
    }

    fn serialize_seq(
        self,
        _len: Option<usize>,
    ) -> Result<Self::SerializeSeq, Error> {
        Err(nested("a sequence"))
    }

    fn serialize_tuple(
        self,
        _len: usize,
    ) -> Result<Self::SerializeTuple, Error> {
        Err(nested("a tuple"))
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, Error> {
        Err(nested(&format!("tuple struct {}", name)))
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, Error> {
        Err(nested(&format!("enum tuple variant {}::{}", name, variant)))
    }

    fn serialize_map(
        self,
        _len: Option<usize>,
    ) -> Result<Self::SerializeMap, Error> {
        Err(nested("a map"))
    }

    fn serialize_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, Error> {
        Err(nested(&format!("struct {}", name)))
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Error> {
        Err(nested(&format!("enum struct variant {}::{}", name, variant)))
    }

    fn collect_str<T: ?Sized + fmt::Display>(
        self,
        value: &T,
    ) -> Result<(), Error> {
        self.cell(&value.to_string())
    }
}

impl<'a, 'w, K: Sink> Serializer for &'a mut SeRow<'w, K> {
    type Ok = ();
    type Error = Error;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Impossible<(), Error>;
    type SerializeMap = Impossible<(), Error>;
    type SerializeStruct = Self;
    type SerializeStructVariant = Impossible<(), Error>;

    forward_scalars! {
        serialize_bool(bool),
        serialize_i8(i8),
        serialize_i16(i16),
        serialize_i32(i32),
        serialize_i64(i64),
        serialize_u8(u8),
        serialize_u16(u16),
        serialize_u32(u32),
        serialize_u64(u64),
        serialize_f32(f32),
        serialize_f64(f64),
        serialize_char(char),
        serialize_str(&str),
        serialize_bytes(&[u8]),
        serialize_unit_struct(&'static str)
    }

    fn serialize_none(self) -> Result<(), Error> {
        SeField::new(&mut *self.wtr).serialize_none()
    }

    fn serialize_some<T: ?Sized + Serialize>(
        self,
        value: &T,
    ) -> Result<(), Error> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<(), Error> {
        self.serialize_none()
    }

    fn serialize_unit_variant(
        self,
        name: &'static str,
        variant_index: u32,
        variant: &'static str,
    ) -> Result<(), Error> {
        SeField::new(&mut *self.wtr).serialize_unit_variant(
            name,
            variant_index,
            variant,
        )
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), Error> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        value: &T,
    ) -> Result<(), Error> {
        value.serialize(self)
    }

    fn serialize_seq(
        self,
        _len: Option<usize>,
    ) -> Result<Self::SerializeSeq, Error> {
        Ok(self)
    }

    fn serialize_tuple(
        self,
        _len: usize,
    ) -> Result<Self::SerializeTuple, Error> {
        Ok(self)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, Error> {
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, Error> {
        Err(Error::custom(format!(
            "serializing enum tuple variant {}::{} is not supported",
            name, variant
        )))
    }

    fn serialize_map(
        self,
        _len: Option<usize>,
    ) -> Result<Self::SerializeMap, Error> {
        Err(Error::custom("serializing maps is not supported"))
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, Error> {
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Error> {
        Err(Error::custom(format!(
            "serializing enum struct variant {}::{} is not supported",
            name, variant
        )))
    }

    fn collect_str<T: ?Sized + fmt::Display>(
        self,
        value: &T,
    ) -> Result<(), Error> {
        SeField::new(&mut *self.wtr).collect_str(value)
    }
}

impl<'a, 'w, K: Sink> SerializeSeq for &'a mut SeRow<'w, K> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(
        &mut self,
        value: &T,
    ) -> Result<(), Error> {
        value.serialize(SeField::new(&mut *self.wtr))
    }

    fn end(self) -> Result<(), Error> {
        Ok(())
    }
}

impl<'a, 'w, K: Sink> SerializeTuple for &'a mut SeRow<'w, K> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(
        &mut self,
        value: &T,
    ) -> Result<(), Error> {
        value.serialize(SeField::new(&mut *self.wtr))
    }

    fn end(self) -> Result<(), Error> {
        Ok(())
    }
}

impl<'a, 'w, K: Sink> SerializeTupleStruct for &'a mut SeRow<'w, K> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        value: &T,
    ) -> Result<(), Error> {
        value.serialize(SeField::new(&mut *self.wtr))
    }

    fn end(self) -> Result<(), Error> {
        Ok(())
    }
}

impl<'a, 'w, K: Sink> SerializeStruct for &'a mut SeRow<'w, K> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> Result<(), Error> {
        value.serialize(SeField::new(&mut *self.wtr))
    }

    fn end(self) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde::Serialize;

    use crate::error::Error;
    use crate::writer::Writer;

    fn ser<S: Serialize>(value: S) -> Result<String, Error> {
        let mut wtr = Writer::from_sink(String::new());
        wtr.serialize(value)?;
        Ok(wtr.into_inner().unwrap())
    }

    fn ser_err<S: Serialize>(value: S) -> String {
        match ser(value) {
            Err(Error::InvalidValue(msg)) => msg,
            res => panic!("unexpected result: {:?}", res),
        }
    }

    #[derive(Serialize)]
    struct Flat {
        name: String,
        count: u32,
        ratio: f64,
        ok: bool,
        note: Option<String>,
    }

    #[derive(Serialize)]
    enum Color {
        Red,
        Custom(String),
        Rgb(u8, u8, u8),
        Named { name: String },
    }

    #[test]
    fn struct_is_a_row() {
        let got = ser(Flat {
            name: "a\"b".to_string(),
            count: 3,
            ratio: 0.5,
            ok: true,
            note: None,
        })
        .unwrap();
        assert_eq!(got, "\"a\"\"b\",\"3\",\"0.5\",\"true\",\"\"\r\n");
    }

    #[test]
    fn tuples_and_sequences() {
        assert_eq!(ser(("x", 1i8, 'c')).unwrap(), "\"x\",\"1\",\"c\"\r\n");
        assert_eq!(ser(vec![1u64, 2, 3]).unwrap(), "\"1\",\"2\",\"3\"\r\n");
        assert_eq!(ser(Vec::<u8>::new()).unwrap(), "\r\n");
    }

    #[test]
    fn scalars_are_one_field_rows() {
        assert_eq!(ser("solo").unwrap(), "\"solo\"\r\n");
        assert_eq!(ser(42u16).unwrap(), "\"42\"\r\n");
        assert_eq!(ser(None::<i32>).unwrap(), "\"\"\r\n");
        assert_eq!(ser(()).unwrap(), "\"\"\r\n");
    }

    #[test]
    fn enums() {
        assert_eq!(ser(Color::Red).unwrap(), "\"Red\"\r\n");
        assert_eq!(
            ser(Color::Custom("teal".to_string())).unwrap(),
            "\"teal\"\r\n"
        );
        assert_eq!(
            ser((Color::Red, Color::Custom("x".to_string()))).unwrap(),
            "\"Red\",\"x\"\r\n"
        );
        ser_err(Color::Rgb(1, 2, 3));
        ser_err(Color::Named { name: "x".to_string() });
        ser_err((1, Color::Rgb(1, 2, 3)));
    }

    #[test]
    fn nested_compounds_fail() {
        let msg = ser_err(("a", vec![1, 2]));
        assert!(msg.contains("sequence"), "{}", msg);
        ser_err(vec![(1, 2)]);
        let mut map = std::collections::BTreeMap::new();
        map.insert("k", "v");
        ser_err(&map);
    }

    #[test]
    fn failed_row_leaves_nothing() {
        let mut wtr = Writer::from_sink(String::new());
        wtr.serialize(("keep", 1)).unwrap();
        assert!(wtr.serialize(("drop", vec![1])).is_err());
        wtr.serialize(("also", 2)).unwrap();
        assert_eq!(
            wtr.into_inner().unwrap(),
            "\"keep\",\"1\"\r\n\"also\",\"2\"\r\n"
        );
    }
}
