//! Conversion of arguments and results to the JSON held by the cache.
//!
//! `serde_json` writes NaN and the infinities as `null`, which would make
//! `f(inf)` and `f(-inf)` share a key and would not decode back into a float.
//! Values are walked once before conversion and rejected if they hold a
//! non-finite float anywhere.

use std::fmt;

use serde::ser;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Reason a value cannot be held as cache JSON.
#[derive(Debug, Error)]
#[error("{0}")]
pub(crate) struct Uncapturable(String);

impl ser::Error for Uncapturable {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Uncapturable(msg.to_string())
    }
}

/// Converts `value` to JSON, refusing non-finite floats.
pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Value, Uncapturable> {
    value.serialize(FiniteFloats)?;
    serde_json::to_value(value).map_err(|e| Uncapturable(e.to_string()))
}

/// Serializer that produces nothing and fails on the first non-finite float.
#[derive(Clone, Copy)]
struct FiniteFloats;

fn check_float(v: f64) -> Result<(), Uncapturable> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(Uncapturable(format!(
            "non-finite float {v} has no JSON representation"
        )))
    }
}

impl ser::Serializer for FiniteFloats {
    type Ok = ();
    type Error = Uncapturable;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    fn serialize_bool(self, _: bool) -> Result<(), Uncapturable> {
        Ok(())
    }

    fn serialize_i8(self, _: i8) -> Result<(), Uncapturable> {
        Ok(())
    }

    fn serialize_i16(self, _: i16) -> Result<(), Uncapturable> {
        Ok(())
    }

    fn serialize_i32(self, _: i32) -> Result<(), Uncapturable> {
        Ok(())
    }

    fn serialize_i64(self, _: i64) -> Result<(), Uncapturable> {
        Ok(())
    }

    fn serialize_i128(self, _: i128) -> Result<(), Uncapturable> {
        Ok(())
    }

    fn serialize_u8(self, _: u8) -> Result<(), Uncapturable> {
        Ok(())
    }

    fn serialize_u16(self, _: u16) -> Result<(), Uncapturable> {
        Ok(())
    }

    fn serialize_u32(self, _: u32) -> Result<(), Uncapturable> {
        Ok(())
    }

    fn serialize_u64(self, _: u64) -> Result<(), Uncapturable> {
        Ok(())
    }

    fn serialize_u128(self, _: u128) -> Result<(), Uncapturable> {
        Ok(())
    }

    fn serialize_f32(self, v: f32) -> Result<(), Uncapturable> {
        check_float(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<(), Uncapturable> {
        check_float(v)
    }

    fn serialize_char(self, _: char) -> Result<(), Uncapturable> {
        Ok(())
    }

    fn serialize_str(self, _: &str) -> Result<(), Uncapturable> {
        Ok(())
    }

    fn serialize_bytes(self, _: &[u8]) -> Result<(), Uncapturable> {
        Ok(())
    }

    fn serialize_none(self) -> Result<(), Uncapturable> {
        Ok(())
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<(), Uncapturable> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<(), Uncapturable> {
        Ok(())
    }

    fn serialize_unit_struct(self, _: &'static str) -> Result<(), Uncapturable> {
        Ok(())
    }

    fn serialize_unit_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
    ) -> Result<(), Uncapturable> {
        Ok(())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _: &'static str,
        value: &T,
    ) -> Result<(), Uncapturable> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        value: &T,
    ) -> Result<(), Uncapturable> {
        value.serialize(self)
    }

    fn serialize_seq(self, _: Option<usize>) -> Result<Self, Uncapturable> {
        Ok(self)
    }

    fn serialize_tuple(self, _: usize) -> Result<Self, Uncapturable> {
        Ok(self)
    }

    fn serialize_tuple_struct(self, _: &'static str, _: usize) -> Result<Self, Uncapturable> {
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self, Uncapturable> {
        Ok(self)
    }

    fn serialize_map(self, _: Option<usize>) -> Result<Self, Uncapturable> {
        Ok(self)
    }

    fn serialize_struct(self, _: &'static str, _: usize) -> Result<Self, Uncapturable> {
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self, Uncapturable> {
        Ok(self)
    }
}

impl ser::SerializeSeq for FiniteFloats {
    type Ok = ();
    type Error = Uncapturable;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Uncapturable> {
        value.serialize(*self)
    }

    fn end(self) -> Result<(), Uncapturable> {
        Ok(())
    }
}

impl ser::SerializeTuple for FiniteFloats {
    type Ok = ();
    type Error = Uncapturable;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Uncapturable> {
        value.serialize(*self)
    }

    fn end(self) -> Result<(), Uncapturable> {
        Ok(())
    }
}

impl ser::SerializeTupleStruct for FiniteFloats {
    type Ok = ();
    type Error = Uncapturable;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Uncapturable> {
        value.serialize(*self)
    }

    fn end(self) -> Result<(), Uncapturable> {
        Ok(())
    }
}

impl ser::SerializeTupleVariant for FiniteFloats {
    type Ok = ();
    type Error = Uncapturable;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Uncapturable> {
        value.serialize(*self)
    }

    fn end(self) -> Result<(), Uncapturable> {
        Ok(())
    }
}

impl ser::SerializeMap for FiniteFloats {
    type Ok = ();
    type Error = Uncapturable;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), Uncapturable> {
        key.serialize(*self)
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Uncapturable> {
        value.serialize(*self)
    }

    fn end(self) -> Result<(), Uncapturable> {
        Ok(())
    }
}

impl ser::SerializeStruct for FiniteFloats {
    type Ok = ();
    type Error = Uncapturable;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        _: &'static str,
        value: &T,
    ) -> Result<(), Uncapturable> {
        value.serialize(*self)
    }

    fn end(self) -> Result<(), Uncapturable> {
        Ok(())
    }
}

impl ser::SerializeStructVariant for FiniteFloats {
    type Ok = ();
    type Error = Uncapturable;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        _: &'static str,
        value: &T,
    ) -> Result<(), Uncapturable> {
        value.serialize(*self)
    }

    fn end(self) -> Result<(), Uncapturable> {
        Ok(())
    }
}
