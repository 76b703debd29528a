use crate::{Error, Result, Value, truncate_long};
use rust_decimal::{Decimal, prelude::FromPrimitive, prelude::ToPrimitive};
use std::{any, borrow::Cow};
use time::{
    Date, PrimitiveDateTime, Time, format_description::well_known::Iso8601,
    macros::format_description,
};
use uuid::Uuid;

/// Convert both ways between Rust types and `Value` (plus simple parsing).
pub trait AsValue {
    /// Return a NULL equivalent variant for this type.
    fn as_empty_value() -> Value;
    /// Convert into owned `Value`.
    fn as_value(self) -> Value;
    /// Try to convert a dynamic `Value` into `Self`.
    fn try_from_value(value: Value) -> Result<Self>
    where
        Self: Sized;
    /// Parse a full string into `Self`.
    fn parse(input: impl AsRef<str>) -> Result<Self>
    where
        Self: Sized,
    {
        Err(Error::msg(format!(
            "Cannot parse '{}' as {} (the parse method is not implemented)",
            truncate_long!(input.as_ref()),
            any::type_name::<Self>()
        )))
    }
}

impl AsValue for Value {
    fn as_empty_value() -> Value {
        Value::Null
    }
    fn as_value(self) -> Value {
        self
    }
    fn try_from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

macro_rules! impl_as_integer {
    ($source:ty) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                Value::Int64(None)
            }
            fn as_value(self) -> Value {
                Value::Int64(Some(self as _))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                match value {
                    // SQL INTEGER becomes i64
                    Value::Int64(Some(v)) => <$source>::try_from(v).map_err(|_| {
                        Error::msg(format!(
                            "Value {v}: i64 is out of range for {}",
                            any::type_name::<Self>(),
                        ))
                    }),
                    Value::Boolean(Some(v)) => Ok(v as _),
                    Value::Float64(Some(v)) => {
                        if v.is_finite() && v.fract() == 0.0 {
                            return Self::try_from_value(Value::Int64(Some(v as _)));
                        }
                        Err(Error::msg(format!("Value {v}: f64 does not fit into a integer")))
                    }
                    Value::Decimal(Some(v)) => {
                        let error = Error::msg(format!(
                            "Value {v}: Decimal does not fit into {}",
                            any::type_name::<Self>(),
                        ));
                        if !v.is_integer() {
                            return Err(error.context("The value is not an integer"));
                        }
                        v.to_i64()
                            .and_then(|v| <$source>::try_from(v).ok())
                            .ok_or(error)
                    }
                    Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
                    _ => Err(Error::msg(format!(
                        "Cannot convert {value:?} to {}",
                        any::type_name::<Self>(),
                    ))),
                }
            }
            fn parse(input: impl AsRef<str>) -> Result<Self> {
                input.as_ref().trim().parse::<Self>().map_err(Into::into)
            }
        }
    };
}
impl_as_integer!(i8);
impl_as_integer!(i16);
impl_as_integer!(i32);
impl_as_integer!(i64);
impl_as_integer!(isize);
impl_as_integer!(u8);
impl_as_integer!(u16);
impl_as_integer!(u32);

impl AsValue for u64 {
    fn as_empty_value() -> Value {
        Value::Int64(None)
    }
    fn as_value(self) -> Value {
        match i64::try_from(self) {
            Ok(v) => Value::Int64(Some(v)),
            Err(..) => Value::Decimal(Some(Decimal::from(self))),
        }
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Int64(Some(v)) => u64::try_from(v)
                .map_err(|_| Error::msg(format!("Value {v}: i64 is out of range for u64"))),
            Value::Decimal(Some(v)) if v.is_integer() => v
                .to_u64()
                .ok_or_else(|| Error::msg(format!("Value {v}: Decimal does not fit into u64"))),
            Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
            _ => Err(Error::msg(format!("Cannot convert {value:?} to u64"))),
        }
    }
    fn parse(input: impl AsRef<str>) -> Result<Self> {
        input.as_ref().trim().parse::<Self>().map_err(Into::into)
    }
}

impl AsValue for bool {
    fn as_empty_value() -> Value {
        Value::Boolean(None)
    }
    fn as_value(self) -> Value {
        Value::Boolean(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Boolean(Some(v)) => Ok(v),
            // SQLite has no boolean storage class
            Value::Int64(Some(v)) => Ok(v != 0),
            Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
            _ => Err(Error::msg(format!("Cannot convert {value:?} to bool"))),
        }
    }
    fn parse(input: impl AsRef<str>) -> Result<Self> {
        let input = input.as_ref().trim();
        if input.eq_ignore_ascii_case("true") || input == "1" {
            Ok(true)
        } else if input.eq_ignore_ascii_case("false") || input == "0" {
            Ok(false)
        } else {
            Err(Error::msg(format!(
                "Cannot parse '{}' as bool",
                truncate_long!(input)
            )))
        }
    }
}

macro_rules! impl_as_float {
    ($source:ty) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                Value::Float64(None)
            }
            fn as_value(self) -> Value {
                Value::Float64(Some(self as _))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                match value {
                    Value::Float64(Some(v)) => Ok(v as _),
                    Value::Int64(Some(v)) => Ok(v as _),
                    Value::Decimal(Some(v)) => v.to_f64().map(|v| v as _).ok_or_else(|| {
                        Error::msg(format!("Value {v}: Decimal does not fit into f64"))
                    }),
                    Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
                    _ => Err(Error::msg(format!(
                        "Cannot convert {value:?} to {}",
                        any::type_name::<Self>(),
                    ))),
                }
            }
            fn parse(input: impl AsRef<str>) -> Result<Self> {
                input.as_ref().trim().parse::<Self>().map_err(Into::into)
            }
        }
    };
}
impl_as_float!(f32);
impl_as_float!(f64);

impl AsValue for Decimal {
    fn as_empty_value() -> Value {
        Value::Decimal(None)
    }
    fn as_value(self) -> Value {
        Value::Decimal(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Decimal(Some(v)) => Ok(v),
            Value::Int64(Some(v)) => Ok(Decimal::from(v)),
            Value::Float64(Some(v)) => Decimal::from_f64(v)
                .ok_or_else(|| Error::msg(format!("Value {v}: f64 does not fit into Decimal"))),
            Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
            _ => Err(Error::msg(format!("Cannot convert {value:?} to Decimal"))),
        }
    }
    fn parse(input: impl AsRef<str>) -> Result<Self> {
        input.as_ref().trim().parse::<Self>().map_err(Into::into)
    }
}

impl AsValue for String {
    fn as_empty_value() -> Value {
        Value::Varchar(None)
    }
    fn as_value(self) -> Value {
        Value::Varchar(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Varchar(Some(v)) => Ok(v),
            Value::Blob(Some(v)) => String::from_utf8(v.into_vec()).map_err(Into::into),
            ref v if !v.is_null() => Ok(v.to_string()),
            _ => Err(Error::msg(format!("Cannot convert {value:?} to String"))),
        }
    }
    fn parse(input: impl AsRef<str>) -> Result<Self> {
        Ok(input.as_ref().into())
    }
}

impl<'a> AsValue for &'a str {
    fn as_empty_value() -> Value {
        Value::Varchar(None)
    }
    fn as_value(self) -> Value {
        Value::Varchar(Some(self.into()))
    }
    fn try_from_value(_value: Value) -> Result<Self> {
        Err(Error::msg(
            "Cannot get a string reference from a owned value",
        ))
    }
}

impl AsValue for Cow<'static, str> {
    fn as_empty_value() -> Value {
        Value::Varchar(None)
    }
    fn as_value(self) -> Value {
        Value::Varchar(Some(self.into_owned()))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        String::try_from_value(value).map(Cow::Owned)
    }
}

impl AsValue for Vec<u8> {
    fn as_empty_value() -> Value {
        Value::Blob(None)
    }
    fn as_value(self) -> Value {
        Value::Blob(Some(self.into_boxed_slice()))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Blob(Some(v)) => Ok(v.into_vec()),
            Value::Varchar(Some(v)) => Ok(v.into_bytes()),
            _ => Err(Error::msg(format!("Cannot convert {value:?} to Vec<u8>"))),
        }
    }
}

impl AsValue for Uuid {
    fn as_empty_value() -> Value {
        Value::Uuid(None)
    }
    fn as_value(self) -> Value {
        Value::Uuid(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Uuid(Some(v)) => Ok(v),
            Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
            Value::Blob(Some(ref v)) => Uuid::from_slice(v).map_err(Into::into),
            _ => Err(Error::msg(format!("Cannot convert {value:?} to Uuid"))),
        }
    }
    fn parse(input: impl AsRef<str>) -> Result<Self> {
        Uuid::parse_str(input.as_ref().trim()).map_err(Into::into)
    }
}

impl AsValue for Date {
    fn as_empty_value() -> Value {
        Value::Date(None)
    }
    fn as_value(self) -> Value {
        Value::Date(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Date(Some(v)) => Ok(v),
            Value::Timestamp(Some(v)) => Ok(v.date()),
            Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
            _ => Err(Error::msg(format!("Cannot convert {value:?} to Date"))),
        }
    }
    fn parse(input: impl AsRef<str>) -> Result<Self> {
        Date::parse(
            input.as_ref().trim(),
            format_description!("[year]-[month]-[day]"),
        )
        .map_err(Into::into)
    }
}

impl AsValue for Time {
    fn as_empty_value() -> Value {
        Value::Time(None)
    }
    fn as_value(self) -> Value {
        Value::Time(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Time(Some(v)) => Ok(v),
            Value::Timestamp(Some(v)) => Ok(v.time()),
            Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
            _ => Err(Error::msg(format!("Cannot convert {value:?} to Time"))),
        }
    }
    fn parse(input: impl AsRef<str>) -> Result<Self> {
        let input = input.as_ref().trim();
        Time::parse(
            input,
            format_description!("[hour]:[minute]:[second].[subsecond]"),
        )
        .or_else(|_| Time::parse(input, format_description!("[hour]:[minute]:[second]")))
        .map_err(Into::into)
    }
}

impl AsValue for PrimitiveDateTime {
    fn as_empty_value() -> Value {
        Value::Timestamp(None)
    }
    fn as_value(self) -> Value {
        Value::Timestamp(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Timestamp(Some(v)) => Ok(v),
            Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
            _ => Err(Error::msg(format!(
                "Cannot convert {value:?} to PrimitiveDateTime"
            ))),
        }
    }
    fn parse(input: impl AsRef<str>) -> Result<Self> {
        let input = input.as_ref().trim();
        let Some((date, time)) = input.split_once([' ', 'T']) else {
            return PrimitiveDateTime::parse(input, &Iso8601::DEFAULT).map_err(Into::into);
        };
        Ok(PrimitiveDateTime::new(
            <Date as AsValue>::parse(date)?,
            <Time as AsValue>::parse(time)?,
        ))
    }
}

impl<T: AsValue> AsValue for Option<T> {
    fn as_empty_value() -> Value {
        T::as_empty_value()
    }
    fn as_value(self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => T::as_empty_value(),
        }
    }
    fn try_from_value(value: Value) -> Result<Self> {
        Ok(if value.is_null() {
            None
        } else {
            Some(<T as AsValue>::try_from_value(value)?)
        })
    }
    fn parse(input: impl AsRef<str>) -> Result<Self> {
        if input.as_ref().trim().eq_ignore_ascii_case("null") {
            return Ok(None);
        }
        T::parse(input).map(Some)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Varchar(Some(value.into()))
    }
}
