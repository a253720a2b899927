//! Shared value types and their CBOR encodings
use crate::error::ValidationError;
use chrono::{DateTime, Duration, TimeZone, Utc};

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub struct TimeStamp(DateTime<Utc>);

impl TimeStamp {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn new_with(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        min: u32,
        sec: u32,
    ) -> Result<Self, ValidationError> {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .single()
            .map(Self)
            .ok_or(ValidationError::InvalidDate)
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
    pub fn checked_add(&self, offset: Duration) -> Result<Self, ValidationError> {
        self.0
            .checked_add_signed(offset)
            .map(Self)
            .ok_or(ValidationError::InvalidDate)
    }
}

impl Default for TimeStamp {
    fn default() -> Self {
        Self::new()
    }
}

impl From<DateTime<Utc>> for TimeStamp {
    fn from(value: DateTime<Utc>) -> Self {
        TimeStamp(value)
    }
}

impl std::fmt::Display for TimeStamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl<C> minicbor::Encode<C> for TimeStamp {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

/// Decimals are stored as their canonical string so no precision is lost.
/// Used through `#[cbor(with = "crate::types::decimal")]`.
pub mod decimal {
    use minicbor::{Decoder, Encoder};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    pub fn encode<C, W: minicbor::encode::Write>(
        v: &Decimal,
        e: &mut Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.str(&v.to_string())?.ok()
    }

    pub fn decode<'b, C>(
        d: &mut Decoder<'b>,
        _: &mut C,
    ) -> Result<Decimal, minicbor::decode::Error> {
        let text = d.str()?;
        Decimal::from_str(text)
            .map_err(|_| minicbor::decode::Error::message("invalid decimal string"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[derive(minicbor::Encode, minicbor::Decode, Debug, PartialEq)]
    struct Priced {
        #[n(0)]
        #[cbor(with = "crate::types::decimal")]
        price: Decimal,
    }

    #[test]
    fn timestamp_encoding() {
        let original = TimeStamp::new();

        let encoding = minicbor::to_vec(original).unwrap();
        let decode: TimeStamp = minicbor::decode(&encoding).unwrap();

        assert_eq!(original, decode);
    }

    #[test]
    fn decimal_keeps_scale() {
        let original = Priced { price: dec!(0.10) };

        let encoding = minicbor::to_vec(&original).unwrap();
        let decoded: Priced = minicbor::decode(&encoding).unwrap();

        assert_eq!(decoded.price.to_string(), "0.10");
    }

    #[test]
    fn rejects_impossible_dates() {
        assert_eq!(
            TimeStamp::new_with(2024, 2, 30, 0, 0, 0),
            Err(ValidationError::InvalidDate)
        );
    }
}
