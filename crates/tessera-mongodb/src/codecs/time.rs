//! chrono date and time codecs
//!
//! * `NaiveDateTime`: BSON date, read as UTC
//! * `NaiveDate`: BSON date at midnight UTC
//! * `NaiveTime`: Int64 milliseconds since midnight

use bson::Bson;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use tessera_common::TesseraError;

use super::{unexpected, CodecRegistry};
use crate::Result;

const MILLIS_PER_DAY: i64 = 86_400_000;

pub(super) fn register(registry: &mut CodecRegistry) {
    registry
        .add_fn::<NaiveDateTime>(encode_datetime, decode_datetime)
        .add_fn::<NaiveDate>(encode_date, decode_date)
        .add_fn::<NaiveTime>(encode_time, decode_time);
}

fn encode_datetime(value: &NaiveDateTime) -> Result<Bson> {
    Ok(Bson::DateTime(bson::DateTime::from_chrono(
        Utc.from_utc_datetime(value),
    )))
}

fn decode_datetime(value: &Bson) -> Result<NaiveDateTime> {
    match value {
        Bson::DateTime(date) => Ok(date.to_chrono().naive_utc()),
        other => Err(unexpected("date", other)),
    }
}

fn encode_date(value: &NaiveDate) -> Result<Bson> {
    let midnight = value
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| TesseraError::Codec(format!("no midnight on {}", value)))?;
    encode_datetime(&midnight)
}

fn decode_date(value: &Bson) -> Result<NaiveDate> {
    decode_datetime(value).map(|datetime| datetime.date())
}

fn time_to_millis(value: &NaiveTime) -> i64 {
    // leap seconds report nanoseconds past 1e9
    let millis = i64::from(value.nanosecond() / 1_000_000).min(999);
    i64::from(value.num_seconds_from_midnight()) * 1000 + millis
}

fn millis_to_time(millis: i64) -> Result<NaiveTime> {
    if !(0..MILLIS_PER_DAY).contains(&millis) {
        return Err(TesseraError::Codec(format!(
            "{} ms is outside a day",
            millis
        )));
    }
    let seconds = (millis / 1000) as u32;
    let nanos = (millis % 1000) as u32 * 1_000_000;
    NaiveTime::from_num_seconds_from_midnight_opt(seconds, nanos)
        .ok_or_else(|| TesseraError::Codec(format!("invalid time of day: {} ms", millis)))
}

fn encode_time(value: &NaiveTime) -> Result<Bson> {
    Ok(Bson::Int64(time_to_millis(value)))
}

fn decode_time(value: &Bson) -> Result<NaiveTime> {
    match value {
        Bson::Int64(millis) => millis_to_time(*millis),
        Bson::Int32(millis) => millis_to_time(i64::from(*millis)),
        other => Err(unexpected("int64", other)),
    }
}

/// `#[serde(with = "tessera_mongodb::codecs::naive_time_millis")]`: a
/// `NaiveTime` stored as milliseconds since midnight
pub mod naive_time_millis {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(super::time_to_millis(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let millis = i64::deserialize(deserializer)?;
        super::millis_to_time(millis).map_err(de::Error::custom)
    }
}

/// `#[serde(with = "tessera_mongodb::codecs::naive_datetime")]`: a
/// `NaiveDateTime` stored as a BSON date in UTC
pub mod naive_datetime {
    use chrono::{NaiveDateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        value: &NaiveDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        bson::DateTime::from_chrono(Utc.from_utc_datetime(value)).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<NaiveDateTime, D::Error> {
        let date = bson::DateTime::deserialize(deserializer)?;
        Ok(date.to_chrono().naive_utc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    fn registry() -> CodecRegistry {
        CodecRegistry::with_defaults()
    }

    #[test]
    fn test_datetime_as_utc_date() {
        let value = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_milli_opt(12, 30, 0, 250)
            .unwrap();
        let encoded = registry().encode(&value).unwrap();
        assert_eq!(
            encoded,
            Bson::DateTime(bson::DateTime::from_millis(1_709_296_200_250))
        );
        assert_eq!(registry().decode::<NaiveDateTime>(&encoded).unwrap(), value);
    }

    #[test]
    fn test_date_at_midnight() {
        let value = NaiveDate::from_ymd_opt(1970, 1, 2).unwrap();
        assert_eq!(
            registry().encode(&value).unwrap(),
            Bson::DateTime(bson::DateTime::from_millis(86_400_000))
        );
    }

    #[test]
    fn test_time_as_millis() {
        let value = NaiveTime::from_hms_milli_opt(1, 0, 0, 5).unwrap();
        assert_eq!(registry().encode(&value).unwrap(), Bson::Int64(3_600_005));
        assert_eq!(registry().decode::<NaiveTime>(&Bson::Int32(1000)).unwrap(),
            NaiveTime::from_hms_opt(0, 0, 1).unwrap());
        assert!(registry().decode::<NaiveTime>(&Bson::Int64(MILLIS_PER_DAY)).is_err());
        assert!(registry().decode::<NaiveTime>(&Bson::Int64(-1)).is_err());
        assert!(registry().decode::<NaiveTime>(&Bson::String("x".into())).is_err());
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Shift {
        #[serde(with = "crate::codecs::naive_time_millis")]
        starts: NaiveTime,
        #[serde(with = "crate::codecs::naive_datetime")]
        created: NaiveDateTime,
    }

    #[test]
    fn test_serde_adapters() {
        let shift = Shift {
            starts: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            created: NaiveDate::from_ymd_opt(1970, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 1)
                .unwrap(),
        };
        let document = bson::to_document(&shift).unwrap();
        assert_eq!(document.get_i64("starts").unwrap(), 32_400_000);
        assert_eq!(
            document.get_datetime("created").unwrap().timestamp_millis(),
            1000
        );
        let back: Shift = bson::from_document(document).unwrap();
        assert_eq!(back, shift);
    }
}
