/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a Snowflake-style i64 for use as resource ID.
///
/// Layout (53 bits, fits in JavaScript's Number.MAX_SAFE_INTEGER):
///   - 41 bits: milliseconds since 2024-01-01 UTC (~69 years)
///   - 12 bits: random (4096 values per ms)
///
/// Roughly time-ordered, so it doubles as the last tie-breaker when two
/// tasks share a position and a creation timestamp.
pub fn snowflake_id() -> i64 {
    use rand::Rng;
    // Custom epoch: 2024-01-01 00:00:00 UTC
    const EPOCH_MS: i64 = 1_704_067_200_000;
    let now = now_millis();
    let ts = (now - EPOCH_MS) & 0x1FF_FFFF_FFFF; // 41 bits
    let rand_bits: i64 = rand::thread_rng().gen_range(0..0x1000); // 12 bits
    (ts << 12) | rand_bits
}

/// Serde helpers for ids that arrive either as JSON numbers or numeric strings
///
/// Browsers that kept ids as strings (`"targetCollectionId": "123"`) and
/// clients that send plain numbers both deserialize into `i64`.
pub mod flexible_id {
    use serde::de::{self, Visitor};
    use serde::Deserializer;
    use std::fmt;

    struct FlexibleIdVisitor;

    impl<'de> Visitor<'de> for FlexibleIdVisitor {
        type Value = i64;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("an integer id or a string containing one")
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<i64, E> {
            Ok(value)
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<i64, E> {
            i64::try_from(value).map_err(|_| E::custom(format!("id out of range: {value}")))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<i64, E> {
            value
                .trim()
                .parse::<i64>()
                .map_err(|_| E::custom(format!("invalid id: {value}")))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(FlexibleIdVisitor)
    }

    /// Same as [`deserialize`] for optional fields (`null` / absent → `None`)
    pub mod option {
        use serde::{Deserialize, Deserializer};

        #[derive(Deserialize)]
        struct Wrapped(#[serde(deserialize_with = "super::deserialize")] i64);

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Ok(Option::<Wrapped>::deserialize(deserializer)?.map(|Wrapped(id)| id))
        }
    }

    /// Clearable id: pair with `#[serde(default)]` so absent → `None`, `null` → `Some(None)`
    pub mod nullable {
        use serde::Deserializer;

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            super::option::deserialize(deserializer).map(Some)
        }
    }
}

/// Clearable field: pair with `#[serde(default)]` so absent → `None`, `null` → `Some(None)`
pub mod nullable {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}
