use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Duration;

/// Serializes Duration as whole microseconds
pub fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
    micros.serialize(serializer)
}

/// Deserializes Duration from whole microseconds
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let micros = u64::deserialize(deserializer)?;
    Ok(Duration::from_micros(micros))
}
