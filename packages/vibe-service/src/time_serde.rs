use serde::Serializer;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Serializes an optional timestamp as RFC 3339, or `null` when absent.
pub fn serialize<S>(value: &Option<OffsetDateTime>, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	match value {
		Some(value) => {
			let formatted = value.format(&Rfc3339).map_err(serde::ser::Error::custom)?;

			serializer.serialize_str(&formatted)
		},
		None => serializer.serialize_none(),
	}
}
