use std::fmt::{Display, Formatter};

use serde::{Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// RFC3339 timestamp guaranteed to be UTC. Stamps produced results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcDateTime(OffsetDateTime);

impl UtcDateTime {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    pub fn format_rfc3339(self) -> String {
        self.0
            .format(&Rfc3339)
            .unwrap_or_else(|_| self.0.unix_timestamp().to_string())
    }
}

impl Display for UtcDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_rfc3339())
    }
}

impl Serialize for UtcDateTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn formats_as_rfc3339_utc() {
        let stamp = UtcDateTime(datetime!(2024-01-01 00:00:00 UTC));
        assert_eq!(stamp.format_rfc3339(), "2024-01-01T00:00:00Z");
        assert_eq!(
            serde_json::to_string(&stamp).expect("serializable"),
            "\"2024-01-01T00:00:00Z\""
        );
    }

    #[test]
    fn now_is_utc() {
        assert!(UtcDateTime::now().to_string().ends_with('Z'));
    }
}
