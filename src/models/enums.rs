use crate::db::DatabaseError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// The string form is used both as the column value and the JSON value.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

str_enum!(Role {
    Patient => "patient",
    Doctor => "doctor",
    Insurance => "insurance",
});

str_enum!(AppointmentStatus {
    Pending => "Pending",
    Confirmed => "Confirmed",
    Cancelled => "Cancelled",
    Completed => "Completed",
});

str_enum!(BillStatus {
    Unbilled => "Unbilled",
    Unpaid => "Unpaid",
    PendingInsurance => "Pending Insurance",
    Paid => "Paid",
});

str_enum!(ClaimStatus {
    None => "None",
    Pending => "Pending",
    Accepted => "Accepted",
    Rejected => "Rejected",
});

impl AppointmentStatus {
    /// Whether an appointment in this status holds its doctor/time slot.
    pub fn occupies_slot(self) -> bool {
        self != AppointmentStatus::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn bill_status_uses_display_strings() {
        assert_eq!(BillStatus::PendingInsurance.as_str(), "Pending Insurance");
        assert_eq!(
            BillStatus::from_str("Pending Insurance").unwrap(),
            BillStatus::PendingInsurance
        );
    }

    #[test]
    fn invalid_role_is_rejected() {
        let err = Role::from_str("admin").unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidEnum { .. }));
    }

    #[test]
    fn serde_uses_column_strings() {
        let json = serde_json::to_string(&BillStatus::PendingInsurance).unwrap();
        assert_eq!(json, "\"Pending Insurance\"");
        let role: Role = serde_json::from_str("\"doctor\"").unwrap();
        assert_eq!(role, Role::Doctor);
        assert!(serde_json::from_str::<Role>("\"nurse\"").is_err());
    }

    #[test]
    fn only_cancelled_releases_a_slot() {
        assert!(AppointmentStatus::Pending.occupies_slot());
        assert!(AppointmentStatus::Confirmed.occupies_slot());
        assert!(AppointmentStatus::Completed.occupies_slot());
        assert!(!AppointmentStatus::Cancelled.occupies_slot());
    }
}
