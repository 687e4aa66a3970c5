use std::fmt::Display;

/// Declares a string-backed enum stored as `TEXT` in Postgres.
///
/// Generates serde renames, `as_str`, `Display`, `FromStr` and
/// `TryFrom<String>` (the latter is what `#[sqlx(try_from = "String")]`
/// uses when decoding rows).
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::models::ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err($crate::models::ParseEnumError {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::models::ParseEnumError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

pub mod activity;
pub mod investment;
pub mod land;
pub mod soil;
pub mod user;

pub use activity::{NewUserQuery, SavedLand, SavedLandEntry, UserQuery};
pub use investment::{
    DevelopmentUseCase, GovernmentProject, Infrastructure, InfraType, LandRecommendation,
    NewDevelopmentUseCase, NewGovernmentProject, NewInfrastructure, NewLandRecommendation,
    ProjectStatus, ProjectType,
};
pub use land::{Land, LandFilter, LandStatus, LandType, LandUpdate, NewLand};
pub use soil::{
    CropCount, CropRecommendationRecord, CropScore, CropStats, NewCropRecommendation,
    NewSoilData, SoilData, SoilSuitability,
};
pub use user::{NewUser, User, UserType, UserUpdate};

/// Raised when a stored or submitted string is not a known enum value
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} value '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Rounds to two decimal places, the precision every score is reported at
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Formats a rupee amount with thousands separators and no decimals, e.g. `₹3,000,000`
pub fn format_rupees(amount: f64) -> String {
    let whole = amount.round() as i64;
    let digits = whole.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if whole < 0 { "-" } else { "" };
    format!("₹{}{}", sign, grouped)
}

/// Formats a number the way Python's `str(float)` would for whole values (`15.0`)
/// and plainly otherwise (`12.5`), used in human-readable score explanations.
pub fn format_quantity(value: impl Into<f64>) -> impl Display {
    let value = value.into();
    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(85.456), 85.46);
        assert_eq!(round2(70.0), 70.0);
        assert_eq!(round2(-0.004), -0.0);
    }

    #[test]
    fn test_format_rupees_groups_thousands() {
        assert_eq!(format_rupees(3_000_000.0), "₹3,000,000");
        assert_eq!(format_rupees(999.0), "₹999");
        assert_eq!(format_rupees(1000.4), "₹1,000");
        assert_eq!(format_rupees(0.0), "₹0");
    }

    #[test]
    fn test_format_quantity() {
        assert_eq!(format_quantity(15.0).to_string(), "15.0");
        assert_eq!(format_quantity(12.5).to_string(), "12.5");
    }

    #[test]
    fn test_text_enum_round_trip_and_error() {
        assert_eq!("sold".parse::<LandStatus>().unwrap(), LandStatus::Sold);
        assert_eq!(LandType::Mixed.as_str(), "mixed");
        assert_eq!(LandType::ALL.len(), 5);

        let err = "castle".parse::<LandType>().unwrap_err();
        assert_eq!(err.kind, "LandType");
        assert_eq!(err.to_string(), "unknown LandType value 'castle'");

        let json = serde_json::to_string(&UserType::Investor).unwrap();
        assert_eq!(json, r#""investor""#);
    }
}
