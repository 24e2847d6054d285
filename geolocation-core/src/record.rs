//! Raw geolocation records as read from an import file.

use std::fmt;

/// A single input row, kept as raw text until validated.
///
/// The [`Validator`](crate::Validator) replaces `country` and `city` with
/// their normalised forms when a record is accepted; every other field is
/// passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    /// IPv4 or IPv6 address literal.
    pub address: String,
    /// Two-letter country code.
    pub country_code: String,
    /// Country name.
    pub country: String,
    /// City name.
    pub city: String,
    /// Latitude in decimal degrees.
    pub latitude: String,
    /// Longitude in decimal degrees.
    pub longitude: String,
    /// Domain-specific integer carried through unchanged.
    pub auxiliary_value: String,
}

impl Record {
    /// Build a record from the seven columns of an input row, in file order.
    ///
    /// # Examples
    ///
    /// ```
    /// use geolocation_core::Record;
    ///
    /// let record = Record::from_fields([
    ///     "127.0.0.1", "NZ", "New Zealand", "Auckland", "-36.8", "174.7", "42",
    /// ]);
    /// assert_eq!(record.city, "Auckland");
    /// ```
    pub fn from_fields<S: Into<String>>(fields: [S; 7]) -> Self {
        let [
            address,
            country_code,
            country,
            city,
            latitude,
            longitude,
            auxiliary_value,
        ] = fields;
        Self {
            address: address.into(),
            country_code: country_code.into(),
            country: country.into(),
            city: city.into(),
            latitude: latitude.into(),
            longitude: longitude.into(),
            auxiliary_value: auxiliary_value.into(),
        }
    }

    /// Borrow the fields in file order, ready to be written as one row.
    #[must_use]
    pub fn as_fields(&self) -> [&str; 7] {
        [
            &self.address,
            &self.country_code,
            &self.country,
            &self.city,
            &self.latitude,
            &self.longitude,
            &self.auxiliary_value,
        ]
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.as_fields().join(" "))
    }
}

/// Identifies one of the seven record columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// The IP address column.
    Address,
    /// The country code column.
    CountryCode,
    /// The country name column.
    Country,
    /// The city name column.
    City,
    /// The latitude column.
    Latitude,
    /// The longitude column.
    Longitude,
    /// The auxiliary integer column.
    AuxiliaryValue,
}

impl Field {
    /// Column name as it appears in the import header.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Address => "address",
            Self::CountryCode => "country_code",
            Self::Country => "country",
            Self::City => "city",
            Self::Latitude => "latitude",
            Self::Longitude => "longitude",
            Self::AuxiliaryValue => "auxiliary_value",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Address => "ip",
            Self::CountryCode => "country code",
            Self::Country => "country",
            Self::City => "city",
            Self::Latitude => "latitude",
            Self::Longitude => "longitude",
            Self::AuxiliaryValue => "auxiliary value",
        };
        f.write_str(label)
    }
}
