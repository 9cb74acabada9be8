//! Value codec: raw response tokens to typed values, per field.
//!
//! Lookup order for a mnemonic:
//! 1. the override table (status columns, country codes, `CPN`)
//! 2. the declared type from the field catalog
//!
//! Unknown mnemonics have type [`FieldType::Object`] and fail to convert.

pub mod bulk;
pub mod scalar;
pub mod value;

pub use value::{is_null_str, FieldType, Value, NULL_SENTINELS};

use crate::catalog::{DeclaredType, FieldCatalog};
use crate::error::DecodeError;

/// Conversion applied by a mnemonic override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Override {
    Str,
    Number,
    Date,
    CountryCode,
}

const OVERRIDES: &[(&str, Override, FieldType)] = &[
    ("IDENTIFIER", Override::Str, FieldType::Str),
    ("RETCODE", Override::Number, FieldType::Int),
    ("NFIELDS", Override::Number, FieldType::Int),
    ("DATE", Override::Date, FieldType::Date),
    ("CNTRY_OF_DOMICILE", Override::CountryCode, FieldType::Str),
    ("CNTRY_OF_INCORPORATION", Override::CountryCode, FieldType::Str),
    ("CNTRY_OF_RISK", Override::CountryCode, FieldType::Str),
    ("COUNTRY_ISO", Override::CountryCode, FieldType::Str),
    ("CPN", Override::Number, FieldType::Float),
];

fn find_override(mnemonic: &str) -> Option<(Override, FieldType)> {
    OVERRIDES
        .iter()
        .find(|(name, _, _)| name.eq_ignore_ascii_case(mnemonic))
        .map(|(_, conv, ty)| (*conv, *ty))
}

/// Container type for a declared catalog type.
pub fn field_type_of(declared: DeclaredType) -> FieldType {
    match declared {
        DeclaredType::Boolean => FieldType::Bool,
        DeclaredType::BulkFormat => FieldType::Bulk,
        DeclaredType::Character | DeclaredType::LongCharacter => FieldType::Str,
        DeclaredType::Date | DeclaredType::MonthYear => FieldType::Date,
        DeclaredType::DateOrTime => FieldType::DateTime,
        DeclaredType::Integer => FieldType::Int,
        DeclaredType::IntegerReal | DeclaredType::Price | DeclaredType::Real => FieldType::Float,
        DeclaredType::Time => FieldType::Time,
    }
}

/// Converts raw tokens for a given field catalog.
pub struct Codec<'a> {
    catalog: &'a dyn FieldCatalog,
    use_custom_mappings: bool,
}

impl<'a> Codec<'a> {
    pub fn new(catalog: &'a dyn FieldCatalog) -> Self {
        Self {
            catalog,
            use_custom_mappings: true,
        }
    }

    /// Whether registered bulk fields decode to named records (default) or tuples.
    pub fn with_custom_mappings(mut self, enabled: bool) -> Self {
        self.use_custom_mappings = enabled;
        self
    }

    /// Type tag for a mnemonic. Never fails; unknown fields are `Object`.
    pub fn to_type(&self, mnemonic: &str) -> FieldType {
        if let Some((_, ty)) = find_override(mnemonic) {
            return ty;
        }
        self.catalog
            .lookup(mnemonic)
            .and_then(|info| info.declared_type())
            .map_or(FieldType::Object, field_type_of)
    }

    /// Convert a raw token for `mnemonic` into a typed value.
    pub fn to_value(&self, mnemonic: &str, raw: &str) -> Result<Value, DecodeError> {
        if let Some((conv, _)) = find_override(mnemonic) {
            return match conv {
                Override::Str => Ok(scalar::to_str(raw)),
                Override::Number => Ok(scalar::to_number(raw)),
                Override::Date => scalar::to_date(raw),
                Override::CountryCode => Ok(scalar::to_country_code(&scalar::to_str(raw))),
            };
        }

        let info = self
            .catalog
            .lookup(mnemonic)
            .ok_or_else(|| DecodeError::UnknownField(mnemonic.to_string()))?;
        let declared = info
            .declared_type()
            .ok_or_else(|| DecodeError::UnknownType {
                mnemonic: mnemonic.to_string(),
                type_name: info.type_name.clone(),
            })?;

        match declared {
            DeclaredType::Boolean => Ok(scalar::to_bool(raw)),
            DeclaredType::BulkFormat => Ok(self.to_bulk(mnemonic, raw)),
            DeclaredType::Character | DeclaredType::LongCharacter => Ok(scalar::to_str(raw)),
            DeclaredType::Date => scalar::to_date(raw),
            DeclaredType::DateOrTime => scalar::to_datetime(raw),
            DeclaredType::MonthYear => scalar::to_month_year(raw),
            DeclaredType::Time => scalar::to_time(raw),
            DeclaredType::Integer
            | DeclaredType::IntegerReal
            | DeclaredType::Price
            | DeclaredType::Real => Ok(scalar::to_number(raw)),
        }
    }

    fn to_bulk(&self, mnemonic: &str, raw: &str) -> Value {
        let decoded = bulk::to_list(raw);
        match bulk::bulk_keys(mnemonic) {
            Some(keys) if self.use_custom_mappings => bulk::to_records(decoded, keys),
            _ => decoded,
        }
    }
}
