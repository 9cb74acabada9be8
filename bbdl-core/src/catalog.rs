//! Field metadata catalog.
//!
//! The catalog maps a field mnemonic to its license category and declared type.
//! It is loaded once (from the simplified `fields.csv`) and only read afterwards;
//! callers construct it and hand it to the codec and session explicitly.

use crate::error::BbdlError;
use crate::ticker::YELLOW_KEYS;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

pub const COL_MNEMONIC: &str = "Field Mnemonic";
pub const COL_CATEGORY: &str = "Data License Category";
pub const COL_TYPE: &str = "Field Type";

/// Declared type names used by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclaredType {
    Boolean,
    BulkFormat,
    Character,
    Date,
    DateOrTime,
    Integer,
    IntegerReal,
    LongCharacter,
    MonthYear,
    Price,
    Real,
    Time,
}

impl DeclaredType {
    pub fn from_name(name: &str) -> Option<Self> {
        let t = match name.trim() {
            "Boolean" => DeclaredType::Boolean,
            "Bulk Format" => DeclaredType::BulkFormat,
            "Character" => DeclaredType::Character,
            "Date" => DeclaredType::Date,
            "Date or Time" => DeclaredType::DateOrTime,
            "Integer" => DeclaredType::Integer,
            "Integer/Real" => DeclaredType::IntegerReal,
            "Long Character" => DeclaredType::LongCharacter,
            "Month/Year" => DeclaredType::MonthYear,
            "Price" => DeclaredType::Price,
            "Real" => DeclaredType::Real,
            "Time" => DeclaredType::Time,
            _ => return None,
        };
        Some(t)
    }
}

/// One catalog row.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub mnemonic: String,
    pub category: String,
    /// Declared type name as it appears in the catalog.
    pub type_name: String,
}

impl FieldInfo {
    pub fn declared_type(&self) -> Option<DeclaredType> {
        DeclaredType::from_name(&self.type_name)
    }
}

/// Read-only lookup contract over field metadata.
pub trait FieldCatalog: Send + Sync {
    /// Metadata for a mnemonic (case-insensitive).
    fn lookup(&self, mnemonic: &str) -> Option<&FieldInfo>;

    /// All mnemonics in catalog order.
    fn mnemonics(&self) -> Vec<&str>;
}

/// Per-category counts and members, as returned by [`to_categories`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategorySummary {
    pub count: BTreeMap<String, usize>,
    pub detail: BTreeMap<String, Vec<String>>,
}

/// Catalog backed by the simplified `fields.csv`.
#[derive(Debug, Clone, Default)]
pub struct CsvFieldCatalog {
    fields: Vec<FieldInfo>,
    index: HashMap<String, usize>,
}

impl CsvFieldCatalog {
    /// Load a catalog CSV from disk.
    pub fn from_file(path: &Path) -> Result<Self, BbdlError> {
        let file = fs::File::open(path)
            .map_err(|e| BbdlError::Catalog(format!("open {}: {e}", path.display())))?;
        Self::from_reader(file)
    }

    /// Load a catalog from any CSV source with the standard header row.
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, BbdlError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);
        let headers = rdr
            .headers()
            .map_err(|e| BbdlError::Catalog(format!("read header: {e}")))?
            .clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| BbdlError::Catalog(format!("missing column '{name}'")))
        };
        let mnemonic_col = column(COL_MNEMONIC)?;
        let category_col = column(COL_CATEGORY)?;
        let type_col = column(COL_TYPE)?;

        let mut catalog = CsvFieldCatalog::default();
        for record in rdr.records() {
            let record = record.map_err(|e| BbdlError::Catalog(format!("read row: {e}")))?;
            let get = |i: usize| record.get(i).unwrap_or("").to_string();
            catalog.insert(FieldInfo {
                mnemonic: get(mnemonic_col),
                category: get(category_col),
                type_name: get(type_col),
            });
        }
        Ok(catalog)
    }

    /// Build a catalog from rows in memory.
    pub fn from_fields(fields: impl IntoIterator<Item = FieldInfo>) -> Self {
        let mut catalog = CsvFieldCatalog::default();
        for info in fields {
            catalog.insert(info);
        }
        catalog
    }

    fn insert(&mut self, info: FieldInfo) {
        if info.mnemonic.is_empty() {
            return;
        }
        let key = info.mnemonic.to_uppercase();
        match self.index.get(&key) {
            Some(&i) => self.fields[i] = info,
            None => {
                self.index.insert(key, self.fields.len());
                self.fields.push(info);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FieldCatalog for CsvFieldCatalog {
    fn lookup(&self, mnemonic: &str) -> Option<&FieldInfo> {
        self.index
            .get(&mnemonic.to_uppercase())
            .map(|&i| &self.fields[i])
    }

    fn mnemonics(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.mnemonic.as_str()).collect()
    }
}

/// Mnemonics whose category is (or with `invert`, is not) one of `categories`.
///
/// `BH_` and `LU_` prefixed mnemonics are never returned. Catalog order is kept.
pub fn from_categories(
    catalog: &dyn FieldCatalog,
    categories: &[&str],
    invert: bool,
) -> Vec<String> {
    catalog
        .mnemonics()
        .into_iter()
        .filter_map(|m| catalog.lookup(m))
        .filter(|info| categories.contains(&info.category.as_str()) != invert)
        .filter(|info| !info.mnemonic.starts_with("BH_") && !info.mnemonic.starts_with("LU_"))
        .map(|info| info.mnemonic.clone())
        .collect()
}

/// Group fields by license category; unknown mnemonics are skipped.
pub fn to_categories<S: AsRef<str>>(catalog: &dyn FieldCatalog, fields: &[S]) -> CategorySummary {
    let mut summary = CategorySummary::default();
    for field in fields {
        let field = field.as_ref();
        let Some(info) = catalog.lookup(field) else {
            continue;
        };
        if info.category.is_empty() {
            continue;
        }
        *summary.count.entry(info.category.clone()).or_insert(0) += 1;
        summary
            .detail
            .entry(info.category.clone())
            .or_default()
            .push(field.to_string());
    }
    summary
}

/// Columns kept when reducing the vendor field list to the catalog format.
pub fn catalog_headers() -> Vec<&'static str> {
    let mut headers = vec![COL_MNEMONIC, COL_CATEGORY];
    headers.extend(YELLOW_KEYS);
    headers.push(COL_TYPE);
    headers
}

/// Reduce the vendor's full `fields.csv` to the simplified catalog columns.
pub fn import_vendor_csv(input: &Path, output: &Path) -> Result<usize, BbdlError> {
    if input.file_name().and_then(|n| n.to_str()) != Some("fields.csv") {
        return Err(BbdlError::validation(format!(
            "expected 'fields.csv', got '{}'",
            input.display()
        )));
    }
    if !input.exists() {
        return Err(BbdlError::validation(format!(
            "fields.csv does not exist at {}",
            input.display()
        )));
    }

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(input)
        .map_err(|e| BbdlError::Catalog(format!("open {}: {e}", input.display())))?;
    let vendor_headers = rdr
        .headers()
        .map_err(|e| BbdlError::Catalog(format!("read header: {e}")))?
        .clone();

    let wanted = catalog_headers();
    let positions: Vec<Option<usize>> = wanted
        .iter()
        .map(|w| vendor_headers.iter().position(|h| h == *w))
        .collect();

    let mut wtr = csv::Writer::from_path(output)
        .map_err(|e| BbdlError::Catalog(format!("create {}: {e}", output.display())))?;
    wtr.write_record(&wanted)
        .map_err(|e| BbdlError::Catalog(format!("write header: {e}")))?;

    let mut rows = 0;
    for record in rdr.records() {
        let record = record.map_err(|e| BbdlError::Catalog(format!("read row: {e}")))?;
        let row: Vec<&str> = positions
            .iter()
            .map(|p| p.and_then(|i| record.get(i)).unwrap_or(""))
            .collect();
        wtr.write_record(&row)
            .map_err(|e| BbdlError::Catalog(format!("write row: {e}")))?;
        rows += 1;
    }
    wtr.flush()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Field Mnemonic,Data License Category,Comdty,Equity,Muni,Pfd,M-Mkt,Govt,Corp,Index,Curncy,Mtge,Field Type
PX_LAST,End of Day Pricing,Y,Y,Y,Y,Y,Y,Y,Y,Y,Y,Price
PX_BID,End of Day Pricing,Y,Y,Y,Y,Y,Y,Y,Y,Y,Y,Price
ID_BB_UNIQUE,Security Master,Y,Y,Y,Y,Y,Y,Y,Y,Y,Y,Character
BH_PX_LAST,End of Day Pricing,Y,Y,Y,Y,Y,Y,Y,Y,Y,Y,Price
EBITDA,Fundamentals,N,Y,N,N,N,N,N,N,N,N,Real
";

    fn catalog() -> CsvFieldCatalog {
        CsvFieldCatalog::from_reader(SAMPLE.as_bytes()).unwrap()
    }

    #[test]
    fn loads_rows() {
        let cat = catalog();
        assert_eq!(cat.len(), 5);
        let px = cat.lookup("px_last").unwrap();
        assert_eq!(px.category, "End of Day Pricing");
        assert_eq!(px.declared_type(), Some(DeclaredType::Price));
        assert!(cat.lookup("NOPE").is_none());
    }

    #[test]
    fn missing_column_is_an_error() {
        let err = CsvFieldCatalog::from_reader("Field Mnemonic,Field Type\nA,Real\n".as_bytes());
        assert!(matches!(err, Err(BbdlError::Catalog(_))));
    }

    #[test]
    fn categories_filter_skips_prefixed() {
        let cat = catalog();
        let eod = from_categories(&cat, &["End of Day Pricing"], false);
        assert_eq!(eod, vec!["PX_LAST", "PX_BID"]);
        let rest = from_categories(&cat, &["End of Day Pricing"], true);
        assert_eq!(rest, vec!["ID_BB_UNIQUE", "EBITDA"]);
    }

    #[test]
    fn category_summary() {
        let cat = catalog();
        let summary = to_categories(&cat, &["ID_BB_UNIQUE", "PX_LAST", "PX_BID", "UNKNOWN"]);
        assert_eq!(summary.count["End of Day Pricing"], 2);
        assert_eq!(summary.count["Security Master"], 1);
        assert_eq!(summary.detail["End of Day Pricing"], vec!["PX_LAST", "PX_BID"]);
        assert_eq!(summary.count.len(), 2);
    }

    #[test]
    fn import_rejects_wrong_name() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("other.csv");
        std::fs::write(&input, SAMPLE).unwrap();
        let err = import_vendor_csv(&input, &dir.path().join("out.csv"));
        assert!(matches!(err, Err(BbdlError::Validation(_))));
    }

    #[test]
    fn import_keeps_catalog_columns() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("fields.csv");
        std::fs::write(
            &input,
            "Field ID,Field Mnemonic,Description,Data License Category,Equity,Field Type\n\
             PR005,PX_LAST,Last Price,End of Day Pricing,Y,Price\n",
        )
        .unwrap();
        let output = dir.path().join("simplified.csv");
        assert_eq!(import_vendor_csv(&input, &output).unwrap(), 1);

        let cat = CsvFieldCatalog::from_file(&output).unwrap();
        let px = cat.lookup("PX_LAST").unwrap();
        assert_eq!(px.type_name, "Price");
        let text = std::fs::read_to_string(&output).unwrap();
        assert!(text.starts_with("Field Mnemonic,Data License Category,Comdty,Equity"));
        assert!(!text.contains("Last Price"));
    }
}
