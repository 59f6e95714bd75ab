use super::{CategoryMapping, ColumnMapping, PercentageUnit, DEFAULT_DATE_FORMATS};
use serde::Deserialize;
use shared_types::{CostCategory, LogicalField, MappingError};
use std::collections::BTreeMap;

/// Mapping file as written by the mapping subsystem
///
/// ```yaml
/// categories:
///   staff:
///     fields:
///       Date: Pay Date
///       Name: Employee
///       Gross: Gross Pay
///       ErNI: Employer NI
///       ErPen: Employer Pension
///       rd_percentage: R&D %
///     date_formats: ["%d/%m/%Y"]
///   epw:
///     fields: { date: Invoice Date, name: Agency, gross: Net, connected: Connected }
/// ```
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingFile {
    pub categories: BTreeMap<String, RawCategoryMapping>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawCategoryMapping {
    pub fields: BTreeMap<LogicalField, String>,
    #[serde(default)]
    pub date_formats: Option<Vec<String>>,
    #[serde(default)]
    pub percentage_unit: PercentageUnit,
    #[serde(default)]
    pub connected_default: bool,
}

impl MappingFile {
    pub fn into_mapping(self) -> Result<ColumnMapping, MappingError> {
        let mut mappings = Vec::with_capacity(self.categories.len());

        for (name, raw) in self.categories {
            let category = CostCategory::parse(&name)
                .ok_or_else(|| MappingError::UnknownCategory(name.clone()))?;
            let date_formats = raw.date_formats.unwrap_or_else(|| {
                DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect()
            });
            mappings.push(CategoryMapping::with_options(
                category,
                raw.fields,
                date_formats,
                raw.percentage_unit,
                raw.connected_default,
            )?);
        }

        Ok(ColumnMapping::new(mappings))
    }
}

impl ColumnMapping {
    /// Parse and validate a YAML mapping document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, MappingError> {
        let file: MappingFile = serde_yaml::from_str(yaml)
            .map_err(|e| MappingError::Config(format!("invalid mapping YAML: {}", e)))?;
        let mapping = file.into_mapping()?;
        if mapping.is_empty() {
            return Err(MappingError::Config(
                "mapping defines no categories".to_string(),
            ));
        }
        tracing::debug!(
            "Loaded column mapping for {} categories",
            mapping.categories().count()
        );
        Ok(mapping)
    }
}
