//! Column mappings: which source column feeds each logical field.
//!
//! Mappings arrive as YAML from the upload/mapping side and are validated
//! once, when loaded. A [`CategoryMapping`] that exists is always usable by
//! the normalizer.

mod loader;

pub use loader::{MappingFile, RawCategoryMapping};

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use shared_types::{CostCategory, LogicalField, MappingError};
use std::collections::BTreeMap;

pub const DEFAULT_DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

/// How a sheet writes its R&D percentage column when there is no `%` sign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PercentageUnit {
    /// `70` means seventy percent
    #[default]
    Whole,
    /// `0.7` means seventy percent
    Fraction,
}

/// Validated mapping for one cost category
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryMapping {
    category: CostCategory,
    fields: BTreeMap<LogicalField, String>,
    date_formats: Vec<String>,
    percentage_unit: PercentageUnit,
    connected_default: bool,
}

impl CategoryMapping {
    pub fn new(
        category: CostCategory,
        fields: BTreeMap<LogicalField, String>,
    ) -> Result<Self, MappingError> {
        Self::with_options(
            category,
            fields,
            DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect(),
            PercentageUnit::Whole,
            false,
        )
    }

    pub fn with_options(
        category: CostCategory,
        fields: BTreeMap<LogicalField, String>,
        date_formats: Vec<String>,
        percentage_unit: PercentageUnit,
        connected_default: bool,
    ) -> Result<Self, MappingError> {
        for field in LogicalField::REQUIRED {
            if !fields.contains_key(&field) {
                return Err(MappingError::RequiredFieldUnmapped { category, field });
            }
        }

        let mut trimmed = BTreeMap::new();
        for (field, column) in fields {
            if !field.applies_to(category) {
                return Err(MappingError::FieldNotApplicable { category, field });
            }
            let column = column.trim();
            if column.is_empty() {
                return Err(MappingError::BlankColumn { category, field });
            }
            trimmed.insert(field, column.to_string());
        }

        if date_formats.is_empty() {
            return Err(MappingError::NoDateFormats(category));
        }
        for format in &date_formats {
            if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
                return Err(MappingError::Config(format!(
                    "invalid date format '{}' for {}",
                    format, category
                )));
            }
        }

        if connected_default && !category.is_third_party() {
            return Err(MappingError::FieldNotApplicable {
                category,
                field: LogicalField::Connected,
            });
        }

        Ok(Self {
            category,
            fields: trimmed,
            date_formats,
            percentage_unit,
            connected_default,
        })
    }

    pub fn category(&self) -> CostCategory {
        self.category
    }

    /// Source column bound to a logical field.
    pub fn column(&self, field: LogicalField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = (LogicalField, &str)> {
        self.fields.iter().map(|(f, c)| (*f, c.as_str()))
    }

    pub fn date_formats(&self) -> &[String] {
        &self.date_formats
    }

    pub fn percentage_unit(&self) -> PercentageUnit {
        self.percentage_unit
    }

    pub fn connected_default(&self) -> bool {
        self.connected_default
    }
}

/// Validated mappings for every category the upload supplies
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMapping {
    categories: BTreeMap<CostCategory, CategoryMapping>,
}

impl ColumnMapping {
    pub fn new(mappings: impl IntoIterator<Item = CategoryMapping>) -> Self {
        Self {
            categories: mappings
                .into_iter()
                .map(|m| (m.category(), m))
                .collect(),
        }
    }

    pub fn for_category(&self, category: CostCategory) -> Result<&CategoryMapping, MappingError> {
        self.categories
            .get(&category)
            .ok_or(MappingError::UnmappedCategory(category))
    }

    pub fn categories(&self) -> impl Iterator<Item = CostCategory> + '_ {
        self.categories.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
