//! Turns raw spreadsheet records into canonical [`LineItem`]s.

mod parsers;

pub use parsers::{parse_bool, parse_date, parse_money, parse_percentage};

use crate::mapping::CategoryMapping;
use rust_decimal::Decimal;
use shared_types::{ConnectedComparison, LineItem, LineItemId, LogicalField, MappingError};
use std::collections::{BTreeMap, HashMap};

/// One uploaded row: source column header to cell text
pub type RawRecord = HashMap<String, String>;

/// A row that could not be normalized, with its 1-based data row number
#[derive(Debug, Clone, PartialEq)]
pub struct RecordRejection {
    pub row: usize,
    pub error: MappingError,
}

#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub items: Vec<LineItem>,
    pub rejections: Vec<RecordRejection>,
}

const COMPONENT_FIELDS: [LogicalField; 4] = [
    LogicalField::EmployerNi,
    LogicalField::EmployerPension,
    LogicalField::Bonus,
    LogicalField::Pilon,
];

/// Build a canonical line item from one raw record.
///
/// Required fields (date, name, gross) must be present and parse; optional
/// fields that are unmapped or blank default to zero or absent.
pub fn normalize(raw: &RawRecord, mapping: &CategoryMapping) -> Result<LineItem, MappingError> {
    let date_text = required(raw, mapping, LogicalField::Date)?;
    let date = parsers::parse_date(date_text, mapping.date_formats()).ok_or_else(|| {
        invalid(
            mapping,
            LogicalField::Date,
            date_text,
            format!("expected one of {}", mapping.date_formats().join(", ")),
        )
    })?;

    let name = required(raw, mapping, LogicalField::Name)?.trim().to_string();
    let gross = money(raw, mapping, LogicalField::Gross)?.unwrap_or(Decimal::ZERO);

    let mut components = BTreeMap::new();
    for field in COMPONENT_FIELDS {
        if let (Some(component), Some(amount)) = (field.component(), money(raw, mapping, field)?) {
            components.insert(component, amount);
        }
    }

    let component_total = components
        .values()
        .try_fold(Decimal::ZERO, |acc: Decimal, v| acc.checked_add(*v))
        .ok_or_else(|| MappingError::Config("component total overflows".to_string()))?;
    if component_total > gross {
        return Err(MappingError::ComponentsExceedGross {
            components: component_total,
            gross,
        });
    }

    let rd_percentage = match optional(raw, mapping, LogicalField::RdPercentage) {
        Some(text) => {
            let (percentage, clamped) = parsers::parse_percentage(text, mapping.percentage_unit())
                .map_err(|reason| invalid(mapping, LogicalField::RdPercentage, text, reason))?;
            if clamped {
                tracing::warn!(
                    "R&D percentage '{}' for {} clamped to {}",
                    text,
                    name,
                    percentage
                );
            }
            Some(percentage)
        }
        None => None,
    };

    let connected = match optional(raw, mapping, LogicalField::Connected) {
        Some(text) => parsers::parse_bool(text).ok_or_else(|| {
            invalid(
                mapping,
                LogicalField::Connected,
                text,
                "expected yes/no".to_string(),
            )
        })?,
        None => mapping.connected_default(),
    };

    let grant = money(raw, mapping, LogicalField::Grant)?.unwrap_or(Decimal::ZERO);

    let comparison = match (
        money(raw, mapping, LogicalField::AmountPaid)?,
        money(raw, mapping, LogicalField::ThirdPartySpend)?,
    ) {
        (Some(amount_paid), Some(third_party_spend)) => Some(ConnectedComparison {
            amount_paid,
            third_party_spend,
        }),
        (Some(_), None) => {
            return Err(MappingError::IncompleteComparison {
                missing: LogicalField::ThirdPartySpend,
            })
        }
        (None, Some(_)) => {
            return Err(MappingError::IncompleteComparison {
                missing: LogicalField::AmountPaid,
            })
        }
        (None, None) => None,
    };

    Ok(LineItem {
        id: LineItemId::new(),
        category: mapping.category(),
        date,
        name,
        description: optional(raw, mapping, LogicalField::Description).map(|d| d.trim().to_string()),
        gross,
        components,
        connected,
        comparison,
        rd_percentage,
        grant,
        exclusion: None,
        source_row: None,
    })
}

/// Normalize every record, collecting rejections instead of stopping at the
/// first bad row. Rows are numbered by position, starting at 1.
pub fn normalize_batch(records: &[RawRecord], mapping: &CategoryMapping) -> BatchOutcome {
    normalize_rows(
        records.iter().enumerate().map(|(index, record)| (index + 1, record)),
        mapping,
    )
}

/// Like [`normalize_batch`], for callers that already know each record's
/// source row (e.g. when some rows of the upload could not be read at all).
pub fn normalize_rows<'a>(
    rows: impl IntoIterator<Item = (usize, &'a RawRecord)>,
    mapping: &CategoryMapping,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();
    let mut seen = 0;

    for (row, record) in rows {
        seen += 1;
        match normalize(record, mapping) {
            Ok(mut item) => {
                item.source_row = Some(row);
                outcome.items.push(item);
            }
            Err(error) => {
                tracing::warn!("Rejected {} row {}: {}", mapping.category(), row, error);
                outcome.rejections.push(RecordRejection { row, error });
            }
        }
    }

    tracing::info!(
        "Normalized {} {} records ({} rejected)",
        seen,
        mapping.category(),
        outcome.rejections.len()
    );

    outcome
}

/// Cell text for a mapped column; exact header first, then a trimmed
/// case-insensitive match.
fn cell<'a>(raw: &'a RawRecord, column: &str) -> Option<&'a str> {
    if let Some(value) = raw.get(column) {
        return Some(value.as_str());
    }
    raw.iter()
        .find(|(header, _)| header.trim().eq_ignore_ascii_case(column))
        .map(|(_, value)| value.as_str())
}

fn required<'a>(
    raw: &'a RawRecord,
    mapping: &CategoryMapping,
    field: LogicalField,
) -> Result<&'a str, MappingError> {
    let column = mapping.column(field).unwrap_or_default();
    match cell(raw, column) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(MappingError::MissingField {
            field,
            column: column.to_string(),
        }),
    }
}

fn optional<'a>(raw: &'a RawRecord, mapping: &CategoryMapping, field: LogicalField) -> Option<&'a str> {
    let column = mapping.column(field)?;
    cell(raw, column).filter(|value| !value.trim().is_empty())
}

/// Parse a money field. Required fields error when blank; optional fields
/// come back as `None`.
fn money(
    raw: &RawRecord,
    mapping: &CategoryMapping,
    field: LogicalField,
) -> Result<Option<Decimal>, MappingError> {
    let text = if field.is_required() {
        Some(required(raw, mapping, field)?)
    } else {
        optional(raw, mapping, field)
    };

    match text {
        Some(text) => parsers::parse_money(text)
            .map(Some)
            .map_err(|reason| invalid(mapping, field, text, reason)),
        None => Ok(None),
    }
}

fn invalid(mapping: &CategoryMapping, field: LogicalField, value: &str, reason: String) -> MappingError {
    MappingError::InvalidValue {
        field,
        column: mapping.column(field).unwrap_or_default().to_string(),
        value: value.to_string(),
        reason,
    }
}
