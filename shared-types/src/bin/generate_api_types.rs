use shared_types::*;
use std::fs;
use std::path::Path;
use ts_rs::TS;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Generate TypeScript definitions for the reporting UI
    let mut types = Vec::new();

    // Reference data
    types.push(clean_type(CostCategory::export_to_string()?));
    types.push(clean_type(Percentage::export_to_string()?));
    types.push(clean_type(LogicalField::export_to_string()?));
    types.push(clean_type(Component::export_to_string()?));

    // Line items
    types.push(clean_type(LineItemId::export_to_string()?));
    types.push(clean_type(ConnectedComparison::export_to_string()?));
    types.push(clean_type(LineItem::export_to_string()?));

    // Evaluation and flags
    types.push(clean_type(FlagCode::export_to_string()?));
    types.push(clean_type(Flag::export_to_string()?));
    types.push(clean_type(Annotation::export_to_string()?));
    types.push(clean_type(LineStatus::export_to_string()?));
    types.push(clean_type(RateSource::export_to_string()?));
    types.push(clean_type(Evaluation::export_to_string()?));

    // Claim types
    types.push(clean_type(ClaimId::export_to_string()?));
    types.push(clean_type(Scheme::export_to_string()?));
    types.push(clean_type(ClaimParameters::export_to_string()?));
    types.push(clean_type(Claim::export_to_string()?));
    types.push(clean_type(CategoryTotal::export_to_string()?));
    types.push(clean_type(PayeCapOutcome::export_to_string()?));
    types.push(clean_type(CreditEstimate::export_to_string()?));
    types.push(clean_type(ClaimTotals::export_to_string()?));

    // Report types
    types.push(clean_type(CategorySummary::export_to_string()?));
    types.push(clean_type(ClaimSummary::export_to_string()?));
    types.push(clean_type(LineBreakdownRow::export_to_string()?));
    types.push(clean_type(PersonSummary::export_to_string()?));

    let output_dir = Path::new("../gui/src/api-types");
    fs::create_dir_all(output_dir)?;

    let output_path = output_dir.join("types.ts");
    let output = types.join("\n\n");

    fs::write(&output_path, output)?;
    println!("Generated TypeScript types in {}", output_path.display());

    Ok(())
}

fn clean_type(mut type_def: String) -> String {
    type_def.retain(|c| c != '\r');

    // Everything lands in one file, so cross-type imports are dropped.
    let filtered: Vec<&str> = type_def
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.starts_with("import type")
                && !trimmed.starts_with("// This file was generated")
                && !trimmed.starts_with("/* This file was generated")
        })
        .collect();

    let result = filtered.join("\n").trim().to_string();
    if result.is_empty() {
        result
    } else {
        format!("{}\n", result)
    }
}
