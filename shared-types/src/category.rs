use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

/// Cost categories recognised for an R&D claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
pub enum CostCategory {
    Staff,
    Subcontractor,
    #[serde(alias = "EPW")]
    Epw,
    Software,
    #[serde(alias = "cloud")]
    CloudCompute,
    Consumables,
}

impl CostCategory {
    pub const ALL: [CostCategory; 6] = [
        CostCategory::Staff,
        CostCategory::Subcontractor,
        CostCategory::Epw,
        CostCategory::Software,
        CostCategory::CloudCompute,
        CostCategory::Consumables,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CostCategory::Staff => "staff",
            CostCategory::Subcontractor => "subcontractor",
            CostCategory::Epw => "epw",
            CostCategory::Software => "software",
            CostCategory::CloudCompute => "cloud-compute",
            CostCategory::Consumables => "consumables",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            CostCategory::Staff => "Staff Costs",
            CostCategory::Subcontractor => "Subcontractor Costs",
            CostCategory::Epw => "Externally Provided Workers",
            CostCategory::Software => "Software Costs",
            CostCategory::CloudCompute => "Cloud Computing",
            CostCategory::Consumables => "Consumables",
        }
    }

    /// Label used in flag messages, e.g. "EPW capped at 65%"
    pub fn short_name(&self) -> &'static str {
        match self {
            CostCategory::Staff => "Staff",
            CostCategory::Subcontractor => "Subcontractor",
            CostCategory::Epw => "EPW",
            CostCategory::Software => "Software",
            CostCategory::CloudCompute => "Cloud compute",
            CostCategory::Consumables => "Consumables",
        }
    }

    /// Subcontractor and EPW costs are paid to a third party, so connection
    /// status decides which restriction applies.
    pub fn is_third_party(&self) -> bool {
        matches!(self, CostCategory::Subcontractor | CostCategory::Epw)
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().replace('_', "-").as_str() {
            "staff" => Some(CostCategory::Staff),
            "subcontractor" | "subcontractors" => Some(CostCategory::Subcontractor),
            "epw" => Some(CostCategory::Epw),
            "software" => Some(CostCategory::Software),
            "cloud" | "cloud-compute" => Some(CostCategory::CloudCompute),
            "consumables" => Some(CostCategory::Consumables),
            _ => None,
        }
    }
}

impl fmt::Display for CostCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_config_spellings() {
        assert_eq!(CostCategory::parse("EPW"), Some(CostCategory::Epw));
        assert_eq!(CostCategory::parse("cloud_compute"), Some(CostCategory::CloudCompute));
        assert_eq!(CostCategory::parse(" Staff "), Some(CostCategory::Staff));
        assert_eq!(CostCategory::parse("equipment"), None);
    }

    #[test]
    fn test_serde_names_match_as_str() {
        for category in CostCategory::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.as_str()));
        }
    }
}
