//! Edit plan (plan.json) for `mlspec update`.
//!
//! JSON shape (every field optional):
//! {
//!   "size": 1024,                       // fixed input/output image side
//!   "output_color_space": "GRAYSCALE",
//!   "flexible": {
//!     "height": [512, 1024],            // upper -1 = unbounded
//!     "width": [512, 1024],
//!     "features": ["image", "semanticPredictions"]
//!   }
//! }
//!
//! Missing values fall back to the defaults below; command-line flags are
//! layered on top with `apply_overrides` before validation.

use crate::spec::{ColorSpace, ImageSizeRange, SizeRange};
use anyhow::{Context, bail};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

pub const DEFAULT_SIZE: i64 = 1024;
pub const DEFAULT_COLOR_SPACE: &str = "GRAYSCALE";
pub const DEFAULT_RANGE: (u64, i64) = (512, 1024);
pub const DEFAULT_FLEXIBLE_FEATURES: [&str; 2] = ["image", "semanticPredictions"];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditPlan {
    #[serde(default)]
    pub size: Option<i64>,

    #[serde(default)]
    pub output_color_space: Option<String>,

    #[serde(default)]
    pub flexible: RawFlexible,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawFlexible {
    #[serde(default)]
    pub height: Option<(u64, i64)>,

    #[serde(default)]
    pub width: Option<(u64, i64)>,

    #[serde(default)]
    pub features: Option<Vec<String>>,
}

/// Values given on the command line; each one wins over the plan file.
#[derive(Debug, Clone, Default)]
pub struct PlanOverrides {
    pub size: Option<i64>,
    pub output_color_space: Option<String>,
    pub height_range: Option<SizeRange>,
    pub width_range: Option<SizeRange>,
    pub flexible_features: Vec<String>,
}

/// Checked plan, ready to apply to a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPlan {
    pub size: i64,
    pub output_color_space: ColorSpace,
    pub size_range: ImageSizeRange,
    pub flexible_features: Vec<String>,
}

impl EditPlan {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("read plan file {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parse plan file {}", path.display()))
    }

    pub fn apply_overrides(mut self, overrides: PlanOverrides) -> Self {
        if let Some(size) = overrides.size {
            self.size = Some(size);
        }
        if let Some(color) = overrides.output_color_space {
            self.output_color_space = Some(color);
        }
        if let Some(range) = overrides.height_range {
            self.flexible.height = Some(range_tuple(range));
        }
        if let Some(range) = overrides.width_range {
            self.flexible.width = Some(range_tuple(range));
        }
        if !overrides.flexible_features.is_empty() {
            self.flexible.features = Some(overrides.flexible_features);
        }
        self
    }

    /// Fill defaults and check every value before any model is touched.
    pub fn validate_and_build(&self) -> anyhow::Result<ValidatedPlan> {
        let size = self.size.unwrap_or(DEFAULT_SIZE);
        if size < 1 {
            bail!("size must be positive, got {}", size);
        }

        let output_color_space: ColorSpace = self
            .output_color_space
            .as_deref()
            .unwrap_or(DEFAULT_COLOR_SPACE)
            .parse()?;

        let (lo, hi) = self.flexible.height.unwrap_or(DEFAULT_RANGE);
        let height = SizeRange::new(lo, hi).context("flexible height range")?;
        let (lo, hi) = self.flexible.width.unwrap_or(DEFAULT_RANGE);
        let width = SizeRange::new(lo, hi).context("flexible width range")?;

        let flexible_features = match &self.flexible.features {
            Some(features) => features.clone(),
            None => DEFAULT_FLEXIBLE_FEATURES.iter().map(|f| f.to_string()).collect(),
        };
        if flexible_features.is_empty() {
            bail!("flexible.features must name at least one feature");
        }
        let mut seen = BTreeSet::new();
        for name in &flexible_features {
            if name.is_empty() {
                bail!("flexible.features contains an empty name");
            }
            if !seen.insert(name.as_str()) {
                bail!("duplicate feature in flexible.features: {}", name);
            }
        }

        Ok(ValidatedPlan {
            size,
            output_color_space,
            size_range: ImageSizeRange::new(height, width),
            flexible_features,
        })
    }
}

fn range_tuple(range: SizeRange) -> (u64, i64) {
    let upper = range
        .upper()
        .map_or(crate::spec::range::UNBOUNDED, |u| u as i64);
    (range.lower(), upper)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn range(lo: u64, hi: i64) -> SizeRange {
        SizeRange::new(lo, hi).unwrap()
    }

    #[test]
    fn empty_plan_uses_defaults() {
        let plan: EditPlan = serde_json::from_str("{}").unwrap();
        let validated = plan.validate_and_build().unwrap();
        assert_eq!(
            validated,
            ValidatedPlan {
                size: 1024,
                output_color_space: ColorSpace::Grayscale,
                size_range: ImageSizeRange::new(range(512, 1024), range(512, 1024)),
                flexible_features: vec!["image".to_string(), "semanticPredictions".to_string()],
            }
        );
    }

    #[test]
    fn overrides_win_over_file_values() {
        let plan: EditPlan = serde_json::from_str(
            r#"{"size": 768, "flexible": {"height": [256, -1], "features": ["input"]}}"#,
        )
        .unwrap();
        let validated = plan
            .apply_overrides(PlanOverrides {
                size: Some(512),
                output_color_space: Some("rgb".into()),
                width_range: Some(range(64, 128)),
                ..Default::default()
            })
            .validate_and_build()
            .unwrap();

        assert_eq!(validated.size, 512);
        assert_eq!(validated.output_color_space, ColorSpace::Rgb);
        assert_eq!(validated.size_range.height, range(256, -1));
        assert_eq!(validated.size_range.width, range(64, 128));
        assert_eq!(validated.flexible_features, vec!["input"]);
    }

    #[test]
    fn rejects_bad_values() {
        let cases = [
            r#"{"size": 0}"#,
            r#"{"output_color_space": "CMYK"}"#,
            r#"{"flexible": {"height": [1024, 512]}}"#,
            r#"{"flexible": {"features": []}}"#,
            r#"{"flexible": {"features": ["image", "image"]}}"#,
        ];
        for case in cases {
            let plan: EditPlan = serde_json::from_str(case).unwrap();
            assert!(plan.validate_and_build().is_err(), "accepted {}", case);
        }
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(serde_json::from_str::<EditPlan>(r#"{"sise": 3}"#).is_err());
    }
}
