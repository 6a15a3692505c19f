//! Read-only reports: layer scan, model summary, image size check.

use crate::error::SpecResult;
use crate::render::textproto;
use crate::spec::{FeatureRole, ModelDescription, ModelSpec, SizeFlexibility};
use anyhow::Context;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;

/// Layers dumped in full when no `--show` names are given.
pub const DEFAULT_DUMP_NAMES: [&str; 3] = ["concat:0", "ResizeBilinear_1:0", "aspp0/Relu:0"];

/// Which layers get a full dump: exact names, plus an optional pattern.
#[derive(Debug, Clone)]
pub struct LayerFilter {
    names: BTreeSet<String>,
    pattern: Option<Regex>,
}

impl LayerFilter {
    pub fn new(names: Vec<String>, pattern: Option<&str>) -> anyhow::Result<Self> {
        let names = if names.is_empty() {
            DEFAULT_DUMP_NAMES.iter().map(|n| n.to_string()).collect()
        } else {
            names.into_iter().collect()
        };
        let pattern = pattern
            .map(|p| Regex::new(p).with_context(|| format!("bad layer pattern {:?}", p)))
            .transpose()?;
        Ok(Self { names, pattern })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.names.contains(name) || self.pattern.as_ref().is_some_and(|re| re.is_match(name))
    }
}

impl Default for LayerFilter {
    fn default() -> Self {
        Self {
            names: DEFAULT_DUMP_NAMES.iter().map(|n| n.to_string()).collect(),
            pattern: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerReport {
    pub layer_count: usize,
    pub entries: Vec<LayerEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayerEntry {
    /// A resize layer with a two-element target size.
    Resize { name: String, target_size: Vec<u64> },
    /// Full text dump of a selected layer.
    Dump { name: String, text: String },
}

/// Scan layers in model order. A layer can yield both a resize entry and a
/// dump entry; the resize entry comes first.
pub fn build_layer_report(spec: &ModelSpec, filter: &LayerFilter) -> SpecResult<LayerReport> {
    let layers = spec.layers()?;
    let mut entries = Vec::new();

    for layer in &layers {
        let target_size = layer.resize_target_size()?;
        if target_size.len() == 2 {
            entries.push(LayerEntry::Resize {
                name: layer.name.clone(),
                target_size,
            });
        }

        if filter.matches(&layer.name) {
            entries.push(LayerEntry::Dump {
                name: layer.name.clone(),
                text: textproto::render_layer(layer),
            });
        }
    }

    Ok(LayerReport {
        layer_count: layers.len(),
        entries,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelSummary {
    pub specification_version: i32,
    pub model_type: Option<String>,
    pub layer_count: usize,
    pub description: ModelDescription,
}

pub fn build_model_summary(spec: &ModelSpec) -> SpecResult<ModelSummary> {
    Ok(ModelSummary {
        specification_version: spec.specification_version()?,
        model_type: spec.model_type().map(str::to_string),
        layer_count: spec.layers()?.len(),
        description: spec.description()?,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizeCheck {
    pub feature: String,
    pub role: FeatureRole,
    pub height: u64,
    pub width: u64,
    pub accepted: bool,
    pub flexibility: SizeFlexibility,
}

/// Would the image feature `name` accept a `height` x `width` image?
pub fn check_image_size(
    spec: &ModelSpec,
    name: &str,
    height: u64,
    width: u64,
) -> anyhow::Result<SizeCheck> {
    let (role, _, feature) = spec.find_feature(name)?;
    let Some(image) = feature.image() else {
        anyhow::bail!("feature {} is of type {}, not an image", name, feature.kind);
    };
    Ok(SizeCheck {
        feature: feature.name.clone(),
        role,
        height,
        width,
        accepted: image.accepts(height, width),
        flexibility: image.flexibility.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::ColorSpace;
    use crate::spec::feature::build::{array_feature, image_feature};
    use crate::spec::layer::build::{layer, resize_layer};
    use crate::spec::model::build::model;
    use crate::wire::RawMessage;
    use pretty_assertions::assert_eq;

    fn names(report: &LayerReport) -> Vec<String> {
        report
            .entries
            .iter()
            .map(|e| match e {
                LayerEntry::Resize { name, .. } => format!("resize:{}", name),
                LayerEntry::Dump { name, .. } => format!("dump:{}", name),
            })
            .collect()
    }

    #[test]
    fn zero_layers_yield_only_a_count() {
        let spec = model(&[], &[], &[]);
        let report = build_layer_report(&spec, &LayerFilter::default()).unwrap();
        assert_eq!(
            report,
            LayerReport {
                layer_count: 0,
                entries: vec![]
            }
        );
    }

    #[test]
    fn only_two_element_target_sizes_are_reported() {
        let spec = model(
            &[],
            &[],
            &[
                resize_layer("one", &[513]),
                resize_layer("two", &[513, 513]),
                resize_layer("three", &[1, 513, 513]),
            ],
        );
        let report = build_layer_report(&spec, &LayerFilter::default()).unwrap();
        assert_eq!(report.layer_count, 3);
        assert_eq!(
            report.entries,
            vec![LayerEntry::Resize {
                name: "two".into(),
                target_size: vec![513, 513]
            }]
        );
    }

    #[test]
    fn exact_names_are_dumped() {
        let spec = model(
            &[],
            &[],
            &[
                layer("concat:0", 320, &RawMessage::new()),
                layer("concat:1", 320, &RawMessage::new()),
            ],
        );
        let report = build_layer_report(&spec, &LayerFilter::default()).unwrap();
        assert_eq!(names(&report), vec!["dump:concat:0"]);
    }

    #[test]
    fn resize_entry_precedes_dump_of_same_layer() {
        let spec = model(&[], &[], &[resize_layer("ResizeBilinear_1:0", &[65, 65])]);
        let report = build_layer_report(&spec, &LayerFilter::default()).unwrap();
        assert_eq!(
            names(&report),
            vec!["resize:ResizeBilinear_1:0", "dump:ResizeBilinear_1:0"]
        );
    }

    #[test]
    fn custom_names_and_pattern() {
        let spec = model(
            &[],
            &[],
            &[
                layer("concat:0", 320, &RawMessage::new()),
                layer("aspp1/Relu:0", 130, &RawMessage::new()),
                layer("logits", 100, &RawMessage::new()),
            ],
        );
        let filter = LayerFilter::new(vec!["logits".into()], Some(r"^aspp\d+/")).unwrap();
        let report = build_layer_report(&spec, &filter).unwrap();
        assert_eq!(names(&report), vec!["dump:aspp1/Relu:0", "dump:logits"]);
    }

    #[test]
    fn bad_pattern_is_rejected() {
        assert!(LayerFilter::new(vec![], Some("(")).is_err());
    }

    #[test]
    fn size_check_on_fixed_and_non_image_features() {
        let spec = model(
            &[image_feature("image", 513, 513, ColorSpace::Rgb)],
            &[array_feature("scores", &[21])],
            &[],
        );
        let check = check_image_size(&spec, "image", 513, 513).unwrap();
        assert!(check.accepted);
        assert_eq!(check.role, FeatureRole::Input);
        assert!(!check_image_size(&spec, "image", 512, 512).unwrap().accepted);
        assert!(check_image_size(&spec, "scores", 1, 1).is_err());
        assert!(check_image_size(&spec, "nope", 1, 1).is_err());
    }

    #[test]
    fn summary_counts_layers() {
        let spec = model(
            &[image_feature("image", 513, 513, ColorSpace::Rgb)],
            &[],
            &[layer("a", 100, &RawMessage::new())],
        );
        let summary = build_model_summary(&spec).unwrap();
        assert_eq!(summary.layer_count, 1);
        assert_eq!(summary.model_type.as_deref(), Some("neuralNetwork"));
        assert_eq!(summary.specification_version, 1);
        assert_eq!(summary.description.inputs[0].name, "image");
    }
}
