//! Spec mutator: fixed image sizes, output color space, flexible size ranges.

use crate::error::SpecResult;
use crate::plan::ValidatedPlan;
use crate::spec::{
    ColorSpace, FeatureRole, ImageSizeRange, MINIMUM_FLEXIBLE_SHAPES_VERSION, ModelSpec,
    SizeFlexibility,
};
use serde::Serialize;
use tracing::{debug, warn};

/// What `apply_plan` changed, for the command's summary line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditSummary {
    pub input: String,
    pub output: String,
    pub flexible: Vec<String>,
    pub specification_version: i32,
}

/// Apply every edit of `plan`. Stops at the first failure; the caller must
/// not save a spec for which this returned an error.
pub fn apply_plan(spec: &mut ModelSpec, plan: &ValidatedPlan) -> SpecResult<EditSummary> {
    let input = set_image_size(spec, FeatureRole::Input, plan.size, None)?;
    let output = set_image_size(
        spec,
        FeatureRole::Output,
        plan.size,
        Some(plan.output_color_space),
    )?;

    for name in &plan.flexible_features {
        update_image_size_range(spec, name, plan.size_range)?;
    }

    Ok(EditSummary {
        input,
        output,
        flexible: plan.flexible_features.clone(),
        specification_version: spec.specification_version()?,
    })
}

/// Set height and width of the first `role` feature (and optionally its color
/// space). Returns the feature name.
pub fn set_image_size(
    spec: &mut ModelSpec,
    role: FeatureRole,
    size: i64,
    color_space: Option<ColorSpace>,
) -> SpecResult<String> {
    spec.edit_feature_at(role, 0, |feature| {
        let name = feature.name()?;
        feature.edit_image(|image| {
            let before = image.view()?;
            image.set_size(size, size);
            if let Some(color_space) = color_space {
                image.set_color_space(color_space);
            }
            debug!(
                feature = %name,
                %role,
                from = %format!("{}x{}", before.height, before.width),
                to = %format!("{}x{}", size, size),
                "set image size"
            );
            Ok(())
        })?;
        Ok(name)
    })
}

/// Make the image feature `name` accept any size inside `range`, replacing
/// any flexibility it had, and raise the spec version to one that supports it.
pub fn update_image_size_range(
    spec: &mut ModelSpec,
    name: &str,
    range: ImageSizeRange,
) -> SpecResult<()> {
    let previous = spec.edit_feature_named(name, |feature| {
        feature.edit_image(|image| image.set_size_range(range))
    })?;

    match previous {
        SizeFlexibility::Fixed => {}
        other => warn!(feature = %name, previous = %other, "replacing existing size flexibility"),
    }
    debug!(feature = %name, %range, "set flexible size range");

    let version = spec.specification_version()?;
    if version < MINIMUM_FLEXIBLE_SHAPES_VERSION {
        debug!(from = version, to = MINIMUM_FLEXIBLE_SHAPES_VERSION, "raise specification version");
        spec.set_specification_version(MINIMUM_FLEXIBLE_SHAPES_VERSION);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SpecError;
    use crate::plan::EditPlan;
    use crate::spec::feature::build::{array_feature, image_feature, with_enumerated_sizes};
    use crate::spec::model::build::model;
    use crate::spec::SizeRange;
    use crate::spec::feature::{FeatureKind, ImageFeature};
    use bytes::Bytes;
    use pretty_assertions::assert_eq;

    fn deeplab() -> ModelSpec {
        model(
            &[image_feature("image", 513, 513, ColorSpace::Rgb)],
            &[image_feature("semanticPredictions", 513, 513, ColorSpace::Rgb)],
            &[],
        )
    }

    fn default_plan() -> ValidatedPlan {
        EditPlan::default().validate_and_build().unwrap()
    }

    #[test]
    fn default_plan_matches_reference_edit() {
        let mut spec = deeplab();
        let summary = apply_plan(&mut spec, &default_plan()).unwrap();
        assert_eq!(
            summary,
            EditSummary {
                input: "image".into(),
                output: "semanticPredictions".into(),
                flexible: vec!["image".into(), "semanticPredictions".into()],
                specification_version: 3,
            }
        );

        let reloaded = ModelSpec::decode(Bytes::from(spec.encode_to_vec())).unwrap();
        let description = reloaded.description().unwrap();
        let range = ImageSizeRange::new(
            SizeRange::new(512, 1024).unwrap(),
            SizeRange::new(512, 1024).unwrap(),
        );

        assert_eq!(
            description.inputs[0].kind,
            FeatureKind::Image(ImageFeature {
                width: 1024,
                height: 1024,
                color_space: ColorSpace::Rgb,
                flexibility: SizeFlexibility::Range { range },
            })
        );
        assert_eq!(
            description.outputs[0].kind,
            FeatureKind::Image(ImageFeature {
                width: 1024,
                height: 1024,
                color_space: ColorSpace::Grayscale,
                flexibility: SizeFlexibility::Range { range },
            })
        );
    }

    #[test]
    fn flexible_feature_accepts_sizes_inside_range_only() {
        let mut spec = deeplab();
        apply_plan(&mut spec, &default_plan()).unwrap();
        let (_, _, feature) = spec.find_feature("image").unwrap();
        let image = feature.image().unwrap();
        for side in [512, 768, 1024] {
            assert!(image.accepts(side, side));
        }
        assert!(!image.accepts(256, 256));
        assert!(!image.accepts(2048, 2048));
    }

    #[test]
    fn newer_specification_version_is_kept() {
        let mut spec = deeplab();
        spec.set_specification_version(7);
        apply_plan(&mut spec, &default_plan()).unwrap();
        assert_eq!(spec.specification_version().unwrap(), 7);
    }

    #[test]
    fn enumerated_sizes_are_replaced_by_range() {
        let mut spec = model(
            &[with_enumerated_sizes(
                image_feature("image", 512, 512, ColorSpace::Rgb),
                &[(512, 512)],
            )],
            &[],
            &[],
        );
        let range = ImageSizeRange::new(
            SizeRange::new(256, -1).unwrap(),
            SizeRange::new(256, -1).unwrap(),
        );
        update_image_size_range(&mut spec, "image", range).unwrap();
        let (_, _, feature) = spec.find_feature("image").unwrap();
        assert_eq!(
            feature.image().unwrap().flexibility,
            SizeFlexibility::Range { range }
        );
    }

    #[test]
    fn missing_flexible_feature_is_an_error() {
        let mut spec = deeplab();
        let err = update_image_size_range(&mut spec, "nope", ImageSizeRange::default()).unwrap_err();
        assert!(matches!(err, SpecError::FeatureNotFound(_)));
    }

    #[test]
    fn non_image_output_is_an_error() {
        let mut spec = model(
            &[image_feature("image", 513, 513, ColorSpace::Rgb)],
            &[array_feature("semanticPredictions", &[513, 513])],
            &[],
        );
        let err = apply_plan(&mut spec, &default_plan()).unwrap_err();
        assert!(matches!(err, SpecError::NotAnImage { ref name, .. } if name == "semanticPredictions"));
    }

    #[test]
    fn model_without_outputs_is_an_error() {
        let mut spec = model(&[image_feature("image", 513, 513, ColorSpace::Rgb)], &[], &[]);
        let err = apply_plan(&mut spec, &default_plan()).unwrap_err();
        assert!(matches!(err, SpecError::NoFeatures(FeatureRole::Output)));
    }
}
