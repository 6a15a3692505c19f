use crate::edit::EditSummary;
use crate::inspect::{LayerEntry, LayerReport, ModelSummary, SizeCheck};
use crate::spec::FeatureDescription;
use std::fmt::Write;

/// Layer count, then one block per entry in scan order.
///
/// Resize entries print the name and `[h, w]` on separate lines; dumps print
/// the layer text followed by a blank line.
pub fn render_layer_report(report: &LayerReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", report.layer_count);

    for entry in &report.entries {
        match entry {
            LayerEntry::Resize { name, target_size } => {
                let sizes: Vec<String> = target_size.iter().map(|v| v.to_string()).collect();
                let _ = writeln!(out, "{}", name);
                let _ = writeln!(out, "[{}]", sizes.join(", "));
            }
            LayerEntry::Dump { text, .. } => {
                out.push_str(text);
                out.push('\n');
            }
        }
    }
    out
}

pub fn render_model_summary(summary: &ModelSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "specification version: {}", summary.specification_version);
    let _ = writeln!(
        out,
        "model type: {}",
        summary.model_type.as_deref().unwrap_or("none")
    );
    let _ = writeln!(out, "layers: {}", summary.layer_count);

    let description = &summary.description;
    write_features(&mut out, "inputs", &description.inputs);
    write_features(&mut out, "outputs", &description.outputs);

    if !description.predicted_feature_name.is_empty() {
        let _ = writeln!(out, "predicted feature: {}", description.predicted_feature_name);
    }
    if let Some(meta) = &description.metadata {
        for (key, value) in [
            ("author", &meta.author),
            ("license", &meta.license),
            ("version", &meta.version),
            ("description", &meta.short_description),
        ] {
            if !value.is_empty() {
                let _ = writeln!(out, "{}: {}", key, value);
            }
        }
    }
    out
}

fn write_features(out: &mut String, heading: &str, features: &[FeatureDescription]) {
    let _ = writeln!(out, "{}:", heading);
    for feature in features {
        let optional = if feature.optional { " (optional)" } else { "" };
        let _ = writeln!(out, "  {}: {}{}", feature.name, feature.kind, optional);
    }
}

pub fn render_size_check(check: &SizeCheck) -> String {
    format!(
        "{} {}: {}x{} {} ({})\n",
        check.role,
        check.feature,
        check.height,
        check.width,
        if check.accepted { "accepted" } else { "rejected" },
        check.flexibility
    )
}

pub fn render_edit_summary(summary: &EditSummary) -> String {
    format!(
        "input {} and output {} resized; flexible: {}; specification version {}\n",
        summary.input,
        summary.output,
        summary.flexible.join(", "),
        summary.specification_version
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect::build_model_summary;
    use crate::spec::ColorSpace;
    use crate::spec::feature::build::{array_feature, image_feature};
    use crate::spec::model::build::model;
    use pretty_assertions::assert_eq;

    #[test]
    fn layer_report_text() {
        let report = LayerReport {
            layer_count: 2,
            entries: vec![
                LayerEntry::Resize {
                    name: "ResizeBilinear:0".into(),
                    target_size: vec![513, 513],
                },
                LayerEntry::Dump {
                    name: "concat:0".into(),
                    text: "name: \"concat:0\"\n".into(),
                },
            ],
        };
        assert_eq!(
            render_layer_report(&report),
            "2\nResizeBilinear:0\n[513, 513]\nname: \"concat:0\"\n\n"
        );
    }

    #[test]
    fn empty_report_is_just_the_count() {
        let report = LayerReport {
            layer_count: 0,
            entries: vec![],
        };
        assert_eq!(render_layer_report(&report), "0\n");
    }

    #[test]
    fn summary_text() {
        let spec = model(
            &[image_feature("image", 513, 513, ColorSpace::Rgb)],
            &[array_feature("scores", &[21, 513, 513])],
            &[],
        );
        let summary = build_model_summary(&spec).unwrap();
        assert_eq!(
            render_model_summary(&summary),
            "specification version: 1\n\
             model type: neuralNetwork\n\
             layers: 0\n\
             inputs:\n  image: image 513x513 RGB (fixed)\n\
             outputs:\n  scores: multiArray [21, 513, 513]\n"
        );
    }
}
