//! The top-level `Model` message.
//!
//! Only the fields the tools touch are interpreted; everything else stays in
//! the underlying `RawMessage` and is written back verbatim.

use crate::error::{SpecError, SpecResult};
use crate::spec::feature::{FeatureDescription, FeatureEditor, FeatureRole};
use crate::spec::layer::Layer;
use crate::wire::RawMessage;
use bytes::Bytes;
use serde::Serialize;

const SPECIFICATION_VERSION: u32 = 1;
const DESCRIPTION: u32 = 2;

/// Model types that carry a `layers` list at field 1.
const NEURAL_NETWORK_REGRESSOR: u32 = 303;
const NEURAL_NETWORK_CLASSIFIER: u32 = 403;
const NEURAL_NETWORK: u32 = 500;
const LAYERS: u32 = 1;

// ModelDescription
const PREDICTED_FEATURE_NAME: u32 = 11;
const PREDICTED_PROBABILITIES_NAME: u32 = 12;
const METADATA: u32 = 100;

// Metadata
const META_SHORT_DESCRIPTION: u32 = 1;
const META_VERSION: u32 = 2;
const META_AUTHOR: u32 = 3;
const META_LICENSE: u32 = 4;

/// Flexible image sizes need at least this specification version.
pub const MINIMUM_FLEXIBLE_SHAPES_VERSION: i32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    raw: RawMessage,
}

impl ModelSpec {
    pub fn decode(buf: Bytes) -> SpecResult<Self> {
        Ok(Self {
            raw: RawMessage::decode(buf)?,
        })
    }

    #[cfg(test)]
    pub fn from_raw(raw: RawMessage) -> Self {
        Self { raw }
    }

    pub fn encode_to_vec(&self) -> Vec<u8> {
        self.raw.encode_to_vec()
    }

    pub fn specification_version(&self) -> SpecResult<i32> {
        self.raw.int32(SPECIFICATION_VERSION)
    }

    pub fn set_specification_version(&mut self, version: i32) {
        self.raw.set_int32(SPECIFICATION_VERSION, version);
    }

    /// Name of the model-type oneof member, e.g. `neuralNetwork`. Field
    /// numbers outside the known model types are ignored.
    pub fn model_type(&self) -> Option<&'static str> {
        self.raw
            .last_tag_in(|t| model_type_name(t).is_some())
            .and_then(model_type_name)
    }

    /// Layers of the neural network, in model order. Models that are not
    /// neural networks have none.
    pub fn layers(&self) -> SpecResult<Vec<Layer>> {
        let tag = self.raw.last_tag_in(|t| {
            matches!(
                t,
                NEURAL_NETWORK | NEURAL_NETWORK_CLASSIFIER | NEURAL_NETWORK_REGRESSOR
            )
        });
        let network = match tag {
            Some(t) => self.raw.message(t)?,
            None => None,
        };
        let Some(network) = network else {
            return Ok(Vec::new());
        };
        network
            .messages(LAYERS)?
            .into_iter()
            .map(Layer::from_raw)
            .collect()
    }

    pub fn description(&self) -> SpecResult<ModelDescription> {
        let raw = self.raw.message(DESCRIPTION)?.unwrap_or_default();
        ModelDescription::from_raw(&raw)
    }

    /// Look a feature up by name, inputs first, then outputs.
    pub fn find_feature(&self, name: &str) -> SpecResult<(FeatureRole, usize, FeatureDescription)> {
        let description = self.description()?;
        let inputs = description.inputs.into_iter().map(|f| (FeatureRole::Input, f));
        let outputs = description.outputs.into_iter().map(|f| (FeatureRole::Output, f));

        let mut counts = [0usize; 2];
        for (role, feature) in inputs.chain(outputs) {
            let slot = match role {
                FeatureRole::Input => 0,
                FeatureRole::Output => 1,
            };
            if feature.name == name {
                return Ok((role, counts[slot], feature));
            }
            counts[slot] += 1;
        }
        Err(SpecError::FeatureNotFound(name.to_string()))
    }

    /// Edit the `index`-th input or output feature in place.
    pub fn edit_feature_at<T>(
        &mut self,
        role: FeatureRole,
        index: usize,
        f: impl FnOnce(&mut FeatureEditor<'_>) -> SpecResult<T>,
    ) -> SpecResult<T> {
        let tag = role.tag();
        self.raw.update_message(DESCRIPTION, |description| {
            if !description.has(tag) {
                return Err(SpecError::NoFeatures(role));
            }
            description
                .update_repeated(tag, index, |feature| f(&mut FeatureEditor::new(feature)))?
                .ok_or(SpecError::MissingFeature { role, index })
        })
    }

    /// Edit the feature called `name`, searching inputs first, then outputs.
    pub fn edit_feature_named<T>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut FeatureEditor<'_>) -> SpecResult<T>,
    ) -> SpecResult<T> {
        let (role, index, _) = self.find_feature(name)?;
        self.edit_feature_at(role, index, f)
    }

    #[cfg(test)]
    pub fn raw(&self) -> &RawMessage {
        &self.raw
    }

    #[cfg(test)]
    pub fn raw_mut(&mut self) -> &mut RawMessage {
        &mut self.raw
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelDescription {
    pub inputs: Vec<FeatureDescription>,
    pub outputs: Vec<FeatureDescription>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub predicted_feature_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub predicted_probabilities_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl ModelDescription {
    fn from_raw(raw: &RawMessage) -> SpecResult<Self> {
        let features = |role: FeatureRole| -> SpecResult<Vec<FeatureDescription>> {
            raw.messages(role.tag())?
                .iter()
                .map(FeatureDescription::from_raw)
                .collect()
        };
        Ok(Self {
            inputs: features(FeatureRole::Input)?,
            outputs: features(FeatureRole::Output)?,
            predicted_feature_name: raw.string(PREDICTED_FEATURE_NAME)?,
            predicted_probabilities_name: raw.string(PREDICTED_PROBABILITIES_NAME)?,
            metadata: raw
                .message(METADATA)?
                .map(|m| Metadata::from_raw(&m))
                .transpose()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub short_description: String,
    pub version: String,
    pub author: String,
    pub license: String,
}

impl Metadata {
    fn from_raw(raw: &RawMessage) -> SpecResult<Self> {
        Ok(Self {
            short_description: raw.string(META_SHORT_DESCRIPTION)?,
            version: raw.string(META_VERSION)?,
            author: raw.string(META_AUTHOR)?,
            license: raw.string(META_LICENSE)?,
        })
    }
}

fn model_type_name(tag: u32) -> Option<&'static str> {
    let name = match tag {
        200 => "pipelineClassifier",
        201 => "pipelineRegressor",
        202 => "pipeline",
        300 => "glmRegressor",
        301 => "supportVectorRegressor",
        302 => "treeEnsembleRegressor",
        NEURAL_NETWORK_REGRESSOR => "neuralNetworkRegressor",
        304 => "bayesianProbitRegressor",
        400 => "glmClassifier",
        401 => "supportVectorClassifier",
        402 => "treeEnsembleClassifier",
        NEURAL_NETWORK_CLASSIFIER => "neuralNetworkClassifier",
        404 => "kNearestNeighborsClassifier",
        NEURAL_NETWORK => "neuralNetwork",
        501 => "itemSimilarityRecommender",
        502 => "mlProgram",
        555 => "customModel",
        556 => "linkedModel",
        _ => return None,
    };
    Some(name)
}
