//! Feature descriptions (model inputs and outputs) and image-type editing.

use crate::error::{SpecError, SpecResult};
use crate::spec::range::{ImageSize, ImageSizeRange};
use crate::wire::RawMessage;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

// FeatureDescription
const NAME: u32 = 1;
const SHORT_DESCRIPTION: u32 = 2;
const TYPE: u32 = 3;

// FeatureType oneof
const INT64_TYPE: u32 = 1;
const DOUBLE_TYPE: u32 = 2;
const STRING_TYPE: u32 = 3;
const IMAGE_TYPE: u32 = 4;
const MULTI_ARRAY_TYPE: u32 = 5;
const DICTIONARY_TYPE: u32 = 6;
const SEQUENCE_TYPE: u32 = 7;
const STATE_TYPE: u32 = 8;
const IS_OPTIONAL: u32 = 1000;

// ImageFeatureType
const IMAGE_WIDTH: u32 = 1;
const IMAGE_HEIGHT: u32 = 2;
const COLOR_SPACE: u32 = 3;
const ENUMERATED_SIZES: u32 = 21;
const IMAGE_SIZE_RANGE: u32 = 31;
const ENUMERATED_SIZE_LIST: u32 = 1;

// ArrayFeatureType
const ARRAY_SHAPE: u32 = 1;

/// Which side of the model description a feature lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureRole {
    Input,
    Output,
}

impl FeatureRole {
    /// Field number of the repeated feature list in `ModelDescription`.
    pub(crate) fn tag(self) -> u32 {
        match self {
            FeatureRole::Input => 1,
            FeatureRole::Output => 10,
        }
    }
}

impl fmt::Display for FeatureRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureRole::Input => f.write_str("input"),
            FeatureRole::Output => f.write_str("output"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum ColorSpace {
    Invalid,
    Grayscale,
    Rgb,
    Bgr,
    GrayscaleFloat16,
    Other(i32),
}

impl ColorSpace {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => ColorSpace::Invalid,
            10 => ColorSpace::Grayscale,
            20 => ColorSpace::Rgb,
            30 => ColorSpace::Bgr,
            40 => ColorSpace::GrayscaleFloat16,
            other => ColorSpace::Other(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            ColorSpace::Invalid => 0,
            ColorSpace::Grayscale => 10,
            ColorSpace::Rgb => 20,
            ColorSpace::Bgr => 30,
            ColorSpace::GrayscaleFloat16 => 40,
            ColorSpace::Other(code) => code,
        }
    }
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorSpace::Invalid => f.write_str("INVALID_COLOR_SPACE"),
            ColorSpace::Grayscale => f.write_str("GRAYSCALE"),
            ColorSpace::Rgb => f.write_str("RGB"),
            ColorSpace::Bgr => f.write_str("BGR"),
            ColorSpace::GrayscaleFloat16 => f.write_str("GRAYSCALE_FLOAT16"),
            ColorSpace::Other(code) => write!(f, "COLOR_SPACE_{}", code),
        }
    }
}

impl From<ColorSpace> for String {
    fn from(value: ColorSpace) -> Self {
        value.to_string()
    }
}

impl FromStr for ColorSpace {
    type Err = SpecError;

    /// Accepts the enum names case-insensitively; the invalid placeholder is
    /// not something anyone should write into a model.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "GRAYSCALE" => Ok(ColorSpace::Grayscale),
            "RGB" => Ok(ColorSpace::Rgb),
            "BGR" => Ok(ColorSpace::Bgr),
            "GRAYSCALE_FLOAT16" => Ok(ColorSpace::GrayscaleFloat16),
            _ => Err(SpecError::UnknownColorSpace(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SizeFlexibility {
    Fixed,
    Enumerated { sizes: Vec<ImageSize> },
    Range { range: ImageSizeRange },
}

impl SizeFlexibility {
    fn from_image_raw(raw: &RawMessage) -> SpecResult<Self> {
        match raw.last_tag_in(|t| t == ENUMERATED_SIZES || t == IMAGE_SIZE_RANGE) {
            Some(ENUMERATED_SIZES) => {
                let list = raw.message(ENUMERATED_SIZES)?.unwrap_or_default();
                let sizes = list
                    .messages(ENUMERATED_SIZE_LIST)?
                    .iter()
                    .map(ImageSize::from_raw)
                    .collect::<SpecResult<Vec<_>>>()?;
                Ok(SizeFlexibility::Enumerated { sizes })
            }
            Some(_) => {
                let range = raw.message(IMAGE_SIZE_RANGE)?.unwrap_or_default();
                Ok(SizeFlexibility::Range {
                    range: ImageSizeRange::from_raw(&range)?,
                })
            }
            None => Ok(SizeFlexibility::Fixed),
        }
    }
}

impl fmt::Display for SizeFlexibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeFlexibility::Fixed => f.write_str("fixed"),
            SizeFlexibility::Enumerated { sizes } => {
                let sizes: Vec<String> = sizes.iter().map(|s| s.to_string()).collect();
                write!(f, "enumerated [{}]", sizes.join(", "))
            }
            SizeFlexibility::Range { range } => write!(f, "range {}", range),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageFeature {
    pub width: i64,
    pub height: i64,
    pub color_space: ColorSpace,
    pub flexibility: SizeFlexibility,
}

impl ImageFeature {
    pub(crate) fn from_raw(raw: &RawMessage) -> SpecResult<Self> {
        Ok(Self {
            width: raw.int64(IMAGE_WIDTH)?,
            height: raw.int64(IMAGE_HEIGHT)?,
            color_space: ColorSpace::from_code(raw.int32(COLOR_SPACE)?),
            flexibility: SizeFlexibility::from_image_raw(raw)?,
        })
    }

    /// Whether an image of `height` x `width` satisfies this feature.
    pub fn accepts(&self, height: u64, width: u64) -> bool {
        match &self.flexibility {
            SizeFlexibility::Fixed => {
                i64::try_from(height).is_ok_and(|h| h == self.height)
                    && i64::try_from(width).is_ok_and(|w| w == self.width)
            }
            SizeFlexibility::Enumerated { sizes } => sizes
                .iter()
                .any(|s| s.height == height && s.width == width),
            SizeFlexibility::Range { range } => range.contains(height, width),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeatureKind {
    Int64,
    Double,
    String,
    Image(ImageFeature),
    MultiArray { shape: Vec<i64> },
    Dictionary,
    Sequence,
    State,
    Unset,
}

impl FeatureKind {
    fn from_type_raw(ty: &RawMessage) -> SpecResult<Self> {
        Ok(match type_tag(ty) {
            Some(INT64_TYPE) => FeatureKind::Int64,
            Some(DOUBLE_TYPE) => FeatureKind::Double,
            Some(STRING_TYPE) => FeatureKind::String,
            Some(IMAGE_TYPE) => {
                let image = ty.message(IMAGE_TYPE)?.unwrap_or_default();
                FeatureKind::Image(ImageFeature::from_raw(&image)?)
            }
            Some(MULTI_ARRAY_TYPE) => {
                let array = ty.message(MULTI_ARRAY_TYPE)?.unwrap_or_default();
                let shape = array
                    .packed_varints(ARRAY_SHAPE)?
                    .into_iter()
                    .map(|d| d as i64)
                    .collect();
                FeatureKind::MultiArray { shape }
            }
            Some(DICTIONARY_TYPE) => FeatureKind::Dictionary,
            Some(SEQUENCE_TYPE) => FeatureKind::Sequence,
            Some(STATE_TYPE) => FeatureKind::State,
            _ => FeatureKind::Unset,
        })
    }
}

fn type_tag(ty: &RawMessage) -> Option<u32> {
    ty.last_tag_in(|t| (INT64_TYPE..=STATE_TYPE).contains(&t))
}

fn type_label(tag: Option<u32>) -> &'static str {
    match tag {
        Some(INT64_TYPE) => "int64",
        Some(DOUBLE_TYPE) => "double",
        Some(STRING_TYPE) => "string",
        Some(IMAGE_TYPE) => "image",
        Some(MULTI_ARRAY_TYPE) => "multiArray",
        Some(DICTIONARY_TYPE) => "dictionary",
        Some(SEQUENCE_TYPE) => "sequence",
        Some(STATE_TYPE) => "state",
        _ => "unset",
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureKind::Image(image) => write!(
                f,
                "image {}x{} {} ({})",
                image.height, image.width, image.color_space, image.flexibility
            ),
            FeatureKind::MultiArray { shape } => write!(f, "multiArray {:?}", shape),
            FeatureKind::Int64 => f.write_str("int64"),
            FeatureKind::Double => f.write_str("double"),
            FeatureKind::String => f.write_str("string"),
            FeatureKind::Dictionary => f.write_str("dictionary"),
            FeatureKind::Sequence => f.write_str("sequence"),
            FeatureKind::State => f.write_str("state"),
            FeatureKind::Unset => f.write_str("unset"),
        }
    }
}

/// Read-only view of a `FeatureDescription`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureDescription {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub short_description: String,
    pub optional: bool,
    pub kind: FeatureKind,
}

impl FeatureDescription {
    pub(crate) fn from_raw(raw: &RawMessage) -> SpecResult<Self> {
        let ty = raw.message(TYPE)?.unwrap_or_default();
        Ok(Self {
            name: raw.string(NAME)?,
            short_description: raw.string(SHORT_DESCRIPTION)?,
            optional: ty.bool(IS_OPTIONAL)?,
            kind: FeatureKind::from_type_raw(&ty)?,
        })
    }

    pub fn image(&self) -> Option<&ImageFeature> {
        match &self.kind {
            FeatureKind::Image(image) => Some(image),
            _ => None,
        }
    }
}

/// Mutable access to one `FeatureDescription` inside the model.
pub struct FeatureEditor<'a> {
    raw: &'a mut RawMessage,
}

impl<'a> FeatureEditor<'a> {
    pub(crate) fn new(raw: &'a mut RawMessage) -> Self {
        Self { raw }
    }

    pub fn name(&self) -> SpecResult<String> {
        self.raw.string(NAME)
    }

    /// Edit the image type of this feature. Fails without touching anything
    /// when the feature holds some other type.
    pub fn edit_image<T>(
        &mut self,
        f: impl FnOnce(&mut ImageTypeEditor<'_>) -> SpecResult<T>,
    ) -> SpecResult<T> {
        let ty = self.raw.message(TYPE)?.unwrap_or_default();
        let tag = type_tag(&ty);
        if tag != Some(IMAGE_TYPE) {
            return Err(SpecError::NotAnImage {
                name: self.name()?,
                found: type_label(tag).to_string(),
            });
        }
        self.raw.update_message(TYPE, |ty| {
            ty.update_message(IMAGE_TYPE, |image| f(&mut ImageTypeEditor { raw: image }))
        })
    }
}

/// Mutable access to an `ImageFeatureType`.
pub struct ImageTypeEditor<'a> {
    raw: &'a mut RawMessage,
}

impl ImageTypeEditor<'_> {
    pub fn set_size(&mut self, height: i64, width: i64) {
        self.raw.set_int64(IMAGE_WIDTH, width);
        self.raw.set_int64(IMAGE_HEIGHT, height);
    }

    pub fn set_color_space(&mut self, color_space: ColorSpace) {
        self.raw.set_int32(COLOR_SPACE, color_space.code());
    }

    /// Replace whatever size flexibility is present with `range`, returning
    /// the flexibility that was there before.
    pub fn set_size_range(&mut self, range: ImageSizeRange) -> SpecResult<SizeFlexibility> {
        let previous = SizeFlexibility::from_image_raw(self.raw)?;
        self.raw.clear(ENUMERATED_SIZES);
        self.raw.set_message(IMAGE_SIZE_RANGE, &range.to_raw());
        Ok(previous)
    }

    pub fn view(&self) -> SpecResult<ImageFeature> {
        ImageFeature::from_raw(self.raw)
    }
}

/// Builders for feature messages, shared by tests across modules.
#[cfg(test)]
pub(crate) mod build {
    use super::*;

    pub fn image_feature(name: &str, height: i64, width: i64, color: ColorSpace) -> RawMessage {
        let mut image = RawMessage::new();
        image.set_int64(IMAGE_WIDTH, width);
        image.set_int64(IMAGE_HEIGHT, height);
        image.set_int32(COLOR_SPACE, color.code());

        let mut ty = RawMessage::new();
        ty.set_message(IMAGE_TYPE, &image);

        let mut feature = RawMessage::new();
        feature.set_string(NAME, name);
        feature.set_message(TYPE, &ty);
        feature
    }

    pub fn array_feature(name: &str, shape: &[u64]) -> RawMessage {
        let mut array = RawMessage::new();
        array.push_packed_varints(ARRAY_SHAPE, shape);

        let mut ty = RawMessage::new();
        ty.set_message(MULTI_ARRAY_TYPE, &array);

        let mut feature = RawMessage::new();
        feature.set_string(NAME, name);
        feature.set_message(TYPE, &ty);
        feature
    }

    pub fn with_enumerated_sizes(mut feature: RawMessage, sizes: &[(u64, u64)]) -> RawMessage {
        feature
            .update_message(TYPE, |ty| {
                ty.update_message(IMAGE_TYPE, |image| {
                    let mut list = RawMessage::new();
                    for (height, width) in sizes {
                        let mut size = RawMessage::new();
                        size.set_varint(SIZE_WIDTH, *width);
                        size.set_varint(SIZE_HEIGHT, *height);
                        list.push_message(ENUMERATED_SIZE_LIST, &size);
                    }
                    image.set_message(ENUMERATED_SIZES, &list);
                    Ok::<_, SpecError>(())
                })
            })
            .expect("test feature is an image");
        feature
    }

    const SIZE_WIDTH: u32 = 1;
    const SIZE_HEIGHT: u32 = 2;
}

#[cfg(test)]
mod tests {
    use super::build::*;
    use super::*;
    use crate::spec::range::SizeRange;
    use pretty_assertions::assert_eq;

    #[test]
    fn reads_image_feature() {
        let raw = image_feature("image", 513, 513, ColorSpace::Rgb);
        let feature = FeatureDescription::from_raw(&raw).unwrap();
        assert_eq!(feature.name, "image");
        assert_eq!(
            feature.kind,
            FeatureKind::Image(ImageFeature {
                width: 513,
                height: 513,
                color_space: ColorSpace::Rgb,
                flexibility: SizeFlexibility::Fixed,
            })
        );
    }

    #[test]
    fn reads_multi_array_shape() {
        let raw = array_feature("scores", &[21, 513, 513]);
        let feature = FeatureDescription::from_raw(&raw).unwrap();
        assert_eq!(
            feature.kind,
            FeatureKind::MultiArray {
                shape: vec![21, 513, 513]
            }
        );
        assert!(feature.image().is_none());
    }

    #[test]
    fn edit_image_rejects_non_image_feature() {
        let mut raw = array_feature("scores", &[1]);
        let before = raw.clone();
        let err = FeatureEditor::new(&mut raw)
            .edit_image(|image| {
                image.set_size(1, 1);
                Ok(())
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "feature scores is of type multiArray, not an image");
        assert_eq!(raw, before);
    }

    #[test]
    fn size_range_replaces_enumerated_sizes() {
        let mut raw = with_enumerated_sizes(
            image_feature("image", 512, 512, ColorSpace::Rgb),
            &[(512, 512), (1024, 1024)],
        );
        let range = ImageSizeRange::new(
            SizeRange::new(512, 1024).unwrap(),
            SizeRange::new(512, 1024).unwrap(),
        );

        let previous = FeatureEditor::new(&mut raw)
            .edit_image(|image| image.set_size_range(range))
            .unwrap();
        assert!(matches!(previous, SizeFlexibility::Enumerated { ref sizes } if sizes.len() == 2));

        let image = FeatureDescription::from_raw(&raw).unwrap().image().cloned().unwrap();
        assert_eq!(image.flexibility, SizeFlexibility::Range { range });
        assert!(image.accepts(768, 768));
        assert!(!image.accepts(2048, 768));
    }

    #[test]
    fn enumerated_sizes_accept_only_listed_sizes() {
        let raw = with_enumerated_sizes(
            image_feature("image", 512, 512, ColorSpace::Rgb),
            &[(512, 512), (1024, 768)],
        );
        let image = FeatureDescription::from_raw(&raw).unwrap().image().cloned().unwrap();
        assert!(image.accepts(1024, 768));
        assert!(!image.accepts(768, 1024));
    }

    #[test]
    fn color_space_names() {
        assert_eq!("grayscale".parse::<ColorSpace>().unwrap(), ColorSpace::Grayscale);
        assert_eq!("Grayscale-Float16".parse::<ColorSpace>().unwrap(), ColorSpace::GrayscaleFloat16);
        assert!("cmyk".parse::<ColorSpace>().is_err());
        assert_eq!(ColorSpace::from_code(10).to_string(), "GRAYSCALE");
        assert_eq!(ColorSpace::from_code(7), ColorSpace::Other(7));
    }
}
