//! Neural-network layer records.

use crate::error::SpecResult;
use crate::wire::RawMessage;

pub const NAME: u32 = 1;
pub const INPUT: u32 = 2;
pub const OUTPUT: u32 = 3;
pub const INPUT_TENSOR: u32 = 4;
pub const OUTPUT_TENSOR: u32 = 5;
pub const IS_UPDATABLE: u32 = 10;

/// Layer-kind oneof members start at this field number.
const FIRST_KIND_TAG: u32 = 100;

const ACTIVATION: u32 = 130;
pub const RESIZE_BILINEAR: u32 = 211;
const TARGET_SIZE: u32 = 1;

/// One `NeuralNetworkLayer`, with the raw message kept for full dumps.
#[derive(Debug, Clone)]
pub struct Layer {
    pub name: String,
    raw: RawMessage,
}

impl Layer {
    pub(crate) fn from_raw(raw: RawMessage) -> SpecResult<Self> {
        Ok(Self {
            name: raw.string(NAME)?,
            raw,
        })
    }

    pub fn raw(&self) -> &RawMessage {
        &self.raw
    }

    /// Field number of the active layer-kind payload, if any.
    pub fn kind_tag(&self) -> Option<u32> {
        self.raw.last_tag_in(|t| t >= FIRST_KIND_TAG)
    }

    /// `resizeBilinear.targetSize`; empty for every other kind of layer.
    pub fn resize_target_size(&self) -> SpecResult<Vec<u64>> {
        if self.kind_tag() != Some(RESIZE_BILINEAR) {
            return Ok(Vec::new());
        }
        match self.raw.message(RESIZE_BILINEAR)? {
            Some(params) => params.packed_varints(TARGET_SIZE),
            None => Ok(Vec::new()),
        }
    }
}

/// Name of a layer-kind oneof member.
pub fn kind_name(tag: u32) -> Option<&'static str> {
    let name = match tag {
        100 => "convolution",
        120 => "pooling",
        130 => "activation",
        140 => "innerProduct",
        150 => "embedding",
        160 => "batchnorm",
        165 => "mvn",
        170 => "l2normalize",
        175 => "softmax",
        180 => "lrn",
        190 => "crop",
        200 => "padding",
        210 => "upsample",
        211 => "resizeBilinear",
        212 => "cropResize",
        220 => "unary",
        230 => "add",
        231 => "multiply",
        240 => "average",
        245 => "scale",
        250 => "bias",
        260 => "max",
        261 => "min",
        270 => "dot",
        280 => "reduce",
        290 => "loadConstant",
        300 => "reshape",
        301 => "flatten",
        310 => "permute",
        320 => "concat",
        330 => "split",
        340 => "sequenceRepeat",
        345 => "reorganizeData",
        350 => "slice",
        400 => "simpleRecurrent",
        410 => "gru",
        420 => "uniDirectionalLSTM",
        430 => "biDirectionalLSTM",
        500 => "custom",
        600 => "copy",
        605 => "branch",
        615 => "loop",
        620 => "loopBreak",
        625 => "loopContinue",
        635 => "rangeStatic",
        640 => "rangeDynamic",
        660 => "clip",
        665 => "ceil",
        670 => "floor",
        680 => "sign",
        685 => "round",
        700 => "exp2",
        710 => "sin",
        715 => "cos",
        720 => "tan",
        730 => "asin",
        735 => "acos",
        740 => "atan",
        750 => "sinh",
        755 => "cosh",
        760 => "tanh",
        770 => "asinh",
        775 => "acosh",
        780 => "atanh",
        790 => "erf",
        795 => "gelu",
        815 => "equal",
        820 => "notEqual",
        825 => "lessThan",
        827 => "lessEqual",
        830 => "greaterThan",
        832 => "greaterEqual",
        840 => "logicalOr",
        845 => "logicalXor",
        850 => "logicalNot",
        855 => "logicalAnd",
        865 => "modBroadcastable",
        870 => "minBroadcastable",
        875 => "maxBroadcastable",
        880 => "addBroadcastable",
        885 => "powBroadcastable",
        890 => "divideBroadcastable",
        895 => "floorDivBroadcastable",
        900 => "multiplyBroadcastable",
        905 => "subtractBroadcastable",
        920 => "tile",
        925 => "stack",
        930 => "gather",
        935 => "scatter",
        940 => "gatherND",
        945 => "scatterND",
        950 => "softmaxND",
        952 => "gatherAlongAxis",
        954 => "scatterAlongAxis",
        960 => "reverse",
        965 => "reverseSeq",
        975 => "splitND",
        980 => "concatND",
        985 => "transpose",
        995 => "sliceStatic",
        1000 => "sliceDynamic",
        1005 => "slidingWindows",
        1015 => "topK",
        1020 => "argMin",
        1025 => "argMax",
        1040 => "embeddingND",
        1045 => "batchedMatmul",
        1065 => "getShape",
        1070 => "loadConstantND",
        1080 => "fillLike",
        1085 => "fillStatic",
        1090 => "fillDynamic",
        1100 => "broadcastToLike",
        1105 => "broadcastToStatic",
        1110 => "broadcastToDynamic",
        1120 => "squeeze",
        1125 => "expandDims",
        1130 => "flattenTo2D",
        1135 => "reshapeLike",
        1140 => "reshapeStatic",
        1145 => "reshapeDynamic",
        1150 => "rankPreservingReshape",
        1155 => "constantPad",
        _ => return None,
    };
    Some(name)
}

/// Field names inside the payloads whose layout the dumps spell out.
pub fn payload_field_name(kind: u32, field: u32) -> Option<&'static str> {
    let name = match (kind, field) {
        (RESIZE_BILINEAR, 1) => "targetSize",
        (RESIZE_BILINEAR, 2) => "mode",
        (212, 1) => "targetSize",
        (212, 2) => "normalizedCoordinates",
        (212, 3) => "mode",
        (212, 4) => "boxIndicesMode",
        (212, 5) => "spatialScale",
        (210, 1) => "scalingFactor",
        (210, 5) => "mode",
        (210, 6) => "linearUpsampleMode",
        (210, 7) => "fractionalScalingFactor",
        (320, 100) => "sequenceConcat",
        (ACTIVATION, 5) => "linear",
        (ACTIVATION, 10) => "ReLU",
        (ACTIVATION, 15) => "leakyReLU",
        (ACTIVATION, 20) => "thresholdedReLU",
        (ACTIVATION, 25) => "PReLU",
        (ACTIVATION, 30) => "tanh",
        (ACTIVATION, 31) => "scaledTanh",
        (ACTIVATION, 40) => "sigmoid",
        (ACTIVATION, 41) => "sigmoidHard",
        (ACTIVATION, 50) => "ELU",
        (ACTIVATION, 60) => "softsign",
        (ACTIVATION, 70) => "softplus",
        (ACTIVATION, 71) => "parametricSoftplus",
        _ => return None,
    };
    Some(name)
}

/// Payload fields that are repeated integers and print one value per line.
pub fn payload_field_is_repeated_int(kind: u32, field: u32) -> bool {
    matches!((kind, field), (RESIZE_BILINEAR, 1) | (212, 1) | (210, 1))
}
