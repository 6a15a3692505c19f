use crate::error::{SpecError, SpecResult};
use crate::wire::field::{Field, FieldValue};
use bytes::{Buf, BufMut, Bytes};
use prost::encoding::{decode_varint, encode_varint, encoded_len_varint};

/// Largest field number protobuf allows (2^29 - 1).
const MAX_TAG: u64 = (1 << 29) - 1;

/// Split a serialized message into its fields.
///
/// Length-delimited values are slices of `buf`, so nested messages and
/// weight blobs are never copied.
pub fn decode_fields(mut buf: Bytes) -> SpecResult<Vec<Field>> {
    let mut fields = Vec::new();
    while buf.has_remaining() {
        let key = decode_varint(&mut buf)?;
        let raw_tag = key >> 3;
        if raw_tag == 0 || raw_tag > MAX_TAG {
            return Err(SpecError::InvalidTag(raw_tag));
        }
        let tag = raw_tag as u32;

        let value = match key & 0x7 {
            0 => FieldValue::Varint(decode_varint(&mut buf)?),
            1 => {
                if buf.remaining() < 8 {
                    return Err(SpecError::Truncated { tag });
                }
                FieldValue::Fixed64(buf.get_u64_le())
            }
            2 => {
                let len = decode_varint(&mut buf)?;
                let len = usize::try_from(len).map_err(|_| SpecError::Truncated { tag })?;
                if buf.remaining() < len {
                    return Err(SpecError::Truncated { tag });
                }
                FieldValue::Bytes(buf.split_to(len))
            }
            5 => {
                if buf.remaining() < 4 {
                    return Err(SpecError::Truncated { tag });
                }
                FieldValue::Fixed32(buf.get_u32_le())
            }
            other => {
                return Err(SpecError::UnsupportedWireType {
                    tag,
                    wire_type: other as u8,
                });
            }
        };

        fields.push(Field::new(tag, value));
    }
    Ok(fields)
}

pub fn encoded_len(fields: &[Field]) -> usize {
    fields
        .iter()
        .map(|f| {
            let key = encoded_len_varint(key_for(f));
            let body = match &f.value {
                FieldValue::Varint(v) => encoded_len_varint(*v),
                FieldValue::Fixed64(_) => 8,
                FieldValue::Bytes(b) => encoded_len_varint(b.len() as u64) + b.len(),
                FieldValue::Fixed32(_) => 4,
            };
            key + body
        })
        .sum()
}

pub fn encode_fields(fields: &[Field], buf: &mut impl BufMut) {
    for f in fields {
        encode_varint(key_for(f), buf);
        match &f.value {
            FieldValue::Varint(v) => encode_varint(*v, buf),
            FieldValue::Fixed64(v) => buf.put_u64_le(*v),
            FieldValue::Bytes(b) => {
                encode_varint(b.len() as u64, buf);
                buf.put_slice(b);
            }
            FieldValue::Fixed32(v) => buf.put_u32_le(*v),
        }
    }
}

fn key_for(f: &Field) -> u64 {
    (u64::from(f.tag) << 3) | f.value.wire_type().code()
}

/// Decode a packed run of varints (the body of a packed repeated field).
pub fn decode_packed_varints(mut buf: Bytes) -> SpecResult<Vec<u64>> {
    let mut out = Vec::new();
    while buf.has_remaining() {
        out.push(decode_varint(&mut buf)?);
    }
    Ok(out)
}

#[cfg(test)]
pub fn encode_packed_varints(values: &[u64]) -> Bytes {
    let len = values.iter().map(|v| encoded_len_varint(*v)).sum();
    let mut buf = Vec::with_capacity(len);
    for v in values {
        encode_varint(*v, &mut buf);
    }
    Bytes::from(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_every_supported_wire_type() {
        // 1: varint 150, 2: "hi", 3: fixed32 1, 4: fixed64 2
        let raw = Bytes::from_static(&[
            0x08, 0x96, 0x01, //
            0x12, 0x02, b'h', b'i', //
            0x1d, 0x01, 0x00, 0x00, 0x00, //
            0x21, 0x02, 0, 0, 0, 0, 0, 0, 0,
        ]);
        let fields = decode_fields(raw.clone()).unwrap();
        assert_eq!(
            fields,
            vec![
                Field::new(1, FieldValue::Varint(150)),
                Field::new(2, FieldValue::Bytes(Bytes::from_static(b"hi"))),
                Field::new(3, FieldValue::Fixed32(1)),
                Field::new(4, FieldValue::Fixed64(2)),
            ]
        );

        let mut out = Vec::new();
        encode_fields(&fields, &mut out);
        assert_eq!(out, raw.to_vec());
        assert_eq!(encoded_len(&fields), raw.len());
    }

    #[test]
    fn rejects_truncated_length_delimited() {
        let raw = Bytes::from_static(&[0x12, 0x05, b'a']);
        assert!(matches!(
            decode_fields(raw),
            Err(SpecError::Truncated { tag: 2 })
        ));
    }

    #[test]
    fn rejects_groups_and_zero_tag() {
        assert!(matches!(
            decode_fields(Bytes::from_static(&[0x0b])),
            Err(SpecError::UnsupportedWireType { tag: 1, wire_type: 3 })
        ));
        assert!(matches!(
            decode_fields(Bytes::from_static(&[0x00, 0x01])),
            Err(SpecError::InvalidTag(0))
        ));
    }

    #[test]
    fn packed_varints_round_trip() {
        let packed = encode_packed_varints(&[513, 513]);
        assert_eq!(packed.as_ref(), &[0x81, 0x04, 0x81, 0x04]);
        assert_eq!(decode_packed_varints(packed).unwrap(), vec![513, 513]);
    }
}
