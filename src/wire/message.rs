use crate::error::{SpecError, SpecResult};
use crate::wire::field::{Field, FieldValue, WireType};
use crate::wire::parse;
use bytes::Bytes;

/// A decoded message whose fields are kept in wire order.
///
/// Scalar reads follow proto3 rules: the last occurrence wins and an absent
/// field reads as its zero value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMessage {
    fields: Vec<Field>,
}

impl RawMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(buf: Bytes) -> SpecResult<Self> {
        Ok(Self {
            fields: parse::decode_fields(buf)?,
        })
    }

    pub fn encoded_len(&self) -> usize {
        parse::encoded_len(&self.fields)
    }

    pub fn encode_to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        parse::encode_fields(&self.fields, &mut buf);
        buf
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn has(&self, tag: u32) -> bool {
        self.fields.iter().any(|f| f.tag == tag)
    }

    /// Last field whose number falls in `tags`; that is the active member of a
    /// oneof.
    pub fn last_tag_in(&self, tags: impl Fn(u32) -> bool) -> Option<u32> {
        self.fields.iter().rev().map(|f| f.tag).find(|t| tags(*t))
    }

    fn last(&self, tag: u32) -> Option<&FieldValue> {
        self.fields.iter().rev().find(|f| f.tag == tag).map(|f| &f.value)
    }

    pub fn varint(&self, tag: u32) -> SpecResult<Option<u64>> {
        match self.last(tag) {
            None => Ok(None),
            Some(FieldValue::Varint(v)) => Ok(Some(*v)),
            Some(other) => Err(unexpected(tag, other, WireType::Varint)),
        }
    }

    pub fn uint64(&self, tag: u32) -> SpecResult<u64> {
        Ok(self.varint(tag)?.unwrap_or(0))
    }

    pub fn int64(&self, tag: u32) -> SpecResult<i64> {
        Ok(self.uint64(tag)? as i64)
    }

    pub fn int32(&self, tag: u32) -> SpecResult<i32> {
        Ok(self.uint64(tag)? as i32)
    }

    pub fn bool(&self, tag: u32) -> SpecResult<bool> {
        Ok(self.uint64(tag)? != 0)
    }

    pub fn bytes(&self, tag: u32) -> SpecResult<Option<Bytes>> {
        match self.last(tag) {
            None => Ok(None),
            Some(FieldValue::Bytes(b)) => Ok(Some(b.clone())),
            Some(other) => Err(unexpected(tag, other, WireType::LengthDelimited)),
        }
    }

    pub fn string(&self, tag: u32) -> SpecResult<String> {
        match self.bytes(tag)? {
            None => Ok(String::new()),
            Some(b) => utf8(tag, b),
        }
    }

    pub fn message(&self, tag: u32) -> SpecResult<Option<RawMessage>> {
        self.bytes(tag)?.map(RawMessage::decode).transpose()
    }

    pub fn messages(&self, tag: u32) -> SpecResult<Vec<RawMessage>> {
        self.repeated_bytes(tag)?
            .into_iter()
            .map(RawMessage::decode)
            .collect()
    }

    /// Read a repeated integer field written either packed or unpacked.
    pub fn packed_varints(&self, tag: u32) -> SpecResult<Vec<u64>> {
        let mut out = Vec::new();
        for f in self.fields.iter().filter(|f| f.tag == tag) {
            match &f.value {
                FieldValue::Varint(v) => out.push(*v),
                FieldValue::Bytes(b) => out.extend(parse::decode_packed_varints(b.clone())?),
                other => return Err(unexpected(tag, other, WireType::Varint)),
            }
        }
        Ok(out)
    }

    fn repeated_bytes(&self, tag: u32) -> SpecResult<Vec<Bytes>> {
        self.fields
            .iter()
            .filter(|f| f.tag == tag)
            .map(|f| match &f.value {
                FieldValue::Bytes(b) => Ok(b.clone()),
                other => Err(unexpected(tag, other, WireType::LengthDelimited)),
            })
            .collect()
    }

    /// Remove every occurrence of `tag`.
    pub fn clear(&mut self, tag: u32) {
        self.fields.retain(|f| f.tag != tag);
    }

    /// Replace all occurrences of `tag` with a single value, keeping the
    /// position of the first occurrence. `None` just clears.
    fn replace(&mut self, tag: u32, value: Option<FieldValue>) {
        let pos = self.fields.iter().position(|f| f.tag == tag);
        self.clear(tag);
        if let Some(value) = value {
            let field = Field::new(tag, value);
            match pos {
                Some(pos) => self.fields.insert(pos, field),
                None => self.fields.push(field),
            }
        }
    }

    /// Proto3 scalar assignment: zero is the default and is not written.
    pub fn set_varint(&mut self, tag: u32, value: u64) {
        let value = (value != 0).then_some(FieldValue::Varint(value));
        self.replace(tag, value);
    }

    pub fn set_int64(&mut self, tag: u32, value: i64) {
        self.set_varint(tag, value as u64);
    }

    pub fn set_int32(&mut self, tag: u32, value: i32) {
        // int32 is sign-extended to 64 bits on the wire.
        self.set_varint(tag, i64::from(value) as u64);
    }

    /// Sub-messages are written even when empty: their presence is meaningful.
    pub fn set_message(&mut self, tag: u32, message: &RawMessage) {
        self.replace(
            tag,
            Some(FieldValue::Bytes(Bytes::from(message.encode_to_vec()))),
        );
    }

    /// Decode the sub-message at `tag` (or start an empty one), run `f` on it
    /// and write it back. Nothing is written when `f` fails.
    pub fn update_message<T, E>(
        &mut self,
        tag: u32,
        f: impl FnOnce(&mut RawMessage) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<SpecError>,
    {
        let mut inner = self.message(tag)?.unwrap_or_default();
        let out = f(&mut inner)?;
        self.set_message(tag, &inner);
        Ok(out)
    }

    /// Like [`RawMessage::update_message`] for the `index`-th element of a
    /// repeated message field. Returns `Ok(None)` when there is no such element.
    pub fn update_repeated<T, E>(
        &mut self,
        tag: u32,
        index: usize,
        f: impl FnOnce(&mut RawMessage) -> Result<T, E>,
    ) -> Result<Option<T>, E>
    where
        E: From<SpecError>,
    {
        let Some(pos) = self
            .fields
            .iter()
            .enumerate()
            .filter(|(_, field)| field.tag == tag)
            .nth(index)
            .map(|(pos, _)| pos)
        else {
            return Ok(None);
        };

        let field = &mut self.fields[pos];
        let bytes = match &field.value {
            FieldValue::Bytes(b) => b.clone(),
            other => return Err(unexpected(tag, other, WireType::LengthDelimited).into()),
        };
        let mut inner = RawMessage::decode(bytes)?;
        let out = f(&mut inner)?;
        field.value = FieldValue::Bytes(Bytes::from(inner.encode_to_vec()));
        Ok(Some(out))
    }
}

/// Builders used by fixtures; production code only edits in place.
#[cfg(test)]
impl RawMessage {
    pub fn count(&self, tag: u32) -> usize {
        self.fields.iter().filter(|f| f.tag == tag).count()
    }

    pub fn set_string(&mut self, tag: u32, value: &str) {
        let value = (!value.is_empty())
            .then(|| FieldValue::Bytes(Bytes::copy_from_slice(value.as_bytes())));
        self.replace(tag, value);
    }

    pub fn push(&mut self, tag: u32, value: FieldValue) {
        self.fields.push(Field::new(tag, value));
    }

    pub fn push_string(&mut self, tag: u32, value: &str) {
        self.push(tag, FieldValue::Bytes(Bytes::copy_from_slice(value.as_bytes())));
    }

    pub fn push_message(&mut self, tag: u32, message: &RawMessage) {
        self.push(tag, FieldValue::Bytes(Bytes::from(message.encode_to_vec())));
    }

    pub fn push_packed_varints(&mut self, tag: u32, values: &[u64]) {
        self.push(tag, FieldValue::Bytes(parse::encode_packed_varints(values)));
    }
}

fn unexpected(tag: u32, found: &FieldValue, expected: WireType) -> SpecError {
    SpecError::UnexpectedWireType {
        tag,
        found: found.wire_type().name(),
        expected: expected.name(),
    }
}

fn utf8(tag: u32, b: Bytes) -> SpecResult<String> {
    String::from_utf8(b.to_vec()).map_err(|_| SpecError::InvalidUtf8 { tag })
}
