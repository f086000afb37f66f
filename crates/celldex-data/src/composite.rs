//! Composite values.
//!
//! A composite is a sequence of components, each written as a big-endian
//! `u16` length, the component bytes, and a single end-of-component byte.
//! Partition keys with several columns and all physical column names use this
//! layout.

use bytes::{BufMut, Bytes, BytesMut};

use crate::DataError;

/// End-of-component marker written after every component.
const END_OF_COMPONENT: u8 = 0;

/// Splits a composite value into its components.
pub fn split(composite: &Bytes) -> Result<Vec<Bytes>, DataError> {
    let mut components = Vec::new();
    let mut offset = 0;

    while offset < composite.len() {
        let header = composite
            .get(offset..offset + 2)
            .ok_or_else(|| DataError::Composite(format!("truncated length at byte {offset}")))?;
        let len = usize::from(u16::from_be_bytes([header[0], header[1]]));
        let start = offset + 2;
        let end = start + len;

        // the end-of-component byte must follow the component
        if end >= composite.len() {
            return Err(DataError::Composite(format!(
                "component at byte {offset} overruns the value"
            )));
        }

        components.push(composite.slice(start..end));
        // skip the end-of-component byte
        offset = end + 1;
    }

    Ok(components)
}

/// Joins components into a composite value.
pub fn join<I, B>(components: I) -> Result<Bytes, DataError>
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    let mut buf = BytesMut::new();
    for component in components {
        let component = component.as_ref();
        let len = u16::try_from(component.len()).map_err(|_| {
            DataError::Composite(format!("component of {} bytes is too long", component.len()))
        })?;
        buf.put_u16(len);
        buf.put_slice(component);
        buf.put_u8(END_OF_COMPONENT);
    }
    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_inverts_join() {
        let joined = join([b"alpha".as_slice(), b"".as_slice(), b"z".as_slice()]).unwrap();
        let parts = split(&joined).unwrap();
        assert_eq!(parts, vec![
            Bytes::from_static(b"alpha"),
            Bytes::new(),
            Bytes::from_static(b"z"),
        ]);
    }

    #[test]
    fn empty_composite_has_no_components() {
        assert!(split(&Bytes::new()).unwrap().is_empty());
    }

    #[test]
    fn truncated_component_is_rejected() {
        // claims 5 bytes, carries 2 and no end-of-component byte
        let bad = Bytes::from_static(&[0, 5, b'a', b'b']);
        assert!(split(&bad).is_err());
    }

    #[test]
    fn missing_end_of_component_is_rejected() {
        let bad = Bytes::from_static(&[0, 2, b'a', b'b']);
        assert!(split(&bad).is_err());
    }

    #[test]
    fn truncated_length_is_rejected() {
        let bad = Bytes::from_static(&[0]);
        let err = split(&bad).unwrap_err();
        assert!(err.to_string().contains("truncated length"));
    }
}
