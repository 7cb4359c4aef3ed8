use record::{TreeRecord, LINE_BREAK};

use crate::remote::basename;

pub const ROOT_ID: u64 = 1;

#[derive(Debug, thiserror::Error)]
#[error("payload of '{path}' is not valid UTF-8")]
pub struct DecodeError {
    pub path: String,
    #[source]
    pub source: std::str::Utf8Error,
}

/// Decodes a node payload for display. `None` (a node without data) becomes `""`.
pub fn decode_payload(path: &str, payload: Option<&[u8]>) -> Result<String, DecodeError> {
    let text = std::str::from_utf8(payload.unwrap_or_default()).map_err(|source| {
        DecodeError {
            path: path.to_string(),
            source,
        }
    })?;
    Ok(text.replace('\n', LINE_BREAK))
}

/// Builds the record for `path` once all of its children are built. The record with
/// [`ROOT_ID`] is the opened root.
pub fn assemble(
    path: &str,
    data: String,
    children: Vec<TreeRecord>,
    id: u64,
) -> TreeRecord {
    let record = TreeRecord::leaf(basename(path), data, id).with_children(children);
    if id == ROOT_ID {
        record.opened()
    } else {
        record
    }
}

#[cfg(test)]
mod test {
    use record::Icon;

    use super::*;

    #[test]
    fn newlines_become_breaks() {
        assert_eq!(
            "hello<br>world<br>",
            decode_payload("/a", Some(b"hello\nworld\n")).unwrap()
        );
    }

    #[test]
    fn missing_payload_is_empty() {
        assert_eq!("", decode_payload("/b", None).unwrap());
        assert_eq!("", decode_payload("/b", Some(b"")).unwrap());
    }

    #[test]
    fn invalid_utf8_is_an_error() {
        let err = decode_payload("/bin", Some(&[0x66, 0xff, 0x00])).unwrap_err();
        assert_eq!("/bin", err.path);
        assert!(err.to_string().contains("/bin"));
    }

    #[test]
    fn leaf_record() {
        let rec = assemble("/app/config", "x".to_string(), vec![], 4);
        assert_eq!("config", rec.text);
        assert_eq!(Icon::File, rec.icon);
        assert_eq!(None, rec.children);
        assert!(!rec.is_opened());
    }

    #[test]
    fn root_record() {
        let child = assemble("/c", String::new(), vec![], 2);
        let rec = assemble("/", String::new(), vec![child], ROOT_ID);
        assert_eq!("/", rec.text);
        assert_eq!(Icon::Folder, rec.icon);
        assert!(rec.is_opened());
    }

    #[test]
    fn root_without_children_is_still_opened() {
        let rec = assemble("/lonely", String::new(), vec![], ROOT_ID);
        assert_eq!(Icon::File, rec.icon);
        assert!(rec.is_opened());
    }
}
