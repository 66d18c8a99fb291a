use base64::{engine::general_purpose::STANDARD, Engine};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("input is empty")]
    EmptyInput,
    #[error("invalid base64: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("decoded bytes are not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Base64 (standard alphabet, padded) of the UTF-8 bytes of `text`
pub fn encode(text: &str) -> Result<String, CodecError> {
    if text.trim().is_empty() {
        return Err(CodecError::EmptyInput);
    }

    Ok(STANDARD.encode(text.as_bytes()))
}

pub fn decode(encoded: &str) -> Result<String, CodecError> {
    let encoded = encoded.trim();
    if encoded.is_empty() {
        return Err(CodecError::EmptyInput);
    }
    let bytes = STANDARD.decode(encoded)?;

    Ok(String::from_utf8(bytes)?)
}

// tests
#[test]
fn test_encode() {
    assert_eq!(encode("hello").unwrap(), "aGVsbG8=");
    assert_eq!(encode("你好").unwrap(), "5L2g5aW9");
    assert_eq!(encode(" a ").unwrap(), "IGEg");
    assert!(matches!(encode(" \n"), Err(CodecError::EmptyInput)));
}

#[test]
fn test_decode() {
    assert_eq!(decode("aGVsbG8=\n").unwrap(), "hello");
    assert_eq!(decode("5L2g5aW9").unwrap(), "你好");
    assert!(matches!(decode(""), Err(CodecError::EmptyInput)));
    assert!(matches!(decode("not base64!"), Err(CodecError::Decode(_))));
    assert!(matches!(decode("/w=="), Err(CodecError::Utf8(_))));
}
