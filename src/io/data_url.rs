use super::HandleResolver;
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

/// Canvas exports are padded, hand-written URLs often are not.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decodes `data:[<mediatype>][;base64],<payload>` handles in-process
#[derive(Debug, Clone, Copy, Default)]
pub struct DataUrlResolver;

impl DataUrlResolver {
    pub fn decode(handle: &str) -> Result<Vec<u8>> {
        let rest = handle
            .get(..5)
            .filter(|scheme| scheme.eq_ignore_ascii_case("data:"))
            .map(|_| &handle[5..])
            .ok_or_else(|| anyhow!("not a data URL"))?;

        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| anyhow!("data URL is missing the ',' separator"))?;

        let is_base64 = meta.to_ascii_lowercase().ends_with(";base64");
        let raw = percent_decode(payload)?;

        if is_base64 {
            let cleaned: Vec<u8> = raw
                .into_iter()
                .filter(|b| !b.is_ascii_whitespace())
                .collect();
            LENIENT
                .decode(cleaned)
                .context("data URL has an invalid base64 payload")
        } else {
            Ok(raw)
        }
    }
}

#[async_trait]
impl HandleResolver for DataUrlResolver {
    async fn resolve(&self, handle: &str) -> Result<Vec<u8>> {
        Self::decode(handle)
    }
}

fn percent_decode(input: &str) -> Result<Vec<u8>> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .filter(|h| h.iter().all(u8::is_ascii_hexdigit))
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok());
            match hex {
                Some(b) => out.push(b),
                None => bail!("data URL has an invalid percent escape at byte {}", i),
            }
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_base64_payload() {
        let bytes = DataUrlResolver::decode("data:image/png;base64,iVBORw0KGgo=").unwrap();
        assert_eq!(bytes, b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn accepts_unpadded_and_wrapped_base64() {
        assert_eq!(
            DataUrlResolver::decode("data:;base64,aGVsbG8").unwrap(),
            b"hello"
        );
        assert_eq!(
            DataUrlResolver::decode("data:image/png;BASE64,aGVs\nbG8=").unwrap(),
            b"hello"
        );
        assert_eq!(
            DataUrlResolver::decode("data:;base64,aGVsbG8%3D").unwrap(),
            b"hello"
        );
    }

    #[test]
    fn decodes_percent_encoded_payload() {
        let bytes = DataUrlResolver::decode("data:text/plain;charset=utf-8,a%20b%2Cc").unwrap();
        assert_eq!(bytes, b"a b,c");
    }

    #[test]
    fn rejects_malformed_handles() {
        assert!(DataUrlResolver::decode("").is_err());
        assert!(DataUrlResolver::decode("https://example.com/a.png").is_err());
        assert!(DataUrlResolver::decode("data:image/png;base64").is_err());
        assert!(DataUrlResolver::decode("data:image/png;base64,@@@@").is_err());
        assert!(DataUrlResolver::decode("data:,bad%zz").is_err());
    }

    #[test]
    fn percent_escapes_need_two_hex_digits() {
        assert!(DataUrlResolver::decode("data:,%+f").is_err());
        assert!(DataUrlResolver::decode("data:,%-1").is_err());
        assert!(DataUrlResolver::decode("data:,%4").is_err());
        assert_eq!(DataUrlResolver::decode("data:,%4a%4A").unwrap(), b"JJ");
    }
}
