use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Serialize, Serializer};

use super::attr_list::AttrList;

/// KEYFORMAT used when the tag does not name one.
pub const IDENTITY_KEY_FORMAT: &str = "identity";

/// Key formats of the DRM systems that may carry SAMPLE-AES keys.
pub mod key_system {
    pub const CLEARKEY: &str = "org.w3.clearkey";
    pub const FAIRPLAY: &str = "com.apple.streamingkeydelivery";
    pub const PLAYREADY: &str = "com.microsoft.playready";
    pub const WIDEVINE: &str = "urn:uuid:edef8ba9-79d6-4ace-a3c8-27dcd51d21ed";

    pub const ALL: &[&str] = &[CLEARKEY, FAIRPLAY, PLAYREADY, WIDEVINE];
}

/// Represents an HLS encryption method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMethod {
    None,
    Aes128,
    Aes256,
    Aes256Ctr,
    SampleAes,
    SampleAesCtr,
    SampleAesCenc,
    Iso23001_7,
    Unknown(String),
}

impl KeyMethod {
    /// Parse from EXT-X-KEY METHOD attribute value.
    pub fn parse(s: &str) -> Self {
        match s {
            "NONE" => Self::None,
            "AES-128" => Self::Aes128,
            "AES-256" => Self::Aes256,
            "AES-256-CTR" => Self::Aes256Ctr,
            "SAMPLE-AES" => Self::SampleAes,
            "SAMPLE-AES-CTR" => Self::SampleAesCtr,
            "SAMPLE-AES-CENC" => Self::SampleAesCenc,
            "ISO-23001-7" => Self::Iso23001_7,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Whole segments are encrypted; the IV may be implied by the sequence number.
    pub fn is_full_segment(&self) -> bool {
        matches!(self, Self::Aes128 | Self::Aes256 | Self::Aes256Ctr)
    }

    /// Sample-level encryption handled by a key system.
    pub fn is_common_encryption(&self) -> bool {
        matches!(
            self,
            Self::SampleAes | Self::SampleAesCtr | Self::SampleAesCenc | Self::Iso23001_7
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::None => "NONE",
            Self::Aes128 => "AES-128",
            Self::Aes256 => "AES-256",
            Self::Aes256Ctr => "AES-256-CTR",
            Self::SampleAes => "SAMPLE-AES",
            Self::SampleAesCtr => "SAMPLE-AES-CTR",
            Self::SampleAesCenc => "SAMPLE-AES-CENC",
            Self::Iso23001_7 => "ISO-23001-7",
            Self::Unknown(s) => s.as_str(),
        }
    }
}

impl Serialize for KeyMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

fn serialize_hex<S: Serializer>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
    match bytes {
        Some(bytes) => serializer.serialize_str(&hex::encode(bytes)),
        None => serializer.serialize_none(),
    }
}

/// Decryption parameters from an EXT-X-KEY or EXT-X-SESSION-KEY tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelKey {
    pub method: KeyMethod,
    /// Key URI resolved against the playlist URL; empty when absent.
    pub uri: String,
    pub key_format: String,
    pub key_format_versions: Vec<u32>,
    #[serde(serialize_with = "serialize_hex")]
    pub iv: Option<Vec<u8>>,
    #[serde(serialize_with = "serialize_hex")]
    pub key: Option<Vec<u8>>,
    #[serde(serialize_with = "serialize_hex")]
    pub key_id: Option<Vec<u8>>,
    #[serde(serialize_with = "serialize_hex")]
    pub pssh: Option<Vec<u8>>,
}

impl LevelKey {
    pub fn new(method: KeyMethod, uri: impl Into<String>, key_format: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            key_format: key_format.into(),
            key_format_versions: vec![1],
            iv: None,
            key: None,
            key_id: None,
            pssh: None,
        }
    }

    /// Build from decoded key-tag attributes. `resolve` turns the URI into
    /// an absolute URL.
    pub fn from_attrs(attrs: &AttrList, resolve: impl FnOnce(&str) -> String) -> Self {
        let method = KeyMethod::parse(attrs.get("METHOD").unwrap_or(""));
        let uri = attrs.get("URI").filter(|u| !u.is_empty()).map(resolve);
        let iv = attrs.hexadecimal_integer("IV");
        if uri.is_some()
            && iv.is_none()
            && let Some(raw) = attrs.get("IV")
        {
            tracing::warn!("Invalid IV: {}", raw);
        }

        let key_format_versions = attrs
            .get("KEYFORMATVERSIONS")
            .unwrap_or("1")
            .split('/')
            .filter_map(|v| v.trim().parse().ok())
            .collect();

        Self {
            key_format_versions,
            iv,
            ..Self::new(
                method,
                uri.unwrap_or_default(),
                attrs.get("KEYFORMAT").unwrap_or(IDENTITY_KEY_FORMAT),
            )
        }
    }

    pub fn encrypted(&self) -> bool {
        !matches!(self.method, KeyMethod::None) && !self.method.as_str().is_empty()
    }

    pub fn is_common_encryption(&self) -> bool {
        self.method.is_common_encryption()
    }

    pub fn is_supported(&self) -> bool {
        match &self.method {
            KeyMethod::None | KeyMethod::Aes128 | KeyMethod::Aes256 | KeyMethod::Aes256Ctr => true,
            KeyMethod::Unknown(_) => false,
            method if self.key_format == IDENTITY_KEY_FORMAT => *method == KeyMethod::SampleAes,
            method => {
                key_system::ALL.contains(&self.key_format.as_str())
                    && method.is_common_encryption()
            }
        }
    }

    /// Key material needed to decrypt the segment numbered `sn` (`None` for
    /// an init segment).
    pub fn decrypt_data(&self, sn: Option<u64>) -> Option<LevelKey> {
        if !self.encrypted() || self.uri.is_empty() {
            return None;
        }

        if self.method.is_full_segment() && self.iv.is_none() {
            let sn = sn.unwrap_or_else(|| {
                tracing::warn!(
                    "missing IV for initialization segment with method=\"{}\"",
                    self.method.as_str()
                );
                0
            });
            return Some(Self {
                iv: Some(initialization_vector(sn).to_vec()),
                ..Self::new(self.method.clone(), self.uri.clone(), IDENTITY_KEY_FORMAT)
            });
        }

        let mut data = self.clone();
        if data.pssh.is_some() && data.key_id.is_some() {
            return Some(data);
        }
        if let Some(bytes) = data_uri_bytes(&data.uri) {
            match data.key_format.as_str() {
                key_system::WIDEVINE => {
                    if bytes.len() >= 22 {
                        data.key_id = Some(bytes[bytes.len() - 22..bytes.len() - 6].to_vec());
                    }
                    data.pssh = Some(bytes);
                }
                key_system::PLAYREADY => data.pssh = Some(bytes),
                _ => {
                    let head = &bytes[..bytes.len().min(16)];
                    let mut key_id = vec![0u8; 16 - head.len()];
                    key_id.extend_from_slice(head);
                    data.key_id = Some(key_id);
                }
            }
        }
        Some(data)
    }
}

/// Implicit IV: `sn` big-endian in the last four bytes of a zero buffer.
pub fn initialization_vector(sn: u64) -> [u8; 16] {
    let mut iv = [0u8; 16];
    iv[12..16].copy_from_slice(&(sn as u32).to_be_bytes());
    iv
}

/// Payload of a `data:` URI, base64 or percent-encoded.
fn data_uri_bytes(uri: &str) -> Option<Vec<u8>> {
    let (header, payload) = uri.strip_prefix("data:")?.split_once(',')?;
    if header.ends_with(";base64") {
        STANDARD.decode(payload).ok()
    } else {
        Some(urlencoding::decode_binary(payload.as_bytes()).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(attrs: &str) -> LevelKey {
        LevelKey::from_attrs(&AttrList::parse(attrs), |u| format!("https://example.com/{}", u))
    }

    #[test]
    fn test_key_method_parse() {
        assert_eq!(KeyMethod::parse("AES-128"), KeyMethod::Aes128);
        assert_eq!(KeyMethod::parse("SAMPLE-AES"), KeyMethod::SampleAes);
        assert_eq!(KeyMethod::parse("AES-256-CTR"), KeyMethod::Aes256Ctr);
        assert_eq!(KeyMethod::parse("aes-128"), KeyMethod::Unknown("aes-128".into()));
    }

    #[test]
    fn test_level_key_defaults() {
        let k = key(r#"METHOD=AES-128,URI="key.bin""#);
        assert_eq!(k.method, KeyMethod::Aes128);
        assert_eq!(k.uri, "https://example.com/key.bin");
        assert_eq!(k.key_format, "identity");
        assert_eq!(k.key_format_versions, vec![1]);
        assert_eq!(k.iv, None);
        assert!(k.encrypted());
        assert!(k.is_supported());
    }

    #[test]
    fn test_level_key_versions_and_iv() {
        let k = key(r#"METHOD=SAMPLE-AES,KEYFORMAT="com.apple.streamingkeydelivery",KEYFORMATVERSIONS="1/2",URI="skd",IV=0x00000002"#);
        assert_eq!(k.key_format_versions, vec![1, 2]);
        assert_eq!(k.iv, Some(vec![0, 0, 0, 2]));
        assert!(k.is_supported());
        assert!(k.is_common_encryption());
    }

    #[test]
    fn test_is_supported() {
        assert!(key("METHOD=NONE").is_supported());
        assert!(!key("METHOD=NONE").encrypted());
        assert!(!key(r#"METHOD=SAMPLE-AES-CTR,URI="k""#).is_supported());
        assert!(!key(r#"METHOD=FOO,URI="k""#).is_supported());
        assert!(key(r#"METHOD=SAMPLE-AES-CTR,KEYFORMAT="org.w3.clearkey",URI="k""#).is_supported());
    }

    #[test]
    fn test_initialization_vector() {
        let iv = initialization_vector(1);
        assert_eq!(iv[15], 1);
        assert!(iv[..15].iter().all(|b| *b == 0));
        assert_eq!(&initialization_vector(0x0102_0304)[12..], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_decrypt_data_derives_iv() {
        let k = key(r#"METHOD=AES-128,URI="key.bin""#);
        let data = k.decrypt_data(Some(5)).unwrap();
        assert_eq!(data.iv, Some(initialization_vector(5).to_vec()));
        assert_eq!(data.uri, k.uri);

        let explicit = key(r#"METHOD=AES-256,URI="key.bin",IV=0x10"#);
        assert_eq!(explicit.decrypt_data(Some(5)).unwrap().iv, Some(vec![0x10]));

        assert!(key("METHOD=NONE").decrypt_data(Some(1)).is_none());
    }

    #[test]
    fn test_decrypt_data_from_data_uri() {
        let k = LevelKey::new(KeyMethod::SampleAesCtr, "data:text/plain;base64,YQo=", key_system::CLEARKEY);
        let data = k.decrypt_data(Some(0)).unwrap();
        let mut expected = vec![0u8; 14];
        expected.extend_from_slice(b"a\n");
        assert_eq!(data.key_id, Some(expected));
    }

    #[test]
    fn test_serialize_hex_fields() {
        let k = key(r#"METHOD=AES-128,URI="k",IV=0x0a0b"#);
        let json = serde_json::to_value(&k).unwrap();
        assert_eq!(json["iv"], "0a0b");
        assert_eq!(json["method"], "AES-128");
        assert_eq!(json["keyFormat"], "identity");
    }
}
