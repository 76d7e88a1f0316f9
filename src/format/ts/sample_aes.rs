use super::track::AudioSample;
use crate::codec::h264::AvcSample;
use crate::Result;
use bytes::Bytes;

/// Encryption method announced for a segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMethod {
    None,
    Aes128,
    SampleAes,
    Other(String),
}

impl From<&str> for KeyMethod {
    fn from(method: &str) -> Self {
        match method {
            "NONE" => KeyMethod::None,
            "AES-128" => KeyMethod::Aes128,
            "SAMPLE-AES" => KeyMethod::SampleAes,
            other => KeyMethod::Other(other.to_string()),
        }
    }
}

/// Key material for a segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptData {
    pub method: KeyMethod,
    pub key: Option<Bytes>,
    pub iv: Option<Bytes>,
}

impl DecryptData {
    pub fn new(method: impl Into<KeyMethod>, key: Option<Bytes>, iv: Option<Bytes>) -> Self {
        Self {
            method: method.into(),
            key,
            iv,
        }
    }

    /// SAMPLE-AES with a key present.
    pub fn is_sample_aes(&self) -> bool {
        self.method == KeyMethod::SampleAes && self.key.is_some()
    }
}

/// Decrypts SAMPLE-AES protected samples in place before they are delivered.
pub trait SampleAesDecrypter: Send {
    fn decrypt_aac_samples(&mut self, samples: &mut [AudioSample]) -> Result<()>;

    fn decrypt_avc_samples(&mut self, samples: &mut [AvcSample]) -> Result<()>;
}

/// Builds a decrypter for the key material passed to `set_decryption_info`.
pub type DecrypterFactory = Box<dyn Fn(&DecryptData) -> Box<dyn SampleAesDecrypter> + Send>;
