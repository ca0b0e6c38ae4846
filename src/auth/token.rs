//! 用户令牌
//!
//! `token = hex(user_id ‖ AES-256-GCM(HMAC-SHA256(key, user_id)))`，
//! 其中 `key = SHA-256(secret)`，GCM nonce 取 key 的最后 12 字节。
//!
//! nonce 是确定性的，因此同一 user_id 总是得到同一个令牌。对同一把 key
//! 重复使用 nonce 削弱了 GCM 的保证；这里保留该格式以兼容已签发的令牌。

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use super::User;
use crate::errors::{Result, ShortenerError};

type HmacSha256 = Hmac<Sha256>;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const MAC_LEN: usize = 32;
const TAG_LEN: usize = 16;

/// 令牌尾部的加密 MAC 长度，也是解码后的最小长度
pub const SIGNATURE_SIZE: usize = MAC_LEN + TAG_LEN;

#[derive(Clone)]
pub struct TokenCodec {
    key: [u8; KEY_LEN],
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        let key: [u8; KEY_LEN] = Sha256::digest(secret).into();
        let cipher = Aes256Gcm::new((&key).into());
        Self { key, cipher }
    }

    /// 确定性 nonce：key 的最后 12 字节
    fn nonce_bytes(&self) -> &[u8] {
        &self.key[KEY_LEN - NONCE_LEN..]
    }

    fn mac(&self, id: &[u8]) -> Result<[u8; MAC_LEN]> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.key)
            .map_err(|e| ShortenerError::validation(format!("auth: invalid hmac key: {}", e)))?;
        mac.update(id);
        Ok(mac.finalize().into_bytes().into())
    }

    /// 为用户 ID 签发令牌
    pub fn sign(&self, user_id: &str) -> Result<String> {
        let id = user_id.as_bytes();
        let mac = self.mac(id)?;
        let sealed = self
            .cipher
            .encrypt(Nonce::from_slice(self.nonce_bytes()), mac.as_slice())
            .map_err(|e| ShortenerError::validation(format!("auth: failed to encrypt mac: {}", e)))?;

        let mut signed = Vec::with_capacity(id.len() + sealed.len());
        signed.extend_from_slice(id);
        signed.extend_from_slice(&sealed);
        Ok(hex::encode(signed))
    }

    /// 校验令牌；任何失败都只返回同一个 `AuthenticationFailed`
    pub fn authenticate(&self, token: &str) -> Result<User> {
        let data = hex::decode(token).map_err(|_| ShortenerError::authentication_failed())?;
        if data.len() < SIGNATURE_SIZE {
            return Err(ShortenerError::authentication_failed());
        }

        let (id, sealed) = data.split_at(data.len() - SIGNATURE_SIZE);
        let received = self
            .cipher
            .decrypt(Nonce::from_slice(self.nonce_bytes()), sealed)
            .map_err(|_| ShortenerError::authentication_failed())?;
        let expected = self
            .mac(id)
            .map_err(|_| ShortenerError::authentication_failed())?;

        if !bool::from(expected.as_slice().ct_eq(received.as_slice())) {
            return Err(ShortenerError::authentication_failed());
        }

        let user_id =
            std::str::from_utf8(id).map_err(|_| ShortenerError::authentication_failed())?;
        Ok(User::new(user_id))
    }
}
