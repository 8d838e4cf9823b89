//! Block cipher modes of operation.
//!
//! ECB drives the raw cipher over whole blocks. CBC, CFB and OFB run through
//! the RustCrypto `cbc`, `cfb-mode` and `ofb` crates, which hold the chaining
//! register and the partial-block position, so CFB and OFB data can be fed in
//! chunks of any size and the output matches a single call over the whole
//! buffer. Encryption and decryption chain independently; loading an IV
//! restarts both.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::typenum::{IsLess, Le, NonZero, U256};
use aes::cipher::{
    BlockCipher as RawCipher, BlockDecryptMut, BlockEncryptMut, BlockSizeUser, InnerIvInit,
    StreamCipher,
};

use super::block::BlockCipher;
use crate::error::{CryptError, Result};
use crate::types::Mode;

/// One keyed mode instance, both directions.
trait Chaining {
    fn encrypt(&mut self, data: &mut [u8]);
    fn decrypt(&mut self, data: &mut [u8]);
}

struct CbcChain<C: RawCipher + BlockEncryptMut + BlockDecryptMut> {
    enc: cbc::Encryptor<C>,
    dec: cbc::Decryptor<C>,
}

impl<C: RawCipher + BlockEncryptMut + BlockDecryptMut> Chaining for CbcChain<C> {
    fn encrypt(&mut self, data: &mut [u8]) {
        for block in data.chunks_exact_mut(<C as BlockSizeUser>::block_size()) {
            self.enc.encrypt_block_mut(GenericArray::from_mut_slice(block));
        }
    }

    fn decrypt(&mut self, data: &mut [u8]) {
        for block in data.chunks_exact_mut(<C as BlockSizeUser>::block_size()) {
            self.dec.decrypt_block_mut(GenericArray::from_mut_slice(block));
        }
    }
}

struct CfbChain<C: RawCipher + BlockEncryptMut> {
    enc: cfb_mode::BufEncryptor<C>,
    dec: cfb_mode::BufDecryptor<C>,
}

impl<C: RawCipher + BlockEncryptMut> Chaining for CfbChain<C> {
    fn encrypt(&mut self, data: &mut [u8]) {
        self.enc.encrypt(data);
    }

    fn decrypt(&mut self, data: &mut [u8]) {
        self.dec.decrypt(data);
    }
}

struct OfbChain<C>
where
    C: RawCipher + BlockEncryptMut,
    C::BlockSize: IsLess<U256>,
    Le<C::BlockSize, U256>: NonZero,
{
    enc: ofb::Ofb<C>,
    dec: ofb::Ofb<C>,
}

impl<C> Chaining for OfbChain<C>
where
    C: RawCipher + BlockEncryptMut,
    C::BlockSize: IsLess<U256>,
    Le<C::BlockSize, U256>: NonZero,
{
    fn encrypt(&mut self, data: &mut [u8]) {
        self.enc.apply_keystream(data);
    }

    fn decrypt(&mut self, data: &mut [u8]) {
        self.dec.apply_keystream(data);
    }
}

fn chained<C>(cipher: &C, mode: Mode, iv: &[u8]) -> Result<Box<dyn Chaining + Send>>
where
    C: RawCipher + BlockEncryptMut + BlockDecryptMut + Clone + Send + 'static,
    C::BlockSize: IsLess<U256>,
    Le<C::BlockSize, U256>: NonZero,
{
    if iv.len() != <C as BlockSizeUser>::block_size() {
        return Err(CryptError::BadParam(2));
    }
    let chain: Box<dyn Chaining + Send> = match mode {
        Mode::Cbc => Box::new(CbcChain {
            enc: cbc::Encryptor::inner_iv_init(cipher.clone(), GenericArray::from_slice(iv)),
            dec: cbc::Decryptor::inner_iv_init(cipher.clone(), GenericArray::from_slice(iv)),
        }),
        Mode::Cfb => Box::new(CfbChain {
            enc: cfb_mode::BufEncryptor::inner_iv_init(cipher.clone(), GenericArray::from_slice(iv)),
            dec: cfb_mode::BufDecryptor::inner_iv_init(cipher.clone(), GenericArray::from_slice(iv)),
        }),
        Mode::Ofb => Box::new(OfbChain {
            enc: ofb::Ofb::from_core(ofb::OfbCore::inner_iv_init(cipher.clone(), GenericArray::from_slice(iv))),
            dec: ofb::Ofb::from_core(ofb::OfbCore::inner_iv_init(cipher.clone(), GenericArray::from_slice(iv))),
        }),
        _ => return Err(CryptError::NoMode),
    };
    Ok(chain)
}

/// Chaining state for an IV mode, keyed from a copy of the context's cipher.
pub struct Chain {
    inner: Box<dyn Chaining + Send>,
}

impl Chain {
    /// Start `mode` over `cipher` at `iv`, which must be one block long.
    pub fn new(cipher: &BlockCipher, mode: Mode, iv: &[u8]) -> Result<Self> {
        let inner = match cipher {
            BlockCipher::Des(c) => chained(c, mode, iv)?,
            BlockCipher::TdesEde2(c) => chained(c, mode, iv)?,
            BlockCipher::TdesEde3(c) => chained(c, mode, iv)?,
            BlockCipher::Idea(c) => chained(c, mode, iv)?,
            BlockCipher::Rc2(c) => chained(c, mode, iv)?,
            BlockCipher::Blowfish(c) => chained(c, mode, iv)?,
            BlockCipher::Aes128(c) => chained(c, mode, iv)?,
            BlockCipher::Aes192(c) => chained(c, mode, iv)?,
            BlockCipher::Aes256(c) => chained(c, mode, iv)?,
        };
        Ok(Self { inner })
    }
}

fn check_length(cipher: &BlockCipher, mode: Mode, data: &[u8]) -> Result<()> {
    if mode.needs_whole_blocks() && data.len() % cipher.block_size() != 0 {
        return Err(CryptError::BadParam(2));
    }
    Ok(())
}

/// Encrypt `data` in place under `mode`. IV modes need a `chain`.
pub fn encrypt(cipher: &BlockCipher, mode: Mode, chain: Option<&mut Chain>, data: &mut [u8]) -> Result<()> {
    check_length(cipher, mode, data)?;
    match mode {
        Mode::Ecb => {
            for block in data.chunks_exact_mut(cipher.block_size()) {
                cipher.encrypt_block(block);
            }
        }
        Mode::Cbc | Mode::Cfb | Mode::Ofb => chain.ok_or(CryptError::NoIV)?.inner.encrypt(data),
        _ => return Err(CryptError::NoMode),
    }
    Ok(())
}

/// Decrypt `data` in place under `mode`. IV modes need a `chain`.
pub fn decrypt(cipher: &BlockCipher, mode: Mode, chain: Option<&mut Chain>, data: &mut [u8]) -> Result<()> {
    check_length(cipher, mode, data)?;
    match mode {
        Mode::Ecb => {
            for block in data.chunks_exact_mut(cipher.block_size()) {
                cipher.decrypt_block(block);
            }
        }
        Mode::Cbc | Mode::Cfb | Mode::Ofb => chain.ok_or(CryptError::NoIV)?.inner.decrypt(data),
        _ => return Err(CryptError::NoMode),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Algorithm;

    fn des() -> BlockCipher {
        BlockCipher::new(Algorithm::Des, &hex::decode("0123456789abcdef").unwrap(), None).unwrap()
    }

    /// FIPS 81 sample: "Now is the time for all " under DES.
    const PLAINTEXT: &str = "4e6f77206973207468652074696d6520666f7220616c6c20";
    const FIPS81_IV: &str = "1234567890abcdef";

    fn run(mode: Mode, chunks: &[usize]) -> String {
        let cipher = des();
        let mut chain = match mode {
            Mode::Ecb => None,
            _ => Some(Chain::new(&cipher, mode, &hex::decode(FIPS81_IV).unwrap()).unwrap()),
        };
        let mut data = hex::decode(PLAINTEXT).unwrap();
        let mut start = 0;
        for &len in chunks {
            encrypt(&cipher, mode, chain.as_mut(), &mut data[start..start + len]).unwrap();
            start += len;
        }
        assert_eq!(start, data.len());
        hex::encode(data)
    }

    #[test]
    fn test_fips81_ecb() {
        assert_eq!(
            run(Mode::Ecb, &[24]),
            "3fa40e8a984d48156a271787ab8883f9893d51ec4b563b53"
        );
    }

    #[test]
    fn test_fips81_cbc() {
        assert_eq!(
            run(Mode::Cbc, &[8, 16]),
            "e5c7cdde872bf27c43e934008c389c0f683788499a7c05f6"
        );
    }

    #[test]
    fn test_fips81_cfb64() {
        assert_eq!(
            run(Mode::Cfb, &[24]),
            "f3096249c7f46e51a69e839b1a92f78403467133898ea622"
        );
    }

    #[test]
    fn test_fips81_ofb64() {
        assert_eq!(
            run(Mode::Ofb, &[24]),
            "f3096249c7f46e5135f24a242eeb3d3f3d6d5be3255af8c3"
        );
    }

    #[test]
    fn test_stream_modes_chunking_is_transparent() {
        for mode in [Mode::Cfb, Mode::Ofb] {
            let whole = run(mode, &[24]);
            assert_eq!(run(mode, &[1, 7, 3, 13]), whole);
            assert_eq!(run(mode, &[0, 24, 0]), whole);
        }
    }

    #[test]
    fn test_block_modes_reject_partial_blocks() {
        let cipher = des();
        let mut chain = Chain::new(&cipher, Mode::Cbc, &[0u8; 8]).unwrap();
        let mut data = [0u8; 7];
        assert_eq!(
            encrypt(&cipher, Mode::Cbc, Some(&mut chain), &mut data),
            Err(CryptError::BadParam(2))
        );
        assert_eq!(
            decrypt(&cipher, Mode::Ecb, None, &mut data),
            Err(CryptError::BadParam(2))
        );
    }

    #[test]
    fn test_iv_modes_need_a_chain() {
        let cipher = des();
        let mut data = [0u8; 8];
        assert_eq!(encrypt(&cipher, Mode::Ofb, None, &mut data), Err(CryptError::NoIV));
        assert!(matches!(Chain::new(&cipher, Mode::Cfb, &[0u8; 16]), Err(CryptError::BadParam(2))));
        assert!(matches!(Chain::new(&cipher, Mode::Ecb, &[0u8; 8]), Err(CryptError::NoMode)));
    }

    #[test]
    fn test_decrypt_inverts_encrypt() {
        for (algorithm, key_len) in [(Algorithm::Des, 8), (Algorithm::Idea, 16), (Algorithm::Aes, 24)] {
            let cipher = BlockCipher::new(algorithm, &vec![0x5c; key_len], None).unwrap();
            let bs = cipher.block_size();
            for mode in [Mode::Ecb, Mode::Cbc, Mode::Cfb, Mode::Ofb] {
                let original: Vec<u8> = (0..4 * bs as u8).collect();
                let mut data = original.clone();
                let mut chain = match mode {
                    Mode::Ecb => None,
                    _ => Some(Chain::new(&cipher, mode, &vec![7u8; bs]).unwrap()),
                };
                encrypt(&cipher, mode, chain.as_mut(), &mut data).unwrap();
                assert_ne!(data, original);
                decrypt(&cipher, mode, chain.as_mut(), &mut data).unwrap();
                assert_eq!(data, original, "{:?} {:?}", algorithm, mode);
            }
        }
    }
}
