//! Known-answer self-tests, one per algorithm.

use crate::crypto::hash::hash_parts;
use crate::crypto::modes;
use crate::crypto::{BlockCipher, DhComponents, DhKey, RsaComponents, RsaKey, StreamState};
use crate::types::{Algorithm, Mode};

/// (key, plaintext, ciphertext) for a single ECB block.
fn block_vector(algorithm: Algorithm) -> Option<(&'static str, &'static str, &'static str)> {
    let vector = match algorithm {
        Algorithm::Des => ("0123456789abcdef", "4e6f772069732074", "3fa40e8a984d4815"),
        Algorithm::TripleDes => (
            "0123456789abcdef23456789abcdef01456789abcdef0123",
            "4e6f772069732074",
            "314f8327fa7a09a8",
        ),
        Algorithm::Idea => (
            "00010002000300040005000600070008",
            "0000000100020003",
            "11fbed2b01986de5",
        ),
        Algorithm::Rc2 => (
            "88bca90e90875a7f0f79c384627bafb2",
            "0000000000000000",
            "2269552ab0f85ca6",
        ),
        Algorithm::Blowfish => ("0000000000000000", "0000000000000000", "4ef997456198dd78"),
        Algorithm::Aes => (
            "000102030405060708090a0b0c0d0e0f",
            "00112233445566778899aabbccddeeff",
            "69c4e0d86a7b0430d8cdb78070b4c55a",
        ),
        _ => return None,
    };
    Some(vector)
}

fn hash_vector(algorithm: Algorithm) -> Option<&'static str> {
    let digest = match algorithm {
        Algorithm::Md2 => "da853b0d3f88d99b30283a69e6ded6bb",
        Algorithm::Md4 => "a448017aaf21d8525fc10ae87aa6729d",
        Algorithm::Md5 => "900150983cd24fb0d6963f7d28e17f72",
        Algorithm::Sha1 => "a9993e364706816aba3e25717850c26c9cd0d89d",
        Algorithm::Ripemd160 => "8eb208f7e05d987a9b044a8e98c6b087f15a0bfc",
        Algorithm::Sha256 => "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
        _ => return None,
    };
    Some(digest)
}

fn test_block(algorithm: Algorithm) -> bool {
    let Some((key, pt, ct)) = block_vector(algorithm) else {
        return false;
    };
    let (Ok(key), Ok(pt), Ok(ct)) = (hex::decode(key), hex::decode(pt), hex::decode(ct)) else {
        return false;
    };
    let Ok(cipher) = BlockCipher::new(algorithm, &key, None) else {
        return false;
    };
    let mut block = pt.clone();
    if modes::encrypt(&cipher, Mode::Ecb, None, &mut block).is_err() || block != ct {
        return false;
    }
    modes::decrypt(&cipher, Mode::Ecb, None, &mut block).is_ok() && block == pt
}

fn test_rc4() -> bool {
    // RFC 6229, 128-bit key, keystream offset 0.
    let key = [
        0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f,
        0x10,
    ];
    let Ok(mut state) = StreamState::new(&key) else {
        return false;
    };
    let mut data = [0u8; 16];
    state.apply(&mut data);
    hex::encode(data) == "9ac7cc9a609d1ef7b2932899cde41b97"
}

fn test_hash(algorithm: Algorithm) -> bool {
    match (hash_vector(algorithm), hash_parts(algorithm, &[b"abc"])) {
        (Some(expected), Ok(digest)) => hex::encode(digest.as_bytes()) == expected,
        _ => false,
    }
}

/// 512-bit RSA key used only to exercise the exponentiation path.
const RSA_N: &str = "d4190737c7518171a3ca6f00018266aa4be58c1b9b9b82237edb1cff2b1cf3490c558d3a67def1072e4b0c4e0f831681d3d8c9934f7cb893e61d53cd98e862b9";
const RSA_D: &str = "06821a1999112432b37ef3b70154da07a1ba92790a665430f8a48a983ddf6e8ba1fb2380db91ad2dd2c37575730acd0345007dd71ae380e3a0d54c5fd637a481";

fn test_rsa() -> bool {
    let (Ok(n), Ok(d)) = (hex::decode(RSA_N), hex::decode(RSA_D)) else {
        return false;
    };
    let components = RsaComponents {
        n,
        e: vec![0x01, 0x00, 0x01],
        d: Some(d),
        p: None,
        q: None,
    };
    let Ok(key) = RsaKey::load(&components) else {
        return false;
    };
    let mut block = vec![0u8; key.modulus_len()];
    block[1] = 0x01;
    block[40..].fill(0x5a);
    match key.private_op(&block).and_then(|sig| key.public_op(&sig)) {
        Ok(recovered) => recovered == block,
        Err(_) => false,
    }
}

const DH_P: &str = "ecf38eb1a2e71aceedcbddb2fc97e3b447394cb779040fd647db360eb0bb47a4527f5f7fa4a567800936207ed1372bcbed18f1e6922fadfab70d4ffb76d417d1";

fn test_dh() -> bool {
    let Ok(p) = hex::decode(DH_P) else {
        return false;
    };
    let components = DhComponents { p, g: vec![2] };
    let (Ok(mut a), Ok(mut b)) = (DhKey::load(&components), DhKey::load(&components)) else {
        return false;
    };
    let len = a.modulus_len();
    let mut ya = vec![0x11u8; len];
    let mut yb = vec![0x22u8; len];
    if a.phase1(&mut ya).is_err() || b.phase1(&mut yb).is_err() {
        return false;
    }
    let (mut sa, mut sb) = (yb.clone(), ya.clone());
    a.phase2(&mut sa).is_ok() && b.phase2(&mut sb).is_ok() && sa == sb
}

/// Run the self-test for `algorithm`.
pub fn run(algorithm: Algorithm) -> bool {
    match algorithm {
        Algorithm::Des
        | Algorithm::TripleDes
        | Algorithm::Idea
        | Algorithm::Rc2
        | Algorithm::Blowfish
        | Algorithm::Aes => test_block(algorithm),
        Algorithm::Rc4 => test_rc4(),
        Algorithm::Md2
        | Algorithm::Md4
        | Algorithm::Md5
        | Algorithm::Sha1
        | Algorithm::Ripemd160
        | Algorithm::Sha256 => test_hash(algorithm),
        Algorithm::Rsa => test_rsa(),
        Algorithm::Dh => test_dh(),
    }
}
