//! Fixed 512-bit keys for unit tests. Far too small for real use.

use crate::crypto::{DhComponents, RsaComponents};

const RSA_E: &str = "010001";

const RSA_A_N: &str = "b250047a1e4f3c394ee6f35c68f149917e9177d1c2a674ec0aaa3b08e4164f24210ce8975ca22d9c87f64918892dd0a4c23b08c152e2a87973120f59b1f4dd73";
const RSA_A_D: &str = "acc8aeddea9adaffa93e4fd95ef358577ceed6cd52b1dba092610c1d7c6f45b55bd5050c5db0b2060a069a5dfcecfa65c07fb062da48af1d143f43d983b970b9";
const RSA_A_P: &str = "c295b4e0cedced87308397a1734da7ab2e3ff7f4429f37852ea04327c957fe35";
const RSA_A_Q: &str = "ea97874c4c08a92d611aa8a47fe12fcbf83f179c8dbc59cdd738ededc25e8207";

const RSA_B_N: &str = "d44aa93fcdfd9ce73d2d96fd8e831d200ef138942a9f1e8571613e19cd01d3032889e4a64f403b101f803d4f38b658a47bcbaf393f78791b466dee80d23a1d9f";
const RSA_B_D: &str = "a21b10fa83d57186b214aa039c5b4a563c92be5d85de53741a8be2dbd8cbd7d0609e45fed7e2db4a9fa07ae23c00520189bf987635a0be91728c0e86c4d5fee1";
const RSA_B_P: &str = "fabd5dc72918644ad06585ff98f04429c6aa98fcd605ff1082288bd78f57c953";
const RSA_B_Q: &str = "d8becdcec5134225d034233178060372086c99cc205244bf70bccbcd08373505";

const DH_P: &str = "ecf38eb1a2e71aceedcbddb2fc97e3b447394cb779040fd647db360eb0bb47a4527f5f7fa4a567800936207ed1372bcbed18f1e6922fadfab70d4ffb76d417d1";

fn unhex(s: &str) -> Vec<u8> {
    hex::decode(s).unwrap()
}

fn rsa_private(n: &str, d: &str, p: &str, q: &str) -> RsaComponents {
    RsaComponents {
        n: unhex(n),
        e: unhex(RSA_E),
        d: Some(unhex(d)),
        p: Some(unhex(p)),
        q: Some(unhex(q)),
    }
}

fn rsa_public(n: &str) -> RsaComponents {
    RsaComponents {
        n: unhex(n),
        e: unhex(RSA_E),
        d: None,
        p: None,
        q: None,
    }
}

pub fn rsa_private_a() -> RsaComponents {
    rsa_private(RSA_A_N, RSA_A_D, RSA_A_P, RSA_A_Q)
}

pub fn rsa_public_a() -> RsaComponents {
    rsa_public(RSA_A_N)
}

pub fn rsa_private_b() -> RsaComponents {
    rsa_private(RSA_B_N, RSA_B_D, RSA_B_P, RSA_B_Q)
}

pub fn rsa_public_b() -> RsaComponents {
    rsa_public(RSA_B_N)
}

pub fn dh_params() -> DhComponents {
    DhComponents {
        p: unhex(DH_P),
        g: vec![2],
    }
}
