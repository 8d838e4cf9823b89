//! Cross-module scenarios: everything here goes through `Engine` the way a
//! caller would.

mod cipher_tests {
    use crate::{Algorithm, AlgorithmClass, Capability, CryptError, Engine};

    // ── Helpers ──────────────────────────────────────────────────────────

    fn engine() -> Engine {
        let _ = env_logger::builder().is_test(true).try_init();
        Engine::new().unwrap()
    }

    fn conventional(engine: &Engine) -> Vec<Capability> {
        engine
            .registry()
            .capabilities()
            .iter()
            .filter(|cap| cap.algorithm.class() == AlgorithmClass::Cipher)
            .copied()
            .collect()
    }

    fn key_for(cap: &Capability) -> Vec<u8> {
        (0..cap.key_size).map(|i| (i as u8).wrapping_mul(37).wrapping_add(11)).collect()
    }

    /// Lengths to try: empty, one byte, one short of a block, a block, and
    /// several blocks plus a remainder. Block modes keep whole blocks only.
    fn lengths(cap: &Capability) -> Vec<usize> {
        let bs = cap.block_size;
        let all = [0, 1, bs.saturating_sub(1), bs, 5 * bs + 3];
        all.into_iter()
            .filter(|n| !cap.mode.needs_whole_blocks() || n % bs == 0)
            .collect()
    }

    /// Chunk sizes that split `len` unevenly, rounded to blocks when the
    /// mode needs them.
    fn chunks(cap: &Capability, len: usize) -> Vec<usize> {
        let step = if cap.mode.needs_whole_blocks() { cap.block_size } else { 1 };
        let pattern = [1, 3, 2, 7];
        let mut sizes = Vec::new();
        let mut done = 0;
        let mut i = 0;
        while done < len {
            let size = (pattern[i % pattern.len()] * step).min(len - done);
            sizes.push(size);
            done += size;
            i += 1;
        }
        sizes
    }

    // ── Round trips ──────────────────────────────────────────────────────

    #[test]
    fn test_every_cipher_roundtrips_in_chunks() {
        let mut engine = engine();
        for cap in conventional(&engine) {
            let key = key_for(&cap);
            for len in lengths(&cap) {
                let plaintext: Vec<u8> = (0..len).map(|i| i as u8).collect();

                let whole = engine.create_context(cap.algorithm, cap.mode).unwrap();
                engine.load_key(whole, &key).unwrap();
                let mut one_shot = plaintext.clone();
                engine.encrypt(whole, &mut one_shot).unwrap();

                let chunked = engine.create_context(cap.algorithm, cap.mode).unwrap();
                engine.load_key(chunked, &key).unwrap();
                if cap.mode.needs_iv() {
                    let iv = engine.retrieve_iv(whole).unwrap();
                    engine.load_iv(chunked, &iv).unwrap();
                }
                let mut pieces = plaintext.clone();
                let mut offset = 0;
                for size in chunks(&cap, len) {
                    engine.encrypt(chunked, &mut pieces[offset..offset + size]).unwrap();
                    offset += size;
                }
                assert_eq!(pieces, one_shot, "{} len={}", cap.name, len);

                let reader = engine.create_context(cap.algorithm, cap.mode).unwrap();
                engine.load_key(reader, &key).unwrap();
                if cap.mode.needs_iv() {
                    let iv = engine.retrieve_iv(whole).unwrap();
                    engine.load_iv(reader, &iv).unwrap();
                }
                let mut offset = 0;
                for size in chunks(&cap, len).into_iter().rev() {
                    engine.decrypt(reader, &mut pieces[offset..offset + size]).unwrap();
                    offset += size;
                }
                assert_eq!(pieces, plaintext, "{} len={}", cap.name, len);

                for h in [whole, chunked, reader] {
                    engine.destroy_context(h).unwrap();
                }
            }
        }
        assert_eq!(engine.live_contexts(), 0);
    }

    #[test]
    fn test_ciphertext_depends_on_key() {
        let mut engine = engine();
        for cap in conventional(&engine) {
            let mut outputs = Vec::new();
            for flip in [0u8, 1] {
                let mut key = key_for(&cap);
                key[0] ^= flip;
                let h = engine.create_context(cap.algorithm, cap.mode).unwrap();
                engine.load_key(h, &key).unwrap();
                if cap.mode.needs_iv() {
                    engine.load_iv(h, &vec![0u8; cap.iv_size]).unwrap();
                }
                let mut data = vec![0x55u8; (2 * cap.block_size).max(16)];
                engine.encrypt(h, &mut data).unwrap();
                outputs.push(data);
            }
            // DES ignores the low bit of each key byte.
            if matches!(cap.algorithm, Algorithm::Des | Algorithm::TripleDes) {
                continue;
            }
            assert_ne!(outputs[0], outputs[1], "{}", cap.name);
        }
    }

    #[test]
    fn test_partial_block_rejected() {
        let mut engine = engine();
        let h = engine.create_context(Algorithm::Aes, crate::Mode::Ecb).unwrap();
        engine.load_key(h, &[0u8; 16]).unwrap();
        assert_eq!(engine.encrypt(h, &mut [0u8; 15]), Err(CryptError::BadParam(2)));
    }
}

mod hash_tests {
    use crate::{Algorithm, CryptError, Engine, Mode};

    fn digest_hex(engine: &mut Engine, algorithm: Algorithm, data: &[u8]) -> String {
        let h = engine.create_context(algorithm, Mode::None).unwrap();
        let digest = engine.hash_data(h, data).unwrap();
        engine.destroy_context(h).unwrap();
        hex::encode(digest.as_bytes())
    }

    #[test]
    fn test_known_digests_of_abc() {
        let mut engine = Engine::new().unwrap();
        let cases = [
            (Algorithm::Md2, "da853b0d3f88d99b30283a69e6ded6bb"),
            (Algorithm::Md4, "a448017aaf21d8525fc10ae87aa6729d"),
            (Algorithm::Md5, "900150983cd24fb0d6963f7d28e17f72"),
            (Algorithm::Sha1, "a9993e364706816aba3e25717850c26c9cd0d89d"),
            (Algorithm::Ripemd160, "8eb208f7e05d987a9b044a8e98c6b087f15a0bfc"),
            (
                Algorithm::Sha256,
                "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
            ),
        ];
        for (algorithm, expected) in cases {
            assert_eq!(digest_hex(&mut engine, algorithm, b"abc"), expected, "{:?}", algorithm);
        }
    }

    #[test]
    fn test_chunked_hash_matches_one_shot() {
        let mut engine = Engine::new().unwrap();
        let data: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
        let expected = digest_hex(&mut engine, Algorithm::Sha256, &data);

        let h = engine.create_context(Algorithm::Sha256, Mode::None).unwrap();
        for chunk in data.chunks(77) {
            engine.encrypt(h, &mut chunk.to_vec()).unwrap();
        }
        assert_eq!(engine.hash_value(h), Err(CryptError::Incomplete));
        engine.encrypt(h, &mut []).unwrap();
        assert_eq!(hex::encode(engine.hash_value(h).unwrap().as_bytes()), expected);
        assert_eq!(engine.encrypt(h, &mut [1u8]), Err(CryptError::Complete));

        engine.reset_hash(h).unwrap();
        assert_eq!(engine.hash_data(h, &data).map(|d| hex::encode(d.as_bytes())), Ok(expected));
    }
}

mod object_tests {
    use crate::crypto::PkcKey;
    use crate::object::ObjectType;
    use crate::test_keys;
    use crate::{query_object, Algorithm, CryptError, Engine, Mode};

    /// EncryptedData { RawData { n bytes } } assembled by hand from the
    /// codec calls, then taken apart again.
    fn nested_roundtrip(engine: &mut Engine, algorithm: Algorithm, mode: Mode, key: &[u8], n: usize) {
        let writer = engine.create_context(algorithm, mode).unwrap();
        let reader = engine.create_context(algorithm, mode).unwrap();
        engine.load_key(writer, key).unwrap();
        engine.load_key(reader, key).unwrap();

        let data: Vec<u8> = (0..n).map(|i| (i * 7) as u8).collect();
        let raw_len = engine.export_object(None, ObjectType::RawData, n, None).unwrap();
        let mut inner = vec![0u8; raw_len];
        engine
            .export_object(Some(&mut inner[..]), ObjectType::RawData, n, None)
            .unwrap();
        inner.extend_from_slice(&data);

        let outer_len = engine
            .export_object(None, ObjectType::EncryptedData, inner.len(), Some(writer))
            .unwrap();
        let mut object = vec![0u8; outer_len];
        engine
            .export_object(Some(&mut object[..]), ObjectType::EncryptedData, inner.len(), Some(writer))
            .unwrap();
        engine.encrypt(writer, &mut inner).unwrap();
        object.extend_from_slice(&inner);

        let imported = engine.import_object(&object, Some(reader)).unwrap();
        assert_eq!(imported.info.total_len(), object.len());
        let mut payload = object[imported.payload_offset..].to_vec();
        engine.decrypt(reader, &mut payload).unwrap();

        let raw = query_object(&payload).unwrap();
        assert_eq!(raw.object_type, ObjectType::RawData);
        assert_eq!(raw.payload_len, n);
        assert_eq!(&payload[raw.header_len..], &data[..]);
    }

    #[test]
    fn test_nested_objects_for_several_sizes() {
        let mut engine = Engine::new().unwrap();
        for n in [0usize, 1, 4096] {
            nested_roundtrip(&mut engine, Algorithm::Rc4, Mode::Stream, &[0xA5; 16], n);
            nested_roundtrip(&mut engine, Algorithm::Idea, Mode::Ofb, &[0x5A; 16], n);
        }
    }

    /// SignedData { RawData { n bytes } }: the hash context handed back by
    /// import must see exactly the inner object.
    fn signed_roundtrip(engine: &mut Engine, n: usize) {
        let signer = engine.create_context(Algorithm::Rsa, Mode::Pkc).unwrap();
        engine
            .load_pkc_key(signer, &PkcKey::Rsa(test_keys::rsa_private_a()))
            .unwrap();

        let data: Vec<u8> = (0..n).map(|i| (i * 13) as u8).collect();
        let raw_len = engine.export_object(None, ObjectType::RawData, n, None).unwrap();
        let mut inner = vec![0u8; raw_len];
        engine
            .export_object(Some(&mut inner[..]), ObjectType::RawData, n, None)
            .unwrap();
        inner.extend_from_slice(&data);

        let outer_len = engine
            .export_object(None, ObjectType::SignedData, inner.len(), Some(signer))
            .unwrap();
        let mut object = vec![0u8; outer_len];
        let written = engine
            .export_object(Some(&mut object[..]), ObjectType::SignedData, inner.len(), Some(signer))
            .unwrap();
        assert_eq!(written, outer_len);
        object.extend_from_slice(&inner);

        let imported = engine.import_object(&object, None).unwrap();
        assert_eq!(imported.payload_offset, outer_len);
        assert_eq!(imported.payload_len, inner.len());
        let payload = &object[imported.payload_offset..];

        let hash = imported.hash_context.unwrap();
        let seen = engine.hash_data(hash, payload).unwrap();
        let reference = engine.create_context(Algorithm::Sha1, Mode::None).unwrap();
        assert_eq!(engine.hash_data(reference, &inner).unwrap().as_bytes(), seen.as_bytes());

        let raw = query_object(payload).unwrap();
        assert_eq!(raw.object_type, ObjectType::RawData);
        assert_eq!(raw.payload_len, n);
        assert_eq!(&payload[raw.header_len..], &data[..]);

        for h in [hash, reference, signer] {
            engine.destroy_context(h).unwrap();
        }
    }

    #[test]
    fn test_signed_objects_for_several_sizes() {
        let mut engine = Engine::new().unwrap();
        for n in [0usize, 1, 4096] {
            signed_roundtrip(&mut engine, n);
        }
        assert_eq!(engine.live_contexts(), 0);
    }

    #[test]
    fn test_long_form_length_for_large_payload() {
        let mut engine = Engine::new().unwrap();
        let header_len = engine.export_object(None, ObjectType::RawData, 4096, None).unwrap();
        let mut header = vec![0u8; header_len];
        engine
            .export_object(Some(&mut header[..]), ObjectType::RawData, 4096, None)
            .unwrap();
        assert_eq!(header, [0x01, 0x82, 0x10, 0x00]);
    }

    #[test]
    fn test_short_output_buffer() {
        let mut engine = Engine::new().unwrap();
        let mut buf = [0u8; 1];
        assert_eq!(
            engine.export_object(Some(&mut buf[..]), ObjectType::RawData, 10, None),
            Err(CryptError::BadParam(1))
        );
    }
}

mod lifecycle_tests {
    use crate::context::table::ContextTable;
    use crate::{Algorithm, CryptError, Engine, Mode};

    #[test]
    fn test_destroyed_handle_is_refused_everywhere() {
        let mut engine = Engine::new().unwrap();
        let h = engine.create_context(Algorithm::Blowfish, Mode::Cbc).unwrap();
        engine.load_key(h, &[3u8; 16]).unwrap();
        engine.destroy_context(h).unwrap();

        assert_eq!(engine.load_key(h, &[3u8; 16]), Err(CryptError::NotInited));
        assert_eq!(engine.encrypt(h, &mut [0u8; 8]), Err(CryptError::NotInited));
        assert_eq!(engine.retrieve_iv(h), Err(CryptError::NotInited));
        assert_eq!(engine.query_context(h).map(|_| ()), Err(CryptError::NotInited));
        assert_eq!(engine.destroy_context(h), Err(CryptError::NotInited));

        // The slot is reused, the old handle stays dead.
        let fresh = engine.create_context(Algorithm::Blowfish, Mode::Cbc).unwrap();
        assert_ne!(fresh, h);
        assert_eq!(engine.encrypt(h, &mut [0u8; 8]), Err(CryptError::NotInited));
        engine.destroy_context(fresh).unwrap();
    }

    #[test]
    fn test_handles_do_not_cross_engines() {
        let mut first = Engine::new().unwrap();
        let mut second = Engine::new().unwrap();
        // Seeds close together would read as stale handles instead.
        first.contexts = ContextTable::with_seed(7);
        second.contexts = ContextTable::with_seed(7 + (1 << 24));
        let h = first.create_context(Algorithm::Md5, Mode::None).unwrap();
        assert_eq!(second.hash_data(h, b"x").map(|_| ()), Err(CryptError::InvalidHandle));
        first.destroy_context(h).unwrap();
    }

    #[test]
    fn test_shutdown_reports_orphans() {
        let mut engine = Engine::new().unwrap();
        engine.create_context(Algorithm::Sha1, Mode::None).unwrap();
        engine.create_context(Algorithm::Des, Mode::Ecb).unwrap();
        assert_eq!(engine.shutdown(), Err(CryptError::Orphan(2)));

        let engine = Engine::new().unwrap();
        assert_eq!(engine.shutdown(), Ok(()));
    }

    #[test]
    fn test_derived_key_opens_sealed_data() {
        let mut engine = Engine::new().unwrap();
        let writer = engine.create_context(Algorithm::TripleDes, Mode::Cbc).unwrap();
        let reader = engine.create_context(Algorithm::TripleDes, Mode::Cbc).unwrap();
        engine.derive_key(writer, b"correct horse", None, None).unwrap();
        engine.derive_key(reader, b"correct horse", None, None).unwrap();

        let sealed = engine.seal_data(writer, b"battery staple").unwrap();
        assert_eq!(engine.open_data(reader, &sealed).unwrap(), b"battery staple");

        let wrong = engine.create_context(Algorithm::TripleDes, Mode::Cbc).unwrap();
        engine.derive_key(wrong, b"correct horsf", None, None).unwrap();
        assert_eq!(engine.open_data(wrong, &sealed), Err(CryptError::WrongKey));
    }
}
