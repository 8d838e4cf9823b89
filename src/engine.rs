//! The engine: owner of every context and of the option table.
//!
//! All state sits in one `Engine` value and every operation takes `&mut self`,
//! so contexts are confined to whichever thread owns the engine. Dropping or
//! shutting down the engine wipes whatever contexts are still live.

use std::sync::Arc;

use crate::capability::{self, Registry};
use crate::config::{Config, CryptOption, OptionValue};
use crate::context::table::ContextTable;
use crate::context::{Context, ContextHandle, ContextInfo};
use crate::crypto::{ExtendedParams, MessageDigest, PkcKey};
use crate::error::{CryptError, Result};
use crate::types::{Algorithm, AlgorithmClass, Mode};

pub struct Engine {
    pub(crate) registry: Arc<Registry>,
    pub(crate) contexts: ContextTable,
    pub(crate) config: Config,
}

impl Engine {
    /// Create an engine with the default option table, building the
    /// process-wide capability registry on first use.
    pub fn new() -> Result<Self> {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        match capability::init() {
            Ok(()) | Err(CryptError::Inited) => {}
            Err(e) => return Err(e),
        }
        Ok(Self::with_registry(capability::registry()?, config))
    }

    /// Engine over a caller-built registry.
    pub(crate) fn with_registry(registry: Arc<Registry>, config: Config) -> Self {
        if config.memory_lock {
            log::warn!("Memory locking requested but not supported, recording policy only");
        }
        Self {
            registry,
            contexts: ContextTable::new(),
            config,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    // ── Lifecycle ──────────────────────────────────────────────

    pub fn create_context(&mut self, algorithm: Algorithm, mode: Mode) -> Result<ContextHandle> {
        self.create(algorithm, mode, None)
    }

    /// Create a context with per-instance parameters. Only algorithms with
    /// an extended init accept them; anything else fails `BadParam(3)`.
    pub fn create_context_ex(
        &mut self,
        algorithm: Algorithm,
        mode: Mode,
        ext: ExtendedParams,
    ) -> Result<ContextHandle> {
        self.create(algorithm, mode, Some(ext))
    }

    /// Create a context for the configured default of `class`.
    pub fn create_default_context(&mut self, class: AlgorithmClass) -> Result<ContextHandle> {
        let (algorithm, mode) = match class {
            AlgorithmClass::Hash => (self.config.hash_algorithm, Mode::None),
            AlgorithmClass::Pkc => (self.config.pkc_algorithm, Mode::Pkc),
            AlgorithmClass::Cipher => (self.config.cipher_algorithm, self.config.cipher_mode),
        };
        self.create(algorithm, mode, None)
    }

    fn create(
        &mut self,
        algorithm: Algorithm,
        mode: Mode,
        ext: Option<ExtendedParams>,
    ) -> Result<ContextHandle> {
        let capability = *self.registry.lookup(algorithm, mode)?;
        let context = Context::new(capability, ext)?;
        let handle = self.contexts.insert(context)?;
        log::debug!("Created {} context ({:?})", capability.name, capability.mode);
        Ok(handle)
    }

    /// Destroy a context, wiping its key material. Destroying twice fails
    /// `NotInited`.
    pub fn destroy_context(&mut self, handle: ContextHandle) -> Result<()> {
        let context = self.contexts.remove(handle)?;
        log::debug!("Destroyed {} context", context.capability.name);
        drop(context);
        Ok(())
    }

    /// Number of contexts still alive.
    pub fn live_contexts(&self) -> usize {
        self.contexts.len()
    }

    /// Wipe every remaining context. Reports `Orphan(n)` when any were
    /// still alive.
    pub fn shutdown(mut self) -> Result<()> {
        let orphans = self.contexts.clear();
        if orphans > 0 {
            log::warn!("Engine shut down with {} live context(s)", orphans);
            return Err(CryptError::Orphan(orphans));
        }
        log::info!("Engine shut down cleanly");
        Ok(())
    }

    pub(crate) fn context(&self, handle: ContextHandle) -> Result<&Context> {
        self.contexts.get(handle)
    }

    pub(crate) fn context_mut(&mut self, handle: ContextHandle) -> Result<&mut Context> {
        self.contexts.get_mut(handle)
    }

    // ── Keys and IVs ───────────────────────────────────────────

    pub fn load_key(&mut self, handle: ContextHandle, key: &[u8]) -> Result<()> {
        self.context_mut(handle)?.load_key(key)
    }

    pub fn load_pkc_key(&mut self, handle: ContextHandle, key: &PkcKey) -> Result<()> {
        self.context_mut(handle)?.load_pkc_key(key)
    }

    pub fn generate_key(&mut self, handle: ContextHandle) -> Result<()> {
        self.context_mut(handle)?.generate_key()
    }

    pub fn load_iv(&mut self, handle: ContextHandle, iv: &[u8]) -> Result<()> {
        self.context_mut(handle)?.load_iv(iv)
    }

    pub fn retrieve_iv(&self, handle: ContextHandle) -> Result<Vec<u8>> {
        self.context(handle)?.retrieve_iv()
    }

    // ── Data ───────────────────────────────────────────────────

    /// Encrypt `data` in place. On a hash context this feeds the hash, and an
    /// empty buffer finishes it.
    pub fn encrypt(&mut self, handle: ContextHandle, data: &mut [u8]) -> Result<()> {
        self.context_mut(handle)?.encrypt(data)
    }

    pub fn decrypt(&mut self, handle: ContextHandle, data: &mut [u8]) -> Result<()> {
        self.context_mut(handle)?.decrypt(data)
    }

    /// Feed `data` into a hash context and finish it in one call.
    pub fn hash_data(&mut self, handle: ContextHandle, data: &[u8]) -> Result<MessageDigest> {
        let context = self.context_mut(handle)?;
        if !context.capability.is_hash() {
            return Err(CryptError::BadParam(1));
        }
        let mut buf = data.to_vec();
        if !buf.is_empty() {
            context.encrypt(&mut buf)?;
        }
        context.encrypt(&mut [])?;
        context.hash_value()
    }

    pub fn hash_value(&self, handle: ContextHandle) -> Result<MessageDigest> {
        self.context(handle)?.hash_value()
    }

    pub fn reset_hash(&mut self, handle: ContextHandle) -> Result<()> {
        self.context_mut(handle)?.reset_hash()
    }

    // ── Attributes ─────────────────────────────────────────────

    pub fn query_context(&self, handle: ContextHandle) -> Result<ContextInfo> {
        Ok(self.context(handle)?.info())
    }

    pub fn set_key_id(&mut self, handle: ContextHandle, key_id: &[u8]) -> Result<()> {
        if key_id.is_empty() || key_id.len() > u8::MAX as usize {
            return Err(CryptError::BadParam(2));
        }
        self.context_mut(handle)?.key_id = Some(key_id.to_vec());
        Ok(())
    }

    pub fn key_id(&self, handle: ContextHandle) -> Result<Option<Vec<u8>>> {
        Ok(self.context(handle)?.key_id.clone())
    }

    pub fn set_control_vector(&mut self, handle: ContextHandle, control_vector: u32) -> Result<()> {
        self.context_mut(handle)?.control_vector = control_vector;
        Ok(())
    }

    pub fn control_vector(&self, handle: ContextHandle) -> Result<u32> {
        Ok(self.context(handle)?.control_vector)
    }

    // ── Options ────────────────────────────────────────────────

    pub fn option(&self, option: CryptOption) -> OptionValue {
        self.config.get(option)
    }

    pub fn set_option(&mut self, option: CryptOption, value: OptionValue) -> Result<()> {
        self.config.set(option, value)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        let orphans = self.contexts.clear();
        if orphans > 0 {
            log::warn!("Engine dropped with {} live context(s), wiped", orphans);
        }
    }
}
