//! Approval of scripts that ask to run outside the sandbox.

use std::{io::Write, sync::Mutex};

use anyhow::{Context, Result};
use cascade::{param::SecureScript, script::ScriptError};
use hashbrown::HashSet;

type HashAlgo = sha::sha256::Sha256;

const DIGEST_LEN: usize = 32;

/// SHA-256 digest of a script's source.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ScriptDigest([u8; DIGEST_LEN]);

impl ScriptDigest {
    pub fn of_source(source: &str) -> Result<Self> {
        let mut hash = HashAlgo::default();
        std::hash::Hasher::write(&mut hash, source.as_bytes());
        hash.flush().with_context(|| "flushing script hash")?;
        let digest_vec = sha::utils::DigestExt::to_bytes(&mut hash);
        let mut digest = Self([0; DIGEST_LEN]);
        digest.0.copy_from_slice(&digest_vec);
        Ok(digest)
    }
}

impl std::fmt::Display for ScriptDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Decides which scripts may run. Sandboxed scripts always may. Others must have been approved
/// by digest, unless every script is trusted.
#[derive(Debug, Default)]
pub struct ScriptApproval {
    trust_all: bool,
    approved: Mutex<HashSet<ScriptDigest>>,
}

impl ScriptApproval {
    pub fn new() -> Self {
        Default::default()
    }

    /// Approval that allows every script to run.
    pub fn trusting_all() -> Self {
        Self {
            trust_all: true,
            ..Default::default()
        }
    }

    /// Approves `source` to run outside the sandbox.
    pub fn preapprove(&self, source: &str) -> Result<ScriptDigest> {
        let digest = ScriptDigest::of_source(source)?;
        log::info!("Approved script {digest}.");
        self.approved
            .lock()
            .expect("failed to lock approved scripts for insert")
            .insert(digest);
        Ok(digest)
    }

    pub fn check(&self, script: &SecureScript) -> Result<(), ScriptError> {
        if script.sandbox || self.trust_all {
            return Ok(());
        }
        let digest = ScriptDigest::of_source(&script.script)?;
        let approved = self
            .approved
            .lock()
            .expect("failed to lock approved scripts for check")
            .contains(&digest);
        if approved {
            Ok(())
        } else {
            Err(ScriptError::Rejected {
                reason: format!("unsandboxed script {digest} has not been approved"),
            })
        }
    }
}
