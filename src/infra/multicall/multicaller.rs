use std::mem;

use serde_json::Value;

use super::{multicall, Abi, BatchOptions, Call, Decoded, Path, ReadProvider};
use crate::error::Result;

/// Collects calls for one result object and resolves them in a single batch.
///
/// `calls` and `paths` are always the same length. An instance is meant for one
/// accumulation sequence at a time; it is not shared between concurrent tasks.
pub struct Multicaller<'a, P: ?Sized> {
    network: String,
    provider: &'a P,
    abi: &'a Abi,
    options: BatchOptions,
    calls: Vec<Call>,
    paths: Vec<Path>,
}

impl<'a, P> Multicaller<'a, P>
where
    P: ReadProvider + ?Sized,
{
    pub fn new(network: impl Into<String>, provider: &'a P, abi: &'a Abi, options: BatchOptions) -> Self {
        Self {
            network: network.into(),
            provider,
            abi,
            options,
            calls: Vec::new(),
            paths: Vec::new(),
        }
    }

    /// Buffers a call whose result lands at `path`. No I/O happens here.
    pub fn call(
        &mut self,
        path: impl Into<Path>,
        address: impl Into<String>,
        function: impl Into<String>,
        args: Vec<Value>,
    ) -> &mut Self {
        self.calls.push(Call::new(address, function, args));
        self.paths.push(path.into());
        self
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Drops every buffered call without running it.
    pub fn reset(&mut self) {
        self.calls.clear();
        self.paths.clear();
    }

    /// Runs the buffered calls and writes each result into `seed` (or a fresh
    /// map) at its path. See [`Multicaller::execute_into`].
    pub async fn execute(&mut self, seed: Option<Decoded>) -> Result<Decoded> {
        let mut root = seed.unwrap_or_else(Decoded::map);
        self.execute_into(&mut root).await?;
        Ok(root)
    }

    /// Runs the buffered calls and writes each result into `root` at its path.
    ///
    /// Single-output results are stored as the bare value, multi-output ones
    /// as a list. The buffers are empty afterwards whether or not the batch
    /// succeeded. `root` is left untouched when it fails.
    pub async fn execute_into(&mut self, root: &mut Decoded) -> Result<()> {
        let calls = mem::take(&mut self.calls);
        let paths = mem::take(&mut self.paths);

        let results = multicall(
            &self.network,
            self.provider,
            self.abi,
            &calls,
            self.options.clone(),
        )
        .await?;

        for (path, mut outputs) in paths.iter().zip(results) {
            let value = if outputs.len() == 1 {
                outputs.remove(0)
            } else {
                Decoded::List(outputs)
            };
            root.set_path(path, value);
        }
        Ok(())
    }
}
