//! Scripting Manager
//!
//! Named scripts stored in a dedicated key namespace and executed as
//! ordinary commands entering the invocation pipeline: the pipeline applies
//! standard origin and flag handling to script-originated operations, with
//! no special-casing.
//!
//! Scripts are line-oriented: one operation per line (`put <key> <value>`,
//! `get <key>`, `remove <key>`, `clear`), `#` comments, and `${name}`
//! parameter substitution from the [`TaskContext`]. Running a script yields
//! an asynchronous result carrying the last operation's outcome.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::command::{CacheKey, Command, CommandOutcome};
use crate::context::{InvocationContext, NodeId};
use crate::error::{Error, Result};
use crate::pipeline::InterceptorChain;

/// Reserved key namespace holding script sources
pub const SCRIPT_CACHE: &str = "___script_cache";

/// Execution context for one script run
#[derive(Debug, Clone, Default)]
pub struct TaskContext {
    remote_origin: Option<NodeId>,
    parameters: HashMap<String, String>,
}

impl TaskContext {
    /// Context for a locally-originated run with no parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the script as if delivered from the given cluster member
    #[must_use]
    pub fn from_remote(mut self, node: NodeId) -> Self {
        self.remote_origin = Some(node);
        self
    }

    /// Bind one `${name}` substitution parameter
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    fn invocation_context(&self) -> InvocationContext {
        match self.remote_origin {
            Some(node) => InvocationContext::remote(node),
            None => InvocationContext::local(),
        }
    }
}

/// Stores and runs named scripts through the invocation pipeline
pub struct ScriptingManager {
    chain: Arc<InterceptorChain>,
}

impl ScriptingManager {
    /// Execute script operations through the given pipeline
    pub fn new(chain: Arc<InterceptorChain>) -> Self {
        Self { chain }
    }

    /// Add (or replace) a named script.
    ///
    /// The name must carry an extension identifying its dialect.
    pub async fn add_script(&self, name: &str, source: impl Into<String>) -> Result<()> {
        validate_script_name(name)?;
        let source = source.into();
        let mut ctx = InvocationContext::local();
        self.chain
            .invoke(
                &mut ctx,
                &Command::put(script_key(name), Bytes::from(source)),
            )
            .await?;
        debug!(script = name, "script stored");
        Ok(())
    }

    /// Remove a named script
    pub async fn remove_script(&self, name: &str) -> Result<()> {
        validate_script_name(name)?;
        let mut ctx = InvocationContext::local();
        self.chain
            .invoke(&mut ctx, &Command::remove(script_key(name)))
            .await?;
        Ok(())
    }

    /// Retrieve the source of an existing script
    pub async fn get_script(&self, name: &str) -> Result<String> {
        validate_script_name(name)?;
        let mut ctx = InvocationContext::local();
        let outcome = self
            .chain
            .invoke(&mut ctx, &Command::get(script_key(name)))
            .await?;
        let source = outcome
            .value()
            .ok_or_else(|| Error::Script(format!("no script named '{}'", name)))?;
        String::from_utf8(source.to_vec())
            .map_err(|_| Error::Script(format!("script '{}' is not valid UTF-8", name)))
    }

    /// Run a named script, returning an asynchronous result.
    ///
    /// The handle resolves to the outcome of the script's last operation
    /// (`Done` for an empty script).
    pub fn run_script(
        &self,
        name: impl Into<String>,
        task: TaskContext,
    ) -> JoinHandle<Result<CommandOutcome>> {
        let chain = Arc::clone(&self.chain);
        let name = name.into();
        tokio::spawn(async move {
            validate_script_name(&name)?;
            let mut lookup_ctx = InvocationContext::local();
            let outcome = chain
                .invoke(&mut lookup_ctx, &Command::get(script_key(&name)))
                .await?;
            let source = outcome
                .value()
                .ok_or_else(|| Error::Script(format!("no script named '{}'", name)))?;
            let source = String::from_utf8(source.to_vec())
                .map_err(|_| Error::Script(format!("script '{}' is not valid UTF-8", name)))?;

            debug!(script = %name, "running script");
            let mut last = CommandOutcome::Done;
            for (line_no, line) in source.lines().enumerate() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                let command = parse_statement(line, &task).map_err(|err| {
                    Error::Script(format!("{} line {}: {}", name, line_no + 1, err))
                })?;
                let mut ctx = task.invocation_context();
                last = chain.invoke(&mut ctx, &command).await?;
            }
            Ok(last)
        })
    }
}

fn script_key(name: &str) -> CacheKey {
    CacheKey::from(format!("{}/{}", SCRIPT_CACHE, name))
}

fn validate_script_name(name: &str) -> Result<()> {
    let has_extension = name
        .rsplit_once('.')
        .is_some_and(|(stem, ext)| !stem.is_empty() && !ext.is_empty());
    if !has_extension {
        return Err(Error::Script(format!(
            "script name '{}' must include an extension",
            name
        )));
    }
    Ok(())
}

/// Parse one script statement into a command, substituting `${name}` tokens
fn parse_statement(line: &str, task: &TaskContext) -> std::result::Result<Command, String> {
    let tokens: Vec<String> = line
        .split_whitespace()
        .map(|token| substitute(token, task))
        .collect::<std::result::Result<_, String>>()?;

    match tokens.as_slice() {
        [op, key] if op == "get" => Ok(Command::get(key.clone())),
        [op, key] if op == "remove" => Ok(Command::remove(key.clone())),
        [op, key, value] if op == "put" => Ok(Command::put(key.clone(), value.clone())),
        [op] if op == "clear" => Ok(Command::clear()),
        _ => Err(format!("unknown or malformed statement '{}'", line)),
    }
}

fn substitute(token: &str, task: &TaskContext) -> std::result::Result<String, String> {
    let mut out = token.to_string();
    for (name, value) in &task.parameters {
        out = out.replace(&format!("${{{}}}", name), value);
    }
    if out.contains("${") {
        return Err(format!("unresolved parameter in '{}'", token));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::container::InMemoryDataContainer;

    fn manager() -> ScriptingManager {
        let chain = InterceptorChain::builder().build(Arc::new(InMemoryDataContainer::new()));
        chain.set_accepting(true);
        ScriptingManager::new(Arc::new(chain))
    }

    #[tokio::test]
    async fn test_add_get_remove_script() {
        let manager = manager();
        manager
            .add_script("warmup.mcs", "put k v\n")
            .await
            .unwrap();
        assert_eq!(manager.get_script("warmup.mcs").await.unwrap(), "put k v\n");

        manager.remove_script("warmup.mcs").await.unwrap();
        assert_matches!(
            manager.get_script("warmup.mcs").await,
            Err(Error::Script(_))
        );
    }

    #[tokio::test]
    async fn test_script_name_requires_extension() {
        let manager = manager();
        assert_matches!(
            manager.add_script("warmup", "put k v").await,
            Err(Error::Script(_))
        );
    }

    #[tokio::test]
    async fn test_run_script_with_parameters() {
        let manager = manager();
        manager
            .add_script(
                "seed.mcs",
                "# seed a couple of entries\nput user:${id} ${name}\nget user:${id}\n",
            )
            .await
            .unwrap();

        let task = TaskContext::new()
            .with_parameter("id", "7")
            .with_parameter("name", "kim");
        let outcome = manager
            .run_script("seed.mcs", task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome.value().unwrap().as_ref(), b"kim");
    }

    #[tokio::test]
    async fn test_run_missing_script_fails() {
        let manager = manager();
        let result = manager
            .run_script("absent.mcs", TaskContext::new())
            .await
            .unwrap();
        assert_matches!(result, Err(Error::Script(_)));
    }

    #[tokio::test]
    async fn test_unresolved_parameter_fails() {
        let manager = manager();
        manager
            .add_script("bad.mcs", "put k ${missing}\n")
            .await
            .unwrap();
        let result = manager
            .run_script("bad.mcs", TaskContext::new())
            .await
            .unwrap();
        assert_matches!(result, Err(Error::Script(_)));
    }

    #[tokio::test]
    async fn test_empty_script_yields_done() {
        let manager = manager();
        manager.add_script("noop.mcs", "# nothing\n").await.unwrap();
        let outcome = manager
            .run_script("noop.mcs", TaskContext::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome, CommandOutcome::Done);
    }
}
