//! `%{name}` expansion against a fixed symbolic context.
use std::sync::LazyLock;

use regex::{Captures, Regex};

// Any `%{...}` is a token; names outside the context are unknown, not ignored.
static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%\{([^}]*)\}").expect("token pattern is valid"));

/// What to do with a token whose name has no value in the context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnresolvedPolicy {
    /// Leave the token in place, verbatim.
    #[default]
    Keep,
    /// Fail the expansion.
    Reject,
}

/// The values a `%{name}` token may refer to.
///
/// Built once per resolution and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    pub home: Option<String>,
    pub user: Option<String>,
    pub root: String,
    pub package: String,
    pub path: Option<String>,
    pub hostname: String,
    pub tmpdir: String,
}

impl Context {
    /// Looks up a token name exactly as written.
    pub fn get(&self, name: &str) -> Option<&str> {
        match name {
            "home" => self.home.as_deref(),
            "user" => self.user.as_deref(),
            "root" => Some(&self.root),
            "package" => Some(&self.package),
            "path" => self.path.as_deref(),
            "hostname" => Some(&self.hostname),
            "tmpdir" => Some(&self.tmpdir),
            _ => None,
        }
    }
}

/// Expands tokens in configuration values.
#[derive(Debug, Clone)]
pub struct Interpolator {
    context: Context,
    policy: UnresolvedPolicy,
}

impl Interpolator {
    pub fn new(context: Context, policy: UnresolvedPolicy) -> Self {
        Self { context, policy }
    }

    /// Replaces every known token in one pass. Unknown tokens stay verbatim and
    /// substituted text is never scanned again.
    pub fn expand(&self, template: &str) -> String {
        TOKEN
            .replace_all(template, |caps: &Captures| match self.context.get(&caps[1]) {
                Some(value) => value.to_string(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Like [`Interpolator::expand`] but honours the configured policy.
    ///
    /// Returns the name of the first unknown token when the policy rejects it.
    pub fn try_expand(&self, template: &str) -> Result<String, String> {
        if self.policy == UnresolvedPolicy::Reject
            && let Some(unknown) = TOKEN
                .captures_iter(template)
                .find(|caps| self.context.get(&caps[1]).is_none())
        {
            return Err(unknown[1].to_string());
        }
        Ok(self.expand(template))
    }
}
