use crate::{
    foundation::error::{AtrousError, AtrousResult},
    plan::scales::PlannerOpts,
};

/// Engine configuration.
///
/// Partial JSON documents are accepted; missing fields take their defaults.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineOpts {
    /// Scale planner policy.
    pub planner: PlannerOpts,
    /// Worker threads for the host kernels. `None` uses rayon's default.
    pub threads: Option<usize>,
    /// Log every planned scale at debug level.
    pub diagnostics: bool,
}

impl EngineOpts {
    /// Reject unusable values.
    pub fn validate(&self) -> AtrousResult<()> {
        self.planner.validate()?;
        if let Some(n) = self.threads
            && n == 0
        {
            return Err(AtrousError::validation(
                "engine 'threads' must be >= 1 when set",
            ));
        }
        Ok(())
    }

    /// Parse and validate options from JSON.
    pub fn from_json_str(s: &str) -> AtrousResult<Self> {
        let opts: Self = serde_json::from_str(s)?;
        opts.validate()?;
        Ok(opts)
    }
}

pub(crate) fn build_thread_pool(threads: Option<usize>) -> AtrousResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(AtrousError::validation(
            "engine 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("atrous-{i}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder.build().map_err(|e| {
        AtrousError::Other(anyhow::Error::new(e).context("failed to build rayon thread pool"))
    })
}

#[cfg(test)]
#[path = "../../tests/unit/engine/opts.rs"]
mod tests;
