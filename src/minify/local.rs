//! In-process minifier strategies.

use async_trait::async_trait;
use css_minify::optimizations::{Level, Minifier};
use minify_js::{Session, TopLevelMode};

use super::{MinifyJob, MinifyStrategy, StrategyError};

/// In-process ECMAScript minifier. The primary script path: no network, no
/// size ceiling. Inputs it cannot parse fall through to the next strategy.
pub(crate) struct LocalJs;

#[async_trait]
impl MinifyStrategy for LocalJs {
    fn name(&self) -> &'static str {
        "local_js"
    }

    async fn run(&self, job: &MinifyJob<'_>) -> Result<String, StrategyError> {
        let session = Session::new();
        let mut output = Vec::new();
        minify_js::minify(
            &session,
            TopLevelMode::Global,
            job.assembled.as_bytes(),
            &mut output,
        )
        .map_err(|err| StrategyError::Local(format!("{err:?}")))?;
        String::from_utf8(output).map_err(|err| StrategyError::Local(err.to_string()))
    }
}

/// In-process CSS minifier; the only style strategy.
pub(crate) struct LocalCss;

#[async_trait]
impl MinifyStrategy for LocalCss {
    fn name(&self) -> &'static str {
        "local_css"
    }

    async fn run(&self, job: &MinifyJob<'_>) -> Result<String, StrategyError> {
        let mut minifier = Minifier::default();
        minifier
            .minify(job.assembled, Level::Three)
            .map_err(|err| StrategyError::Local(format!("{err:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::AssetKind;

    fn job<'a>(kind: AssetKind, assembled: &'a str) -> MinifyJob<'a> {
        MinifyJob {
            kind,
            assembled,
            fragments: &[],
        }
    }

    #[tokio::test]
    async fn local_js_reduces_whitespace() {
        let source = "function  demo ( ) {\n    return  1 + 2 ;\n}\n";
        let output = LocalJs
            .run(&job(AssetKind::Script, source))
            .await
            .expect("valid script should minify");
        assert!(!output.trim().is_empty());
        assert!(output.len() <= source.len());
    }

    #[tokio::test]
    async fn local_css_reduces_whitespace() {
        let source = "body {\n    margin : 0 ;\n    padding : 0 ;\n}\n";
        let output = LocalCss
            .run(&job(AssetKind::Style, source))
            .await
            .expect("valid stylesheet should minify");
        assert!(!output.trim().is_empty());
        assert!(output.len() <= source.len());
    }
}
