//! The transformer pipeline: an abstract collaborator applied, in a fixed
//! order, to locations crossing the DAP↔CDP boundary (line-column, then
//! source map, then path). Modeled as a single trait so the three
//! concerns can be swapped or composed without the adapter knowing which
//! ones are active.

use async_trait::async_trait;

/// A 1-based DAP line/column pair, or a 0-based CDP one. The transformer
/// is responsible for knowing which direction it's converting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineColumn {
    pub line: i64,
    pub column: Option<i64>,
}

/// A location expressed against a script, as understood on one side of the
/// boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformLocation {
    pub script_id: String,
    pub path: String,
    pub position: LineColumn,
}

/// Called in order - line-column, then source-map, then path - on the way
/// into CDP (`to_cdp`) and in reverse on the way back to DAP (`to_dap`).
#[async_trait]
pub trait Transformers: Send + Sync {
    async fn to_cdp(&self, loc: TransformLocation) -> TransformLocation;
    async fn to_dap(&self, loc: TransformLocation) -> TransformLocation;

    /// Map a generated location back to its authored source location, for
    /// smart-step. `None` means "no source map covers this location";
    /// the caller should skip past it. The default (no
    /// source-map stage configured) always reports a mapping, i.e. never
    /// triggers a skip, since every generated location *is* authored when
    /// there's no transpilation step in play.
    async fn map_to_authored(&self, loc: &TransformLocation) -> Option<TransformLocation> {
        Some(loc.clone())
    }
}

/// Converts DAP's 1-based line/column to CDP's 0-based one, and back.
/// Always active, unlike source-map and path rewriting which are
/// conditional on the session's configuration.
#[derive(Debug, Default)]
pub struct LineColumnTransformer;

#[async_trait]
impl Transformers for LineColumnTransformer {
    async fn to_cdp(&self, mut loc: TransformLocation) -> TransformLocation {
        loc.position.line = (loc.position.line - 1).max(0);
        loc.position.column = loc.position.column.map(|c| (c - 1).max(0));
        loc
    }

    async fn to_dap(&self, mut loc: TransformLocation) -> TransformLocation {
        loc.position.line += 1;
        loc.position.column = loc.position.column.map(|c| c + 1);
        loc
    }
}

/// A pipeline of transformers applied in sequence. `to_cdp` runs them
/// forward; `to_dap` runs them in reverse so the last transform applied
/// outbound is the first one undone inbound.
pub struct Pipeline {
    stages: Vec<Box<dyn Transformers>>,
}

impl Pipeline {
    pub fn new(stages: Vec<Box<dyn Transformers>>) -> Self {
        Self { stages }
    }

    /// The default pipeline: line-column conversion only. Source-map and
    /// path rewriting are left as extension points. This bridge does not
    /// ship a source-map consumer; a deployment that needs them composes
    /// additional stages here.
    pub fn default_pipeline() -> Self {
        Self::new(vec![Box::new(LineColumnTransformer)])
    }
}

#[async_trait]
impl Transformers for Pipeline {
    async fn to_cdp(&self, mut loc: TransformLocation) -> TransformLocation {
        for stage in &self.stages {
            loc = stage.to_cdp(loc).await;
        }
        loc
    }

    async fn to_dap(&self, mut loc: TransformLocation) -> TransformLocation {
        for stage in self.stages.iter().rev() {
            loc = stage.to_dap(loc).await;
        }
        loc
    }

    /// Unmapped if any stage reports no authored mapping for the location
    /// it was handed.
    async fn map_to_authored(&self, loc: &TransformLocation) -> Option<TransformLocation> {
        let mut current = loc.clone();
        for stage in &self.stages {
            current = stage.map_to_authored(&current).await?;
        }
        Some(current)
    }
}

/// Used in tests and by deployments that want the boundary crossed
/// untouched.
#[derive(Debug, Default)]
pub struct NoopTransformers;

#[async_trait]
impl Transformers for NoopTransformers {
    async fn to_cdp(&self, loc: TransformLocation) -> TransformLocation {
        loc
    }

    async fn to_dap(&self, loc: TransformLocation) -> TransformLocation {
        loc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(line: i64, column: Option<i64>) -> TransformLocation {
        TransformLocation {
            script_id: "1".to_string(),
            path: "file:///a.js".to_string(),
            position: LineColumn { line, column },
        }
    }

    #[tokio::test]
    async fn line_column_transformer_converts_dap_one_based_to_cdp_zero_based() {
        let t = LineColumnTransformer;
        let out = t.to_cdp(loc(10, Some(5))).await;
        assert_eq!(out.position.line, 9);
        assert_eq!(out.position.column, Some(4));
    }

    #[tokio::test]
    async fn line_column_transformer_round_trips() {
        let t = LineColumnTransformer;
        let original = loc(10, Some(5));
        let round_tripped = t.to_dap(t.to_cdp(original.clone()).await).await;
        assert_eq!(round_tripped, original);
    }

    #[tokio::test]
    async fn line_column_transformer_never_goes_negative() {
        let t = LineColumnTransformer;
        let out = t.to_cdp(loc(1, Some(1))).await;
        assert_eq!(out.position.line, 0);
        assert_eq!(out.position.column, Some(0));
    }

    #[tokio::test]
    async fn default_pipeline_applies_line_column_conversion() {
        let p = Pipeline::default_pipeline();
        let out = p.to_cdp(loc(10, Some(5))).await;
        assert_eq!(out.position.line, 9);
    }

    #[tokio::test]
    async fn noop_transformers_pass_through_unchanged() {
        let t = NoopTransformers;
        let original = loc(10, Some(5));
        let out = t.to_cdp(original.clone()).await;
        assert_eq!(out, original);
    }
}
