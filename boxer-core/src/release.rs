//! Packaging orchestration - one full release cycle
//!
//! The cycle is a linear state machine with no back-edges:
//!
//! 1. **Configured**: effective config and ledger loaded, working version and
//!    download URL derived.
//! 2. **Versioned**: on a requested bump, the version advances and the URL is
//!    re-derived. The URL is never cached on the context; it is always
//!    computed from the current version, so it cannot go stale.
//! 3. **Packaged**: the external tool is invoked exactly once (or skipped
//!    entirely in keep-existing mode when the artifact is already present).
//! 4. **Finalized**: the artifact is copied to its version-qualified name,
//!    checksummed, recorded in the ledger, and the ledger is persisted.
//!
//! Side effects are strictly ordered: the ledger is not mutated before a
//! successful checksum, and nothing is persisted before the in-memory
//! mutation. The persisted file therefore never references a checksum that
//! does not correspond to an artifact on disk. Nothing is retried; any error
//! aborts the run before a partial metadata write.

use crate::checksum;
use crate::config::{self, CliOverrides, EffectiveConfig};
use crate::error::BoxerError;
use crate::ledger::{Ledger, ProviderRecord};
use crate::packager::Packager;
use crate::template;
use crate::version;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// The single virtualization provider a run releases for
pub const PROVIDER: &str = "virtualbox";

/// Everything a run needs, assembled by the CLI
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Optional config file; absent-from-disk degrades to defaults
    pub config_path: Option<PathBuf>,

    /// The persisted release metadata (ledger) file
    pub metadata_path: PathBuf,

    /// Artifact file the packaging tool writes; defaults to `{name}.box`
    pub output: Option<PathBuf>,

    /// Advance the version before packaging
    pub bump: bool,

    /// Skip packaging when the expected artifact already exists
    pub keep_existing: bool,

    /// Explicit flag overrides for config resolution
    pub overrides: CliOverrides,
}

/// Immutable per-run state threaded through the stages
///
/// Each stage consumes a context and returns an updated one; nothing is
/// mutated in place across stage boundaries.
#[derive(Debug, Clone)]
struct RunContext {
    config: EffectiveConfig,
    ledger: Ledger,
    version: String,
}

impl RunContext {
    /// The download URL, derived on demand from the current version
    fn url(&self) -> String {
        template::resolve(
            &self.config.url_template,
            &self.config.vm_name,
            &self.version,
            PROVIDER,
        )
    }
}

/// Outcome of a successful release cycle
#[derive(Debug, Clone)]
pub struct ReleaseReport {
    /// Identifier of the box family this release belongs to
    pub boxer_id: String,
    pub version: String,
    pub url: String,
    pub checksum: String,
    /// Version-qualified copy of the artifact on disk
    pub artifact: PathBuf,
    /// True when keep-existing mode reused a present artifact
    pub packaging_skipped: bool,
}

/// Run one complete release cycle
pub async fn run_release(
    opts: &RunOptions,
    packager: &dyn Packager,
) -> Result<ReleaseReport, BoxerError> {
    let ctx = configure(opts)?;
    let ctx = advance(ctx, opts.bump)?;

    let output = opts
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{}.box", ctx.config.vm_name)));

    let packaging_skipped = package(&ctx, opts, &output, packager).await?;
    finalize(ctx, opts, &output, packaging_skipped)
}

/// Stage 1: load configuration and ledger, derive the working version
fn configure(opts: &RunOptions) -> Result<RunContext, BoxerError> {
    let config = config::resolve_config(opts.config_path.as_deref(), &opts.overrides)?;
    let ledger = Ledger::load(&opts.metadata_path)?;
    let version = version::current_version(&ledger, config.major_version);

    debug!("Working version {} for box {}", version, config.vm_name);
    Ok(RunContext {
        config,
        ledger,
        version,
    })
}

/// Stage 2: advance the version when a bump was requested
fn advance(ctx: RunContext, bump: bool) -> Result<RunContext, BoxerError> {
    if !bump {
        return Ok(ctx);
    }

    let next = version::next_version(&ctx.version)?;
    info!("Bumping version {} -> {}", ctx.version, next);
    Ok(RunContext {
        version: next,
        ..ctx
    })
}

/// Stage 3: produce the artifact via the external tool
///
/// Returns true when keep-existing mode skipped the invocation.
async fn package(
    ctx: &RunContext,
    opts: &RunOptions,
    output: &Path,
    packager: &dyn Packager,
) -> Result<bool, BoxerError> {
    if opts.keep_existing && output.exists() {
        info!(
            "Keeping existing package {}; packaging tool not invoked",
            output.display()
        );
        return Ok(true);
    }

    if output.exists() {
        debug!("Removing stale artifact {}", output.display());
        std::fs::remove_file(output).map_err(|e| BoxerError::PackagingFailed {
            reason: format!("could not remove stale artifact {}: {e}", output.display()),
        })?;
    }

    let exit_code = packager
        .package(&ctx.config.vm_name, output)
        .await
        .map_err(|e| BoxerError::PackagingFailed {
            reason: format!("{e:#}"),
        })?;

    if exit_code != 0 {
        return Err(BoxerError::PackagingFailed {
            reason: format!("packaging tool exited with status {exit_code}"),
        });
    }

    // The tool sometimes exits 0 without writing anything
    if !output.exists() {
        return Err(BoxerError::PackagingFailed {
            reason: format!(
                "packaging tool exited 0 but {} was not produced",
                output.display()
            ),
        });
    }

    Ok(false)
}

/// Stage 4: checksum the artifact, record the release, persist the ledger
fn finalize(
    mut ctx: RunContext,
    opts: &RunOptions,
    output: &Path,
    packaging_skipped: bool,
) -> Result<ReleaseReport, BoxerError> {
    let url = ctx.url();
    let destination = destination_for(&url, output);

    if destination != output {
        std::fs::copy(output, &destination).map_err(|e| BoxerError::ChecksumFailed {
            path: destination.clone(),
            source: e,
        })?;
    }

    let digest = checksum::sha1_file(&destination).map_err(|e| BoxerError::ChecksumFailed {
        path: destination.clone(),
        source: std::io::Error::other(format!("{e:#}")),
    })?;

    let record = ProviderRecord {
        name: PROVIDER.to_string(),
        url: url.clone(),
        checksum_type: checksum::CHECKSUM_TYPE.to_string(),
        checksum: digest.clone(),
    };
    ctx.ledger.add_provider_record(&ctx.version, record);
    ctx.ledger.set_active_version(&ctx.version);
    ctx.ledger.save(&opts.metadata_path)?;

    info!(
        "Released {} {} ({}: {})",
        ctx.config.boxer_id,
        ctx.version,
        checksum::CHECKSUM_TYPE,
        digest
    );

    Ok(ReleaseReport {
        boxer_id: ctx.config.boxer_id,
        version: ctx.version,
        url,
        checksum: digest,
        artifact: destination,
        packaging_skipped,
    })
}

/// Version-qualified destination: the resolved URL's final path segment,
/// placed next to the packager's output file
fn destination_for(url: &str, output: &Path) -> PathBuf {
    let file_name = url.rsplit('/').next().filter(|s| !s.is_empty()).unwrap_or(url);
    output.with_file_name(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_destination_from_url_segment() {
        let dest = destination_for(
            "http://x/dir/web-1.0-virtualbox.box",
            Path::new("/tmp/out/web.box"),
        );
        assert_eq!(dest, Path::new("/tmp/out/web-1.0-virtualbox.box"));
    }

    #[test]
    fn test_destination_from_bare_template() {
        let dest = destination_for("web-1.0-virtualbox.box", Path::new("web.box"));
        assert_eq!(dest, Path::new("web-1.0-virtualbox.box"));
    }

    #[test]
    fn test_url_derived_from_context_version() {
        let ctx = RunContext {
            config: EffectiveConfig {
                vm_name: "web".to_string(),
                major_version: 1,
                url_template: "http://x/{name}-{version}-{provider}.box".to_string(),
                boxer_id: "web".to_string(),
            },
            ledger: Ledger::default(),
            version: "1.0".to_string(),
        };
        assert_eq!(ctx.url(), "http://x/web-1.0-virtualbox.box");

        let bumped = advance(ctx, true).unwrap();
        assert_eq!(bumped.url(), "http://x/web-1.1-virtualbox.box");
    }
}
