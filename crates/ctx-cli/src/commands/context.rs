//! Cluster context command implementation.
//!
//! Resolves flags over configuration, validates the output format before
//! any backend exists, assembles the snapshot and renders it.

use std::io::Write;

use ctx_audit::EventClassifier;
use ctx_context::{AssemblyPolicy, Collaborators, ContextAssembler, ContextRequest};
use tracing::debug;

use crate::backends;
use crate::cli::ContextArgs;
use crate::config::Config;
use crate::error::CliError;
use crate::output::{DetailOptions, OutputEncoding, OutputFormat};

/// Context command executor.
#[derive(Debug, Clone)]
pub struct ContextCommand {
    config: Config,
}

impl ContextCommand {
    /// Create a new context command.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Resolves the assembly request and output format for `args`.
    ///
    /// # Errors
    ///
    /// Returns an invalid-configuration error for an unknown output format,
    /// a zero window, or a zero page limit when the audit trail is enabled.
    pub fn plan(&self, args: &ContextArgs) -> Result<(ContextRequest, OutputFormat), CliError> {
        let defaults = &self.config.context;
        let encoding: OutputEncoding = args
            .output
            .as_deref()
            .unwrap_or(&defaults.output)
            .parse()?;

        let days = args.days.unwrap_or(defaults.days);
        if days == 0 {
            return Err(CliError::invalid("days must be greater than 0"));
        }
        let full = args.full || defaults.full;
        let pages = args.pages.unwrap_or(defaults.pages);
        if full && pages == 0 {
            return Err(CliError::invalid("pages must be greater than 0"));
        }

        let mut request = ContextRequest::new(args.cluster.clone())
            .lookback_days(days)
            .alert_service_ids(args.service_ids.clone())
            .policy(if args.strict {
                AssemblyPolicy::Strict
            } else {
                AssemblyPolicy::BestEffort
            });
        if full {
            request = request.audit_trail(pages);
        }
        request.organization_id.clone_from(&args.org_id);
        request.all_messages = args.all_messages;
        request.internal_only = args.internal_only;

        let format = OutputFormat::new(encoding).with_options(DetailOptions {
            verbose: args.verbose,
            audit_trail: full,
        });
        Ok((request, format))
    }

    /// Execute the context command against the configured backends.
    ///
    /// # Errors
    ///
    /// Returns an error if validation, assembly or output fails.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        args: &ContextArgs,
    ) -> Result<(), CliError> {
        self.execute_with(writer, args, backends::collaborators).await
    }

    /// Like [`execute`](Self::execute) with a custom collaborator factory.
    ///
    /// The factory only runs after the request and output format validated.
    ///
    /// # Errors
    ///
    /// Returns an error if validation, the factory, assembly or output fails.
    pub async fn execute_with<W, F>(
        &self,
        writer: &mut W,
        args: &ContextArgs,
        build: F,
    ) -> Result<(), CliError>
    where
        W: Write,
        F: FnOnce(&Config, &ContextArgs) -> Result<Collaborators, CliError>,
    {
        let (request, format) = self.plan(args)?;
        debug!(
            cluster = %request.cluster_key,
            output = %format.encoding(),
            days = request.lookback_days,
            audit_trail = request.include_audit_trail,
            "running context command"
        );

        let classifier = EventClassifier::default()
            .with_extra_fragments(self.config.audit.extra_noise.iter().cloned());
        let assembler = ContextAssembler::new(build(&self.config, args)?)
            .with_link_builder(self.config.link_builder())
            .with_classifier(classifier);

        let snapshot = assembler.assemble(&request).await?;
        format.write(writer, &snapshot)?;
        Ok(())
    }
}
