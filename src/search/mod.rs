//! Concurrent search orchestration and result reduction
//!
//! Executes a batch of [`PackageSearchSpec`] values against their chosen
//! backends, one task per spec. Collection is index ordered: results come
//! back in input order no matter which task finishes first, and the first
//! task failure fails the whole batch (remaining tasks are dropped; a
//! failed batch never surfaces partial results).
//!
//! `bin/<program>` and `~<search>` queries resolve to candidate attribute
//! names first and then fan out again, one nested version search per
//! candidate, order preserving at both levels.

use std::sync::Arc;

use futures::future::{join_all, try_join_all};
use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::backends::history::HistoryClient;
use crate::backends::lazamar::LazamarClient;
use crate::backends::nix::NixTool;
use crate::backends::nixhub::NixHubClient;
use crate::backends::nixsearch::NixSearchClient;
use crate::backends::{
    BackendError, ChannelBackend, InstallableResolver, ProgramIndex, VersionBackend,
};
use crate::spec::installable::parse_installable;
use crate::spec::{PackageSearchSpec, SpecError, VersionsBackend};
use crate::version::{self, ConstraintError, Version};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error(transparent)]
    Constraint(#[from] ConstraintError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("could not serialize output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no versions found for `{spec}`")]
    NoVersionsFound { spec: String },

    #[error(
        "expected at most one version per package, but got {counts:?} - try using @latest or a more specific version constraint"
    )]
    DuplicatePackageNames { counts: IndexMap<String, usize> },
}

/// Options applied uniformly to every spec in a batch.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Keep only records whose attribute equals the query.
    pub exact: bool,
    /// Constraint for specs that carry none of their own.
    pub default_constraint: Option<String>,
    /// Window into the constrained list; positive keeps the highest
    /// versions, negative the earliest, zero everything.
    pub limit: i64,
    /// Keep lists in the order the backend reported instead of sorting.
    /// Selection still picks the highest constrained version.
    pub sort: bool,
    /// Result cap for program and free-text lookups.
    pub find_limit: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            exact: false,
            default_constraint: None,
            limit: 0,
            sort: true,
            find_limit: crate::config::DEFAULT_FIND_LIMIT,
        }
    }
}

/// The outcome of executing one spec against one package.
///
/// Both lists are sorted ascending by version; `constrained` is a subset of
/// `versions` and `selected` is its highest entry when any survived.
#[derive(Debug, Clone)]
pub struct PackageSearchResult {
    pub spec: PackageSearchSpec,
    pub versions: Vec<Version>,
    pub constrained: Vec<Version>,
    pub selected: Option<Version>,
}

impl PackageSearchResult {
    /// Resolved package name, once a version is selected.
    pub fn name(&self) -> Option<&str> {
        self.selected.as_ref().map(|v| v.name.as_str())
    }

    /// Installable reference for the selected version, with the spec's
    /// output selectors appended.
    pub fn installable(&self) -> Option<String> {
        let selected = self.selected.as_ref()?;
        let mut installable = selected.installable();
        if let Some(outputs) = &self.spec.output_selectors {
            installable.push('^');
            installable.push_str(&outputs.join(","));
        }
        Some(installable)
    }
}

/// Dispatches specs to backend adapters and reduces raw version lists.
pub struct Searcher {
    nixhub: Arc<dyn VersionBackend>,
    history: Arc<dyn VersionBackend>,
    lazamar: Arc<dyn ChannelBackend>,
    programs: Arc<dyn ProgramIndex>,
    nix: Arc<dyn InstallableResolver>,
    options: SearchOptions,
}

impl Default for Searcher {
    fn default() -> Self {
        Self::new(SearchOptions::default())
    }
}

impl Searcher {
    pub fn new(options: SearchOptions) -> Self {
        Self {
            nixhub: Arc::new(NixHubClient::default()),
            history: Arc::new(HistoryClient::default()),
            lazamar: Arc::new(LazamarClient::default()),
            programs: Arc::new(NixSearchClient::default()),
            nix: Arc::new(NixTool::default()),
            options,
        }
    }

    pub fn with_nixhub(mut self, backend: Arc<dyn VersionBackend>) -> Self {
        self.nixhub = backend;
        self
    }

    pub fn with_history(mut self, backend: Arc<dyn VersionBackend>) -> Self {
        self.history = backend;
        self
    }

    pub fn with_lazamar(mut self, backend: Arc<dyn ChannelBackend>) -> Self {
        self.lazamar = backend;
        self
    }

    pub fn with_programs(mut self, index: Arc<dyn ProgramIndex>) -> Self {
        self.programs = index;
        self
    }

    pub fn with_nix(mut self, resolver: Arc<dyn InstallableResolver>) -> Self {
        self.nix = resolver;
        self
    }

    /// Execute every spec concurrently.
    ///
    /// Results preserve input order. Any task failing fails the batch with
    /// that task's error.
    pub async fn search_specs(
        &self,
        specs: Vec<PackageSearchSpec>,
    ) -> Result<Vec<PackageSearchResult>, SearchError> {
        let results = try_join_all(specs.into_iter().map(|spec| self.search_spec(spec))).await?;
        Ok(results.into_iter().flatten().collect())
    }

    /// Execute one spec. Program and free-text queries may produce one
    /// result per matched package.
    pub async fn search_spec(
        &self,
        spec: PackageSearchSpec,
    ) -> Result<Vec<PackageSearchResult>, SearchError> {
        if let Some(program) = spec.query.strip_prefix("bin/") {
            let exact = !program.contains('*');
            let attrs = self
                .programs
                .find_packages_providing_program(program, exact, self.options.find_limit)
                .await?;
            debug!("program `{}` provided by {:?}", program, attrs);
            return self.search_candidates(spec, attrs).await;
        }

        if let Some(search) = spec.query.strip_prefix('~') {
            let attrs = self
                .programs
                .find_packages_matching_query(search, self.options.find_limit)
                .await?;
            debug!("query `{}` matched {:?}", search, attrs);
            return self.search_candidates(spec, attrs).await;
        }

        let versions = self.fetch_versions(&spec).await?;
        Ok(vec![self.reduce(spec, versions)?])
    }

    /// Nested fan-out for multi-candidate queries: one version search per
    /// candidate attribute, concurrently, input ordered. A candidate whose
    /// fetch fails is dropped rather than aborting its siblings, unless
    /// every candidate fails.
    async fn search_candidates(
        &self,
        spec: PackageSearchSpec,
        attrs: Vec<String>,
    ) -> Result<Vec<PackageSearchResult>, SearchError> {
        let candidates: Vec<PackageSearchSpec> = attrs
            .into_iter()
            .map(|attr| PackageSearchSpec {
                spec: spec.spec.clone(),
                query: attr,
                version_constraint: spec.version_constraint.clone(),
                output_selectors: spec.output_selectors.clone(),
                backend: spec.backend.clone(),
            })
            .collect();

        let outcomes = join_all(candidates.into_iter().map(|candidate| async move {
            match self.fetch_versions(&candidate).await {
                Ok(versions) => self.reduce(candidate, versions).map(Ok),
                Err(SearchError::Backend(err)) => Ok(Err(err)),
                Err(fatal) => Err(fatal),
            }
        }))
        .await;

        let mut results = Vec::new();
        let mut first_error: Option<BackendError> = None;
        for outcome in outcomes {
            match outcome? {
                Ok(result) => results.push(result),
                Err(err) => {
                    warn!("dropping candidate for `{}`: {}", spec.spec, err);
                    first_error.get_or_insert(err);
                }
            }
        }

        if results.is_empty()
            && let Some(err) = first_error
        {
            return Err(err.into());
        }
        Ok(results)
    }

    async fn fetch_versions(
        &self,
        spec: &PackageSearchSpec,
    ) -> Result<Vec<Version>, SearchError> {
        let versions = match &spec.backend {
            VersionsBackend::CurrentSystem => {
                let installable = format!("nixpkgs#{}", spec.query);
                let resolved = self.nix.resolve(&installable).await?;
                vec![Version {
                    name: resolved.name,
                    version: resolved.version,
                    attribute: spec.query.clone(),
                    flake: "nixpkgs".to_string(),
                    revision: String::new(),
                }]
            }
            VersionsBackend::FlakeInstallable { reference } => {
                let mut record = parse_installable(reference);
                if record.version.is_empty() {
                    let resolved = self.nix.resolve(reference).await?;
                    record.name = resolved.name;
                    record.version = resolved.version;
                }
                vec![record]
            }
            VersionsBackend::NixHub => self.nixhub.search(&spec.query).await?,
            VersionsBackend::History => self.history.search(&spec.query).await?,
            VersionsBackend::Lazamar { channel } => {
                self.lazamar.search(&spec.query, channel).await?
            }
        };
        Ok(versions)
    }

    /// Constrain, sort and select. `constrained` keeps the relative order
    /// of the full list; selection picks its highest version.
    fn reduce(
        &self,
        spec: PackageSearchSpec,
        mut versions: Vec<Version>,
    ) -> Result<PackageSearchResult, SearchError> {
        if self.options.exact {
            versions = version::filter_exact(versions, &spec.query);
        }
        if self.options.sort {
            version::sort_by_version(&mut versions);
        }

        let constraint = spec
            .version_constraint
            .as_deref()
            .or(self.options.default_constraint.as_deref())
            .unwrap_or("");
        let constrained = version::constrain(versions.clone(), constraint)?;
        let constrained = version::limit(constrained, self.options.limit);
        let selected = constrained
            .iter()
            .max_by(|a, b| version::compare_by_version(a, b))
            .cloned();

        Ok(PackageSearchResult {
            spec,
            versions,
            constrained,
            selected,
        })
    }
}

/// Fail on the first result that selected no version.
///
/// Hard precondition for installable and flake output, not for plain
/// listings.
pub fn ensure_one_selected(results: &[PackageSearchResult]) -> Result<(), SearchError> {
    for result in results {
        if result.selected.is_none() {
            return Err(SearchError::NoVersionsFound {
                spec: result.spec.spec.clone(),
            });
        }
    }
    Ok(())
}

/// Fail when two results resolve to the same package name.
///
/// Guards against generating a flake with two conflicting inputs under one
/// name; the error carries the full name counts so the user can tighten
/// their constraints.
pub fn ensure_unique_package_names(results: &[PackageSearchResult]) -> Result<(), SearchError> {
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for result in results {
        if let Some(name) = result.name() {
            *counts.entry(name.to_string()).or_default() += 1;
        }
    }
    if counts.values().any(|&count| count > 1) {
        return Err(SearchError::DuplicatePackageNames { counts });
    }
    Ok(())
}
