//! Peer constraint resolution
//!
//! Peer ranges are only known once the declaring package's version is chosen,
//! and choosing that version may depend on peers of peers. The resolver
//! therefore iterates:
//!
//! 1. every package starts at the candidate the selector picks on its own
//! 2. peer ranges are read from every chosen version (fetched concurrently)
//! 3. packages with incoming ranges are re-selected under those ranges, never
//!    above their previous candidate
//! 4. steps 2-3 repeat on a fresh snapshot until nothing moves or the
//!    iteration budget runs out

use super::VersionSelector;
use crate::domain::{
    IssueKind, PackageIssue, PeerConstraint, Specifier, UpgradePolicy, VersionRange, VersionSet,
};
use crate::error::{RegistryError, ResolveError};
use crate::registry::{FetchOptions, RegistryClient};
use indexmap::IndexMap;
use semver::Version;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Default number of fixpoint iterations before giving up
pub const DEFAULT_PEER_ITERATIONS: usize = 32;

/// Default number of concurrent peer lookups
const DEFAULT_PEER_CONCURRENCY: usize = 8;

/// Resolution state of one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerState {
    /// No version could be chosen
    Unresolved,
    /// Chosen without any peer range applied
    Candidate(Version),
    /// Chosen under peer ranges, or promoted at the fixpoint
    Fixed(Version),
}

impl PeerState {
    /// The chosen version, if any
    pub fn version(&self) -> Option<&Version> {
        match self {
            PeerState::Unresolved => None,
            PeerState::Candidate(v) | PeerState::Fixed(v) => Some(v),
        }
    }

    fn fixed(self) -> Self {
        match self {
            PeerState::Candidate(v) => PeerState::Fixed(v),
            other => other,
        }
    }
}

/// One package taking part in peer resolution
#[derive(Debug, Clone)]
pub struct PeerPackage {
    /// Name used for registry queries (differs from the key for npm aliases)
    pub query_name: String,
    pub specifier: Specifier,
    pub policy: UpgradePolicy,
    pub versions: VersionSet,
}

/// Result of a peer resolution run
#[derive(Debug, Clone, Default)]
pub struct PeerOutcome {
    /// Final state per package, in input order
    pub states: IndexMap<String, PeerState>,
    /// Non-fatal problems met while resolving
    pub warnings: Vec<PackageIssue>,
    /// Packages whose peer information is incomplete or whose conflict was tolerated
    pub incomplete: Vec<String>,
    /// Number of iterations run
    pub iterations: usize,
}

impl PeerOutcome {
    fn warn(&mut self, issue: PackageIssue) {
        if !self.warnings.contains(&issue) {
            warn!(package = %issue.package, "{}", issue.message);
            self.warnings.push(issue);
        }
    }

    fn mark_incomplete(&mut self, package: &str) {
        if !self.incomplete.iter().any(|p| p == package) {
            self.incomplete.push(package.to_string());
        }
    }
}

/// Fixpoint resolver over peer ranges
pub struct PeerResolver<'a> {
    selector: &'a VersionSelector,
    client: Arc<dyn RegistryClient>,
    options: FetchOptions,
    max_iterations: usize,
    tolerate_conflicts: bool,
    semaphore: Arc<Semaphore>,
}

impl<'a> PeerResolver<'a> {
    /// Create a resolver with the default budget that fails on conflicts
    pub fn new(
        selector: &'a VersionSelector,
        client: Arc<dyn RegistryClient>,
        options: FetchOptions,
    ) -> Self {
        Self {
            selector,
            client,
            options,
            max_iterations: DEFAULT_PEER_ITERATIONS,
            tolerate_conflicts: false,
            semaphore: Arc::new(Semaphore::new(DEFAULT_PEER_CONCURRENCY)),
        }
    }

    /// Set the iteration budget
    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations.max(1);
        self
    }

    /// Keep going when a package's peer ranges cannot all be met
    pub fn with_tolerate_conflicts(mut self, tolerate: bool) -> Self {
        self.tolerate_conflicts = tolerate;
        self
    }

    /// Bound concurrent peer lookups
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        self
    }

    /// Resolve every package to a version consistent with the peer ranges
    /// declared by the others
    ///
    /// Peer ranges fetched along the way are stored back into the version
    /// sets of `packages`.
    pub async fn resolve(
        &self,
        packages: &mut IndexMap<String, PeerPackage>,
    ) -> Result<PeerOutcome, ResolveError> {
        let mut outcome = PeerOutcome::default();
        let initial: IndexMap<String, PeerState> = packages
            .iter()
            .map(|(name, package)| (name.clone(), self.initial_state(package)))
            .collect();

        let mut snapshot = initial.clone();
        let mut pinned: HashSet<String> = HashSet::new();
        let mut failed_lookups: HashSet<(String, Version)> = HashSet::new();

        for iteration in 1..=self.max_iterations {
            outcome.iterations = iteration;
            self.load_peers(packages, &snapshot, &mut failed_lookups, &mut outcome)
                .await;
            let constraints = collect_constraints(packages, &snapshot, &mut outcome);

            let mut next = snapshot.clone();
            for (name, incoming) in &constraints {
                if pinned.contains(name) {
                    continue;
                }
                let Some(package) = packages.get(name) else {
                    continue;
                };
                let ranges: Vec<&VersionRange> = incoming.iter().map(|c| &c.range).collect();
                let ceiling = snapshot.get(name).and_then(PeerState::version);

                match self.selector.select_version(
                    &package.specifier,
                    &package.versions,
                    &package.policy,
                    &ranges,
                    ceiling,
                ) {
                    Some(record) => {
                        next.insert(name.clone(), PeerState::Fixed(record.version.clone()));
                    }
                    None if self.tolerate_conflicts => {
                        let error = conflict(name, incoming);
                        outcome.warn(PackageIssue::new(
                            name.as_str(),
                            IssueKind::PeerConflict,
                            error.to_string(),
                        ));
                        outcome.mark_incomplete(name);
                        pinned.insert(name.clone());
                        let fallback = initial.get(name).cloned().unwrap_or(PeerState::Unresolved);
                        next.insert(name.clone(), fallback.fixed());
                    }
                    None => return Err(conflict(name, incoming)),
                }
            }

            let unstable: Vec<String> = next
                .iter()
                .filter(|(name, state)| {
                    snapshot.get(*name).and_then(PeerState::version) != state.version()
                })
                .map(|(name, _)| name.clone())
                .collect();

            if unstable.is_empty() {
                debug!(iterations = iteration, "peer resolution reached a fixpoint");
                outcome.states = next.into_iter().map(|(n, s)| (n, s.fixed())).collect();
                return Ok(outcome);
            }

            debug!(iteration, changed = ?unstable, "peer candidates moved");
            if iteration == self.max_iterations {
                return Err(ResolveError::PeerCycle {
                    iterations: self.max_iterations,
                    unstable,
                });
            }
            snapshot = next;
        }

        Err(ResolveError::PeerCycle {
            iterations: self.max_iterations,
            unstable: Vec::new(),
        })
    }

    /// Candidate chosen with no peer ranges applied
    ///
    /// Falls back to the installed version, then to the highest version the
    /// declaration accepts, so the package's peer ranges still take part.
    fn initial_state(&self, package: &PeerPackage) -> PeerState {
        if let Some(record) = self.selector.select_version(
            &package.specifier,
            &package.versions,
            &package.policy,
            &[],
            None,
        ) {
            return PeerState::Candidate(record.version.clone());
        }
        let installed = package.versions.installed.clone();
        let accepted = || {
            package
                .versions
                .records()
                .iter()
                .rev()
                .find(|r| package.specifier.satisfies(&r.version))
                .map(|r| r.version.clone())
        };
        match installed.or_else(accepted) {
            Some(version) => PeerState::Candidate(version),
            None => PeerState::Unresolved,
        }
    }

    /// Fetch peer ranges for every chosen version that lacks them
    ///
    /// Returns once every lookup has completed or failed.
    async fn load_peers(
        &self,
        packages: &mut IndexMap<String, PeerPackage>,
        snapshot: &IndexMap<String, PeerState>,
        failed: &mut HashSet<(String, Version)>,
        outcome: &mut PeerOutcome,
    ) {
        let mut tasks = JoinSet::new();
        let mut lookups = HashMap::new();

        for (name, state) in snapshot {
            let Some(version) = state.version() else {
                continue;
            };
            let Some(package) = packages.get(name) else {
                continue;
            };
            let known = package
                .versions
                .get(version)
                .is_some_and(|r| r.peer_dependencies.is_some());
            if known || failed.contains(&(name.clone(), version.clone())) {
                continue;
            }

            let client = Arc::clone(&self.client);
            let semaphore = Arc::clone(&self.semaphore);
            let options = self.options.clone();
            let name = name.clone();
            let query_name = package.query_name.clone();
            let version = version.clone();
            let task_version = version.clone();
            let handle = tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let lookup = client.fetch_peer_dependencies(&query_name, &task_version, &options);
                match tokio::time::timeout(options.timeout, lookup).await {
                    Ok(result) => result,
                    Err(_) => Err(RegistryError::unavailable(
                        &query_name,
                        client.backend().name(),
                        format!("timed out after {:?}", options.timeout),
                    )),
                }
            });
            lookups.insert(handle.id(), (name, version));
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            let (id, joined) = match joined {
                Ok((id, result)) => (id, Ok(result)),
                Err(error) => {
                    warn!(%error, "peer lookup task failed");
                    (error.id(), Err(error.to_string()))
                }
            };
            let Some((name, version)) = lookups.remove(&id) else {
                continue;
            };
            let result = joined.unwrap_or_else(|message| {
                Err(RegistryError::unavailable(
                    name.as_str(),
                    self.client.backend().name(),
                    message,
                ))
            });
            match result {
                Ok(peers) => {
                    debug!(package = %name, %version, peers = peers.len(), "loaded peer ranges");
                    if let Some(package) = packages.get_mut(&name) {
                        if let Some(record) = package
                            .versions
                            .records_mut()
                            .iter_mut()
                            .find(|r| r.version == version)
                        {
                            record.peer_dependencies = Some(peers);
                        }
                    }
                }
                Err(error) => {
                    outcome.warn(PackageIssue::new(
                        name.as_str(),
                        IssueKind::BackendUnavailable,
                        format!("peer ranges of {}@{} unknown: {}", name, version, error),
                    ));
                    outcome.mark_incomplete(&name);
                    failed.insert((name, version));
                }
            }
        }
    }
}

/// Gather the peer ranges every chosen version declares against other
/// packages of the set
fn collect_constraints(
    packages: &IndexMap<String, PeerPackage>,
    snapshot: &IndexMap<String, PeerState>,
    outcome: &mut PeerOutcome,
) -> IndexMap<String, Vec<PeerConstraint>> {
    let mut constraints: IndexMap<String, Vec<PeerConstraint>> = IndexMap::new();

    for (declarer, state) in snapshot {
        let Some(version) = state.version() else {
            continue;
        };
        let Some(peers) = packages
            .get(declarer)
            .and_then(|p| p.versions.get(version))
            .and_then(|r| r.peer_dependencies.as_ref())
        else {
            continue;
        };

        for (peer, raw) in peers {
            if peer == declarer || !packages.contains_key(peer) {
                continue;
            }
            match VersionRange::parse(raw) {
                Ok(range) => constraints.entry(peer.clone()).or_default().push(PeerConstraint {
                    declarer: declarer.clone(),
                    declarer_version: version.clone(),
                    peer: peer.clone(),
                    range,
                }),
                Err(error) => outcome.warn(PackageIssue::new(
                    declarer.as_str(),
                    IssueKind::InvalidPeerRange,
                    format!("ignoring peer range for {}: {}", peer, error),
                )),
            }
        }
    }

    constraints
}

fn conflict(package: &str, incoming: &[PeerConstraint]) -> ResolveError {
    ResolveError::PeerConflict {
        package: package.to_string(),
        constraints: incoming.iter().map(ToString::to_string).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::VersionRecord;
    use crate::registry::mock::MockRegistry;
    use crate::update::UpdateFilter;

    fn record(package: &str, version: &str, peers: &[(&str, &str)]) -> VersionRecord {
        VersionRecord::new(package, Version::parse(version).unwrap()).with_peer_dependencies(
            peers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<Vec<_>>(),
        )
    }

    fn package(name: &str, spec: &str, records: Vec<VersionRecord>) -> (String, PeerPackage) {
        (
            name.to_string(),
            PeerPackage {
                query_name: name.to_string(),
                specifier: Specifier::parse(spec).unwrap(),
                policy: UpgradePolicy::Latest,
                versions: VersionSet::new(name, records),
            },
        )
    }

    /// `return-version` 1.0.0 / 1.1.0 / 2.0.0, and `peer-update` whose
    /// 1.1.0 requires `return-version@1.1.x`
    fn fixture() -> IndexMap<String, PeerPackage> {
        IndexMap::from([
            package(
                "ncu-test-return-version",
                "1.0.0",
                vec![
                    record("ncu-test-return-version", "1.0.0", &[]),
                    record("ncu-test-return-version", "1.1.0", &[]),
                    record("ncu-test-return-version", "2.0.0", &[]),
                ],
            ),
            package(
                "ncu-test-peer-update",
                "1.0.0",
                vec![
                    record(
                        "ncu-test-peer-update",
                        "1.0.0",
                        &[("ncu-test-return-version", "1.0.x")],
                    ),
                    record(
                        "ncu-test-peer-update",
                        "1.1.0",
                        &[("ncu-test-return-version", "1.1.x")],
                    ),
                ],
            ),
        ])
    }

    fn resolver(selector: &VersionSelector) -> PeerResolver<'_> {
        PeerResolver::new(
            selector,
            Arc::new(MockRegistry::new()),
            FetchOptions::new("."),
        )
    }

    fn version_of(outcome: &PeerOutcome, name: &str) -> Option<Version> {
        outcome.states.get(name).and_then(PeerState::version).cloned()
    }

    #[tokio::test]
    async fn test_peer_range_caps_candidate() {
        let selector = VersionSelector::new(UpdateFilter::new());
        let mut packages = fixture();
        let outcome = resolver(&selector).resolve(&mut packages).await.unwrap();

        assert_eq!(
            version_of(&outcome, "ncu-test-return-version"),
            Some(Version::new(1, 1, 0))
        );
        assert_eq!(
            version_of(&outcome, "ncu-test-peer-update"),
            Some(Version::new(1, 1, 0))
        );
        assert!(outcome
            .states
            .values()
            .all(|s| matches!(s, PeerState::Fixed(_))));
        assert_eq!(outcome.iterations, 2);
    }

    #[tokio::test]
    async fn test_no_peers_matches_independent_selection() {
        let selector = VersionSelector::new(UpdateFilter::new());
        let mut packages = IndexMap::from([
            package("a", "^1.0.0", vec![record("a", "1.0.0", &[]), record("a", "2.0.0", &[])]),
            package("b", "~1.0.0", vec![record("b", "1.0.0", &[]), record("b", "1.3.0", &[])]),
        ]);
        let outcome = resolver(&selector).resolve(&mut packages).await.unwrap();

        for (name, package) in &packages {
            let independent = selector
                .select_version(&package.specifier, &package.versions, &package.policy, &[], None)
                .map(|r| r.version.clone());
            assert_eq!(version_of(&outcome, name), independent);
        }
        assert_eq!(outcome.iterations, 1);
    }

    #[tokio::test]
    async fn test_conflict_fails_by_default() {
        let selector = VersionSelector::new(UpdateFilter::new());
        let mut packages = IndexMap::from([
            package("host", "^1.0.0", vec![record("host", "1.0.0", &[]), record("host", "2.0.0", &[])]),
            package("plugin-a", "^1.0.0", vec![record("plugin-a", "1.0.0", &[("host", "^3.0.0")])]),
        ]);
        let error = resolver(&selector).resolve(&mut packages).await.unwrap_err();

        match error {
            ResolveError::PeerConflict {
                package,
                constraints,
            } => {
                assert_eq!(package, "host");
                assert_eq!(constraints, vec!["plugin-a@1.0.0 requires host@^3.0.0"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_conflict_tolerated_keeps_pre_peer_candidate() {
        let selector = VersionSelector::new(UpdateFilter::new());
        let mut packages = IndexMap::from([
            package("host", "^1.0.0", vec![record("host", "1.0.0", &[]), record("host", "2.0.0", &[])]),
            package("plugin-a", "^1.0.0", vec![record("plugin-a", "1.0.0", &[("host", "^3.0.0")])]),
        ]);
        let outcome = resolver(&selector)
            .with_tolerate_conflicts(true)
            .resolve(&mut packages)
            .await
            .unwrap();

        assert_eq!(version_of(&outcome, "host"), Some(Version::new(2, 0, 0)));
        assert_eq!(outcome.incomplete, vec!["host"]);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].kind, IssueKind::PeerConflict);
    }

    #[tokio::test]
    async fn test_budget_exceeded_reports_unstable_packages() {
        let selector = VersionSelector::new(UpdateFilter::new());
        let mut packages = fixture();
        let error = resolver(&selector)
            .with_max_iterations(1)
            .resolve(&mut packages)
            .await
            .unwrap_err();

        assert_eq!(
            error,
            ResolveError::PeerCycle {
                iterations: 1,
                unstable: vec!["ncu-test-return-version".to_string()],
            }
        );
    }

    #[tokio::test]
    async fn test_chain_narrows_transitively() {
        // c@2 only accepts b@1, and b@1 only accepts a@1
        let selector = VersionSelector::new(UpdateFilter::new());
        let mut packages = IndexMap::from([
            package("a", "^1.0.0", vec![record("a", "1.0.0", &[]), record("a", "2.0.0", &[])]),
            package(
                "b",
                "^1.0.0",
                vec![
                    record("b", "1.0.0", &[("a", "^1.0.0")]),
                    record("b", "2.0.0", &[("a", "^2.0.0")]),
                ],
            ),
            package(
                "c",
                "^1.0.0",
                vec![
                    record("c", "1.0.0", &[("b", "^1.0.0")]),
                    record("c", "2.0.0", &[("b", "^1.0.0")]),
                ],
            ),
        ]);
        let outcome = resolver(&selector).resolve(&mut packages).await.unwrap();

        assert_eq!(version_of(&outcome, "c"), Some(Version::new(2, 0, 0)));
        assert_eq!(version_of(&outcome, "b"), Some(Version::new(1, 0, 0)));
        assert_eq!(version_of(&outcome, "a"), Some(Version::new(1, 0, 0)));
        assert_eq!(outcome.iterations, 3);
    }

    #[tokio::test]
    async fn test_self_reference_and_unknown_peers_ignored() {
        let selector = VersionSelector::new(UpdateFilter::new());
        let mut packages = IndexMap::from([package(
            "a",
            "^1.0.0",
            vec![
                record("a", "1.0.0", &[]),
                record("a", "2.0.0", &[("a", "^1.0.0"), ("react", "^16.0.0")]),
            ],
        )]);
        let outcome = resolver(&selector).resolve(&mut packages).await.unwrap();
        assert_eq!(version_of(&outcome, "a"), Some(Version::new(2, 0, 0)));
    }

    #[tokio::test]
    async fn test_invalid_peer_range_warns() {
        let selector = VersionSelector::new(UpdateFilter::new());
        let mut packages = IndexMap::from([
            package("a", "^1.0.0", vec![record("a", "1.0.0", &[]), record("a", "2.0.0", &[])]),
            package("b", "^1.0.0", vec![record("b", "1.0.0", &[("a", "~>1.0")])]),
        ]);
        let outcome = resolver(&selector).resolve(&mut packages).await.unwrap();

        assert_eq!(version_of(&outcome, "a"), Some(Version::new(2, 0, 0)));
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].kind, IssueKind::InvalidPeerRange);
        assert_eq!(outcome.warnings[0].package, "b");
    }

    #[tokio::test]
    async fn test_missing_peer_data_is_fetched() {
        let registry = MockRegistry::new()
            .with_versions(
                "host",
                vec![
                    VersionRecord::new("host", Version::new(1, 0, 0)),
                    VersionRecord::new("host", Version::new(2, 0, 0)),
                ],
            )
            .with_versions(
                "plugin",
                vec![record("plugin", "1.0.0", &[("host", "^1.0.0")])],
            );
        let selector = VersionSelector::new(UpdateFilter::new());
        let mut packages = IndexMap::from([
            package(
                "host",
                "^1.0.0",
                vec![
                    VersionRecord::new("host", Version::new(1, 0, 0)),
                    VersionRecord::new("host", Version::new(2, 0, 0)),
                ],
            ),
            package("plugin", "^1.0.0", vec![VersionRecord::new("plugin", Version::new(1, 0, 0))]),
        ]);
        let outcome = PeerResolver::new(&selector, Arc::new(registry.clone()), FetchOptions::new("."))
            .resolve(&mut packages)
            .await
            .unwrap();

        assert_eq!(version_of(&outcome, "host"), Some(Version::new(1, 0, 0)));
        let plugin = packages["plugin"].versions.get(&Version::new(1, 0, 0)).unwrap();
        assert_eq!(
            plugin.peer_dependencies.as_ref().and_then(|p| p.get("host")).map(String::as_str),
            Some("^1.0.0")
        );
        assert!(registry.fetch_count() >= 2);
    }

    #[tokio::test]
    async fn test_failed_peer_lookup_marks_incomplete() {
        let registry = MockRegistry::new().with_error(
            "plugin",
            RegistryError::unavailable("plugin", "npm", "connection reset"),
        );
        let selector = VersionSelector::new(UpdateFilter::new());
        let mut packages = IndexMap::from([package(
            "plugin",
            "^1.0.0",
            vec![VersionRecord::new("plugin", Version::new(1, 0, 0))],
        )]);
        let outcome = PeerResolver::new(&selector, Arc::new(registry), FetchOptions::new("."))
            .resolve(&mut packages)
            .await
            .unwrap();

        assert_eq!(version_of(&outcome, "plugin"), Some(Version::new(1, 0, 0)));
        assert_eq!(outcome.incomplete, vec!["plugin"]);
        assert_eq!(outcome.warnings[0].kind, IssueKind::BackendUnavailable);
    }

    #[tokio::test]
    async fn test_crashed_peer_lookup_marks_incomplete() {
        let registry = MockRegistry::new()
            .with_versions("plugin", vec![VersionRecord::new("plugin", Version::new(1, 0, 0))])
            .with_peer_panic("plugin");
        let selector = VersionSelector::new(UpdateFilter::new());
        let mut packages = IndexMap::from([package(
            "plugin",
            "^1.0.0",
            vec![VersionRecord::new("plugin", Version::new(1, 0, 0))],
        )]);
        let outcome = PeerResolver::new(&selector, Arc::new(registry), FetchOptions::new("."))
            .resolve(&mut packages)
            .await
            .unwrap();

        assert_eq!(version_of(&outcome, "plugin"), Some(Version::new(1, 0, 0)));
        assert_eq!(outcome.incomplete, vec!["plugin"]);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].package, "plugin");
        assert_eq!(outcome.warnings[0].kind, IssueKind::BackendUnavailable);
    }

    #[tokio::test]
    async fn test_oversized_peer_range_warns() {
        let selector = VersionSelector::new(UpdateFilter::new());
        let mut packages = IndexMap::from([
            package("a", "^1.0.0", vec![record("a", "1.0.0", &[]), record("a", "2.0.0", &[])]),
            package(
                "b",
                "^1.0.0",
                vec![record("b", "1.0.0", &[("a", "^18446744073709551615")])],
            ),
        ]);
        let outcome = resolver(&selector).resolve(&mut packages).await.unwrap();

        assert_eq!(version_of(&outcome, "a"), Some(Version::new(2, 0, 0)));
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].kind, IssueKind::InvalidPeerRange);
    }

    #[test]
    fn test_peer_state_version() {
        assert_eq!(PeerState::Unresolved.version(), None);
        let v = Version::new(1, 0, 0);
        assert_eq!(PeerState::Candidate(v.clone()).version(), Some(&v));
        assert_eq!(PeerState::Candidate(v.clone()).fixed(), PeerState::Fixed(v));
    }
}
