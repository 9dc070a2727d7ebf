//! In-memory mutations over an [`AnalysisState`].
//!
//! Every operation here validates first and only then touches the state, so
//! a rejected call leaves the state exactly as it was. Membership is kept
//! bidirectional: a repository lists a component in `assigned_components`
//! exactly when the component lists the repository.

use chrono::{DateTime, Utc};
use sonar_core::{
    validate_component_name, AnalysisState, AnalysisStatus, ComponentRecord, DeepAnalysis,
    DependencyKind, DependencyRecord, EntityKind, Error, Insights, RepositoryRecord, Result,
};

/// Components, assignments and dependency edges.
#[derive(Debug)]
pub struct ComponentRegistry<'a> {
    state: &'a mut AnalysisState,
}

impl<'a> ComponentRegistry<'a> {
    pub fn new(state: &'a mut AnalysisState) -> Self {
        Self { state }
    }

    /// Create an empty component.
    pub fn add_component(
        &mut self,
        name: &str,
        purpose: &str,
        rationale: &str,
        created_at: DateTime<Utc>,
    ) -> Result<ComponentRecord> {
        validate_component_name(name)?;
        if self.state.components.contains_key(name) {
            return Err(Error::DuplicateName {
                kind: EntityKind::Component,
                name: name.to_string(),
            });
        }

        let component = ComponentRecord::new(name, purpose, rationale, created_at);
        self.state
            .components
            .insert(name.to_string(), component.clone());
        Ok(component)
    }

    /// Add `repository` to `component` on both sides.
    ///
    /// Returns `false` when the assignment already existed.
    pub fn assign(&mut self, repository: &str, component: &str) -> Result<bool> {
        let (repo, comp) = self.both_mut(repository, component)?;
        if comp.repositories.iter().any(|r| r == repository) {
            return Ok(false);
        }
        comp.repositories.push(repository.to_string());
        if !repo.assigned_components.iter().any(|c| c == component) {
            repo.assigned_components.push(component.to_string());
        }
        Ok(true)
    }

    /// Remove `repository` from `component` on both sides.
    ///
    /// Returns `false` when the repository was not a member.
    pub fn unassign(&mut self, repository: &str, component: &str) -> Result<bool> {
        let (repo, comp) = self.both_mut(repository, component)?;
        let before = comp.repositories.len();
        comp.repositories.retain(|r| r != repository);
        repo.assigned_components.retain(|c| c != component);
        Ok(comp.repositories.len() != before)
    }

    pub fn set_standalone(&mut self, component: &str, standalone: bool) -> Result<()> {
        let comp = self
            .state
            .components
            .get_mut(component)
            .ok_or_else(|| Error::component_not_found(component))?;
        comp.standalone = standalone;
        Ok(())
    }

    /// Record a directed dependency between two known repositories.
    pub fn add_dependency(
        &mut self,
        source: &str,
        target: &str,
        kind: DependencyKind,
        description: &str,
        evidence: &str,
        created_at: DateTime<Utc>,
    ) -> Result<DependencyRecord> {
        for name in [source, target] {
            if !self.state.repositories.contains_key(name) {
                return Err(Error::repository_not_found(name));
            }
        }
        if source == target {
            return Err(Error::SelfDependency {
                name: source.to_string(),
            });
        }
        if self
            .state
            .dependency_records
            .iter()
            .any(|d| d.source_repo == source && d.target_repo == target && d.kind == kind)
        {
            return Err(Error::DuplicateDependency {
                source_repo: source.to_string(),
                target_repo: target.to_string(),
                kind: kind.to_string(),
            });
        }

        let record = DependencyRecord {
            source_repo: source.to_string(),
            target_repo: target.to_string(),
            kind,
            evidence: evidence.to_string(),
            description: description.to_string(),
            created_at: Some(created_at),
        };
        self.state.dependency_records.push(record.clone());
        Ok(record)
    }

    fn both_mut(
        &mut self,
        repository: &str,
        component: &str,
    ) -> Result<(&mut RepositoryRecord, &mut ComponentRecord)> {
        let repo = self
            .state
            .repositories
            .get_mut(repository)
            .ok_or_else(|| Error::repository_not_found(repository))?;
        let comp = self
            .state
            .components
            .get_mut(component)
            .ok_or_else(|| Error::component_not_found(component))?;
        Ok((repo, comp))
    }
}

/// Insert a scanned record, or merge it into the existing one.
pub fn upsert_repository(state: &mut AnalysisState, record: RepositoryRecord) {
    match state.repositories.get_mut(&record.name) {
        Some(existing) => existing.merge_scan(record),
        None => {
            state.repositories.insert(record.name.clone(), record);
        }
    }
}

/// Shallow-merge insights into a repository and mark it enriched.
pub fn store_insights(
    state: &mut AnalysisState,
    name: &str,
    insights: Insights,
) -> Result<RepositoryRecord> {
    check_insights(&insights)?;
    let repo = state
        .repositories
        .get_mut(name)
        .ok_or_else(|| Error::repository_not_found(name))?;

    repo.insights.extend(insights);
    repo.analysis_status = AnalysisStatus::InsightEnriched;
    Ok(repo.clone())
}

/// Attach (or replace) a repository's deep analysis.
pub fn store_deep_analysis(
    state: &mut AnalysisState,
    name: &str,
    markdown_summary: &str,
    deep_insights: Insights,
    analysis_timestamp: DateTime<Utc>,
) -> Result<RepositoryRecord> {
    check_insights(&deep_insights)?;
    let repo = state
        .repositories
        .get_mut(name)
        .ok_or_else(|| Error::repository_not_found(name))?;

    repo.deep_analysis = Some(DeepAnalysis {
        markdown_summary: markdown_summary.to_string(),
        deep_insights,
        analysis_timestamp,
    });
    Ok(repo.clone())
}

fn check_insights(insights: &Insights) -> Result<()> {
    match insights
        .iter()
        .find_map(|(key, value)| value.non_finite_path(key))
    {
        Some(key) => Err(Error::InvalidInsight { key }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonar_core::InsightValue;

    fn state_with(repos: &[&str]) -> AnalysisState {
        let mut state = AnalysisState::default();
        for name in repos {
            let mut record = RepositoryRecord::new(*name, *name);
            record.analysis_status = AnalysisStatus::Analyzed;
            state.repositories.insert(name.to_string(), record);
        }
        state
    }

    fn assert_bidirectional(state: &AnalysisState) {
        for (name, comp) in &state.components {
            for repo in &comp.repositories {
                assert!(state.repositories[repo].assigned_components.contains(name));
            }
        }
        for (name, repo) in &state.repositories {
            for comp in &repo.assigned_components {
                assert!(state.components[comp].repositories.contains(name));
            }
        }
    }

    #[test]
    fn test_add_component_rejects_duplicates_and_bad_names() {
        let mut state = state_with(&[]);
        let mut registry = ComponentRegistry::new(&mut state);
        registry
            .add_component("backend", "APIs", "Shared domain", Utc::now())
            .unwrap();

        let err = registry
            .add_component("backend", "again", "", Utc::now())
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateName { .. }));

        let err = registry
            .add_component("bad name!", "", "", Utc::now())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidName { .. }));
        assert_eq!(state.components.len(), 1);
    }

    #[test]
    fn test_assign_and_unassign_are_bidirectional() {
        let mut state = state_with(&["svc-a", "svc-b"]);
        let mut registry = ComponentRegistry::new(&mut state);
        registry.add_component("backend", "", "", Utc::now()).unwrap();
        registry.add_component("shared", "", "", Utc::now()).unwrap();

        assert!(registry.assign("svc-a", "backend").unwrap());
        assert!(!registry.assign("svc-a", "backend").unwrap());
        assert!(registry.assign("svc-b", "backend").unwrap());
        assert!(registry.assign("svc-a", "shared").unwrap());
        assert_bidirectional(&state);
        assert_eq!(state.components["backend"].repositories, vec!["svc-a", "svc-b"]);
        assert_eq!(
            state.repositories["svc-a"].assigned_components,
            vec!["backend", "shared"]
        );

        let mut registry = ComponentRegistry::new(&mut state);
        assert!(registry.unassign("svc-a", "backend").unwrap());
        assert!(!registry.unassign("svc-a", "backend").unwrap());
        assert_bidirectional(&state);
        assert_eq!(state.components["backend"].repositories, vec!["svc-b"]);
    }

    #[test]
    fn test_assign_unknown_names() {
        let mut state = state_with(&["svc-a"]);
        let mut registry = ComponentRegistry::new(&mut state);
        registry.add_component("backend", "", "", Utc::now()).unwrap();

        let err = registry.assign("missing", "backend").unwrap_err();
        assert_eq!(err, Error::repository_not_found("missing"));
        let err = registry.assign("svc-a", "missing").unwrap_err();
        assert_eq!(err, Error::component_not_found("missing"));

        assert!(state.components["backend"].repositories.is_empty());
        assert!(state.repositories["svc-a"].assigned_components.is_empty());
    }

    #[test]
    fn test_dependency_rules() {
        let mut state = state_with(&["api", "db"]);
        let mut registry = ComponentRegistry::new(&mut state);
        let now = Utc::now();

        registry
            .add_dependency("api", "db", DependencyKind::Runtime, "reads", "JDBC url", now)
            .unwrap();
        registry
            .add_dependency("api", "db", DependencyKind::Build, "schema", "", now)
            .unwrap();

        let err = registry
            .add_dependency("api", "db", DependencyKind::Runtime, "", "", now)
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateDependency { .. }));

        let err = registry
            .add_dependency("api", "api", DependencyKind::Runtime, "", "", now)
            .unwrap_err();
        assert!(matches!(err, Error::SelfDependency { .. }));

        let err = registry
            .add_dependency("api", "cache", DependencyKind::Runtime, "", "", now)
            .unwrap_err();
        assert!(err.is_not_found());

        assert_eq!(state.dependency_records.len(), 2);
    }

    #[test]
    fn test_store_insights_merges() {
        let mut state = state_with(&["svc-a"]);
        let mut first = Insights::new();
        first.insert("business_domain".into(), "payments".into());
        first.insert("team".into(), "core".into());
        store_insights(&mut state, "svc-a", first).unwrap();

        let mut second = Insights::new();
        second.insert("team".into(), "platform".into());
        second.insert("critical".into(), true.into());
        let record = store_insights(&mut state, "svc-a", second).unwrap();

        assert_eq!(record.analysis_status, AnalysisStatus::InsightEnriched);
        assert_eq!(record.insights.len(), 3);
        assert_eq!(record.insights["business_domain"], InsightValue::from("payments"));
        assert_eq!(record.insights["team"], InsightValue::from("platform"));
    }

    #[test]
    fn test_store_insights_rejects_non_finite() {
        let mut state = state_with(&["svc-a"]);
        let mut insights = Insights::new();
        insights.insert("score".into(), f64::NAN.into());
        let err = store_insights(&mut state, "svc-a", insights).unwrap_err();
        assert_eq!(err, Error::InvalidInsight { key: "score".into() });
        assert_eq!(
            state.repositories["svc-a"].analysis_status,
            AnalysisStatus::Analyzed
        );

        let err = store_insights(&mut state, "missing", Insights::new()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_upsert_preserves_assignments() {
        let mut state = state_with(&["svc-a"]);
        ComponentRegistry::new(&mut state)
            .add_component("backend", "", "", Utc::now())
            .unwrap();
        ComponentRegistry::new(&mut state)
            .assign("svc-a", "backend")
            .unwrap();

        let mut rescanned = RepositoryRecord::new("svc-a", "svc-a");
        rescanned.total_files = 42;
        rescanned.analysis_status = AnalysisStatus::Analyzed;
        upsert_repository(&mut state, rescanned);
        upsert_repository(&mut state, RepositoryRecord::new("svc-b", "svc-b"));

        assert_eq!(state.repositories["svc-a"].total_files, 42);
        assert_eq!(state.repositories["svc-a"].assigned_components, vec!["backend"]);
        assert_eq!(state.repositories.len(), 2);
    }

    #[test]
    fn test_deep_analysis() {
        let mut state = state_with(&["svc-a"]);
        let now = Utc::now();
        let record =
            store_deep_analysis(&mut state, "svc-a", "# Summary", Insights::new(), now).unwrap();
        let deep = record.deep_analysis.unwrap();
        assert_eq!(deep.markdown_summary, "# Summary");
        assert_eq!(deep.analysis_timestamp, now);
    }
}
