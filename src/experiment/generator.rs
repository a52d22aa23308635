//! Experiment Configuration Generator
//!
//! Expands a grid of parameter axes into one configuration file per
//! combination plus a batch script listing the engine invocations.
//!
//! ## Pipeline
//!
//! ```text
//! axes ──► Cartesian product ──► exclusion rules ──► neighborhood size
//!                                                          │
//!          batch line ◄── record (baseline + derived) ◄── identifier
//! ```
//!
//! Generation is two-phase: [`Generator::plan`] computes every file in
//! memory (templates, lookups and collision checks included) and
//! [`Generator::write`] puts them on disk. A planning error therefore never
//! leaves partial output behind.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::axis::{Axis, CartesianProduct, Combination};
use super::batch::{BatchScript, JobSpec};
use super::exclusion::ExclusionRule;
use super::neighborhood::{NeighborhoodBinding, NeighborhoodSize};
use super::record::{ConfigRecord, PARENT_KEY};
use super::template::{Template, Vars};
use crate::dataset::DatasetCatalog;
use crate::{Error, Result};

/// Placeholders the generator defines for every record.
const RESERVED: [&str; 5] = ["id", "number", "group", "k", "config"];

/// How the shared baseline reaches each record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Inheritance {
    /// Merge the baseline into every record (self-contained files).
    #[default]
    Inline,
    /// Write the baseline once per group and reference it with `parent = <path>`.
    ParentFile {
        /// File name of the baseline, next to the records
        file_name: String,
        /// Template for the referenced path; defaults to the local path
        reference: Option<String>,
    },
}

impl Inheritance {
    /// Parent-file inheritance referencing the local baseline file.
    #[must_use]
    pub fn parent_file(file_name: impl Into<String>) -> Self {
        Self::ParentFile {
            file_name: file_name.into(),
            reference: None,
        }
    }
}

#[derive(Debug, Clone)]
enum ResolvedInheritance {
    Inline,
    ParentFile {
        file_name: String,
        reference: Option<Template>,
    },
}

/// A generator ready to plan and write a grid.
#[derive(Debug, Clone)]
pub struct Generator {
    axes: Vec<Axis>,
    baseline: ConfigRecord,
    derived: Vec<(String, Template)>,
    exclusions: Vec<ExclusionRule>,
    neighborhood: Option<NeighborhoodBinding>,
    catalog: DatasetCatalog,
    vars: Vars,
    separator: String,
    prefix: Option<String>,
    first_number: Option<u64>,
    group_by: Vec<String>,
    inheritance: ResolvedInheritance,
    root: PathBuf,
    config_dir: Option<String>,
    extension: String,
    batch_file: String,
    manifest: Option<String>,
    job: JobSpec,
}

/// Builder for [`Generator`].
#[derive(Debug, Clone)]
pub struct GeneratorBuilder {
    axes: Vec<Axis>,
    baseline: ConfigRecord,
    derived: Vec<(String, String)>,
    exclusions: Vec<ExclusionRule>,
    neighborhood: Option<NeighborhoodBinding>,
    catalog: DatasetCatalog,
    vars: Vars,
    separator: String,
    prefix: Option<String>,
    first_number: Option<u64>,
    group_by: Vec<String>,
    inheritance: Inheritance,
    root: PathBuf,
    config_dir: Option<String>,
    extension: String,
    batch_file: String,
    manifest: Option<String>,
    job: Option<JobSpec>,
}

impl Generator {
    /// Start building a generator writing below `output_dir`. A relative
    /// directory is resolved against the current directory when the
    /// generator is built, so every written path is absolute.
    #[must_use]
    pub fn builder(output_dir: impl Into<PathBuf>) -> GeneratorBuilder {
        GeneratorBuilder::new(output_dir)
    }

    /// Axes in expansion order.
    #[must_use]
    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    /// Root output directory (absolute).
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.root
    }

    /// Compute every file of the grid without touching the filesystem.
    ///
    /// # Errors
    ///
    /// - [`Error::Combination`] wrapping a lookup/template error, naming the
    ///   failing combination
    /// - [`Error::IdentifierCollision`] if two combinations (or a record and
    ///   a generated support file) map to the same name
    pub fn plan(&self) -> Result<Plan> {
        let mut experiments: Vec<PlannedExperiment> = Vec::new();
        let mut groups: Vec<GroupPlan> = Vec::new();
        let mut group_index: HashMap<String, usize> = HashMap::new();
        let mut identifiers: HashMap<String, String> = HashMap::new();
        let mut paths: HashMap<PathBuf, String> = HashMap::new();
        let mut excluded = 0;
        let mut ordinal = self.first_number.unwrap_or(1);

        if let Some(name) = &self.manifest {
            paths.insert(self.root.join(name), "the manifest".to_string());
        }

        for combination in CartesianProduct::new(&self.axes) {
            if let Some(rule) = self.exclusions.iter().find(|r| r.excludes(&combination)) {
                tracing::debug!(rule = rule.name(), combination = %combination, "Excluded");
                excluded += 1;
                continue;
            }

            let label = combination.to_string();
            let group_key = self.group_key(&combination);
            let group = match group_index.get(&group_key) {
                Some(&index) => index,
                None => {
                    let plan = self.plan_group(&group_key);
                    for (path, owner) in plan.support_files() {
                        claim(&mut paths, path, owner, &group_key)?;
                    }
                    groups.push(plan);
                    group_index.insert(group_key.clone(), groups.len() - 1);
                    groups.len() - 1
                }
            };

            let experiment = self
                .plan_experiment(combination, ordinal, &groups[group])
                .map_err(|e| e.in_combination(label.as_str()))?;

            if let Some(previous) = identifiers.get(&experiment.identifier) {
                return Err(Error::IdentifierCollision {
                    identifier: experiment.identifier.clone(),
                    first: previous.clone(),
                    second: label,
                });
            }
            claim(&mut paths, &experiment.config_path, label.clone(), &experiment.identifier)?;
            identifiers.insert(experiment.identifier.clone(), label);

            tracing::trace!(identifier = %experiment.identifier, "Planned record");
            groups[group].script.push_job(experiment.job_line.clone());
            if let Some(dir) = Path::new(&experiment.log_path)
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
            {
                groups[group].script.ensure_dir(dir.display().to_string());
            }
            groups[group].members += 1;
            experiments.push(PlannedExperiment { group, ..experiment });
            ordinal += 1;
        }

        Ok(Plan {
            experiments,
            groups,
            excluded,
            total: CartesianProduct::total(&self.axes),
            manifest: self.manifest.as_ref().map(|name| self.root.join(name)),
        })
    }

    /// Write a plan to disk: directories first, then baseline files,
    /// records, batch scripts and the manifest.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Filesystem`] on the first directory or file that
    /// cannot be created or written. Files written before the failure are
    /// left in place.
    pub fn write(&self, plan: &Plan) -> Result<GenerationReport> {
        for group in &plan.groups {
            create_dir(&group.dir)?;
            create_dir(&group.config_dir)?;
            if let Some((path, record)) = &group.master {
                write_file(path, &record.render())?;
            }
        }

        for experiment in &plan.experiments {
            write_file(&experiment.config_path, &experiment.record.render())?;
            tracing::debug!(path = %experiment.config_path.display(), "Wrote record");
        }

        let mut batch_scripts = Vec::with_capacity(plan.groups.len());
        for group in &plan.groups {
            write_file(&group.batch_path, &group.script.render())?;
            if let Some(mode) = self.job.script_mode() {
                set_mode(&group.batch_path, mode);
            }
            tracing::info!(
                group = %group.key,
                jobs = group.script.job_count(),
                path = %group.batch_path.display(),
                "Wrote batch script"
            );
            batch_scripts.push(group.batch_path.clone());
        }

        if let Some(path) = &plan.manifest {
            let entries: Vec<ManifestEntry<'_>> = plan
                .experiments
                .iter()
                .map(|e| ManifestEntry::new(e, &plan.groups[e.group]))
                .collect();
            create_dir(&self.root)?;
            write_file(path, &(serde_json::to_string_pretty(&entries)? + "\n"))?;
        }

        Ok(GenerationReport {
            configs_written: plan.experiments.len(),
            excluded: plan.excluded,
            batch_scripts,
            master_files: plan
                .groups
                .iter()
                .filter_map(|g| g.master.as_ref().map(|(p, _)| p.clone()))
                .collect(),
            manifest: plan.manifest.clone(),
        })
    }

    /// Plan and write in one pass.
    ///
    /// # Errors
    ///
    /// See [`plan`](Self::plan) and [`write`](Self::write).
    pub fn generate(&self) -> Result<GenerationReport> {
        let plan = self.plan()?;
        tracing::info!(
            output_dir = %self.root.display(),
            records = plan.len(),
            excluded = plan.excluded(),
            groups = plan.groups().len(),
            "Generating experiment grid"
        );
        self.write(&plan)
    }

    fn group_key(&self, combination: &Combination) -> String {
        self.group_by
            .iter()
            .filter_map(|axis| combination.label(axis))
            .collect::<Vec<_>>()
            .join(&self.separator)
    }

    fn plan_group(&self, key: &str) -> GroupPlan {
        let dir = if key.is_empty() {
            self.root.clone()
        } else {
            self.root.join(key)
        };
        let config_dir = match &self.config_dir {
            Some(sub) => dir.join(sub),
            None => dir.clone(),
        };

        let master = match &self.inheritance {
            ResolvedInheritance::Inline => None,
            ResolvedInheritance::ParentFile { file_name, .. } => {
                Some((config_dir.join(file_name), self.baseline.clone()))
            }
        };

        GroupPlan {
            key: key.to_string(),
            batch_path: dir.join(&self.batch_file),
            script: self.job.script(key),
            dir,
            config_dir,
            master,
            members: 0,
        }
    }

    fn plan_experiment(
        &self,
        combination: Combination,
        ordinal: u64,
        group: &GroupPlan,
    ) -> Result<PlannedExperiment> {
        let neighborhood = self.resolve_neighborhood(&combination)?;
        let identifier = self.identifier(&combination, ordinal, neighborhood);
        if identifier.contains(['/', '\\']) {
            return Err(Error::Config(format!(
                "identifier '{identifier}' contains a path separator"
            )));
        }
        let config_path = group
            .config_dir
            .join(format!("{identifier}.{}", self.extension));

        let mut vars = self.vars.clone();
        for (axis, value) in combination.iter() {
            vars.insert(axis, value.value());
            vars.insert(format!("{axis}.alias"), value.label());
        }
        vars.insert("id", identifier.as_str())
            .insert("number", ordinal.to_string())
            .insert("group", group.key.as_str());
        if let Some(k) = neighborhood {
            vars.insert("k", k.to_string());
        }

        let mut overrides = ConfigRecord::new();
        for (key, template) in &self.derived {
            overrides.set(key.as_str(), template.render(&vars)?)?;
        }
        if let (Some(k), Some(key)) = (
            neighborhood,
            self.neighborhood.as_ref().and_then(|b| b.key.as_ref()),
        ) {
            overrides.set(key.as_str(), k.to_string())?;
        }

        let record = match (&self.inheritance, &group.master) {
            (ResolvedInheritance::ParentFile { reference, .. }, Some((master_path, _))) => {
                let parent = match reference {
                    Some(template) => template.render(&vars)?,
                    None => master_path.display().to_string(),
                };
                ConfigRecord::from_pairs([(PARENT_KEY, parent)])?.merged(&overrides)
            }
            _ => self.baseline.merged(&overrides),
        };

        vars.insert("config", config_path.display().to_string());
        let job_line = self.job.job_line(&vars)?;
        let log_path = self.job.log_path(&vars)?;

        Ok(PlannedExperiment {
            identifier,
            number: ordinal,
            group: 0,
            combination,
            config_path,
            record,
            job_line,
            log_path,
            neighborhood,
        })
    }

    fn resolve_neighborhood(&self, combination: &Combination) -> Result<Option<u64>> {
        let Some(binding) = &self.neighborhood else {
            return Ok(None);
        };
        let size: NeighborhoodSize = combination
            .value(&binding.axis)
            .ok_or_else(|| Error::Config(format!("no axis '{}'", binding.axis)))?
            .parse()?;
        let dataset = combination.value(&binding.dataset_axis).unwrap_or_default();
        size.resolve(dataset, &self.catalog).map(Some)
    }

    fn identifier(&self, combination: &Combination, ordinal: u64, k: Option<u64>) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(combination.len() + 2);
        if let Some(prefix) = self.prefix.as_deref().filter(|p| !p.is_empty()) {
            parts.push(prefix.to_string());
        }
        if self.first_number.is_some() {
            parts.push(ordinal.to_string());
        }
        let resolved_axis = self
            .neighborhood
            .as_ref()
            .filter(|b| b.in_identifier)
            .map(|b| (b.axis.as_str(), b.identifier_prefix.as_str()));
        for (axis, value) in combination.iter() {
            match (resolved_axis, k) {
                (Some((name, prefix)), Some(k)) if name == axis => parts.push(format!("{prefix}{k}")),
                _ => parts.push(value.label().to_string()),
            }
        }
        parts.join(&self.separator)
    }
}

fn claim(
    paths: &mut HashMap<PathBuf, String>,
    path: &Path,
    owner: String,
    identifier: &str,
) -> Result<()> {
    if let Some(previous) = paths.get(path) {
        return Err(Error::IdentifierCollision {
            identifier: identifier.to_string(),
            first: previous.clone(),
            second: owner,
        });
    }
    paths.insert(path.to_path_buf(), owner);
    Ok(())
}

fn create_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| Error::filesystem(path, e))
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    let file = File::create(path).map_err(|e| Error::filesystem(path, e))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(contents.as_bytes())
        .and_then(|()| writer.flush())
        .map_err(|e| Error::filesystem(path, e))
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;

    if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)) {
        tracing::warn!(path = %path.display(), mode = %format!("{mode:o}"), error = %e, "Could not set permissions");
    }
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) {}

impl GeneratorBuilder {
    /// Create a builder writing below `output_dir`.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            axes: Vec::new(),
            baseline: ConfigRecord::new(),
            derived: Vec::new(),
            exclusions: Vec::new(),
            neighborhood: None,
            catalog: DatasetCatalog::default(),
            vars: Vars::new(),
            separator: "-".to_string(),
            prefix: None,
            first_number: None,
            group_by: Vec::new(),
            inheritance: Inheritance::Inline,
            root: output_dir.into(),
            config_dir: None,
            extension: "txt".to_string(),
            batch_file: "run_all.sh".to_string(),
            manifest: None,
            job: None,
        }
    }

    /// Append an axis; axes expand in the order they are added.
    #[must_use]
    pub fn axis(mut self, axis: Axis) -> Self {
        self.axes.push(axis);
        self
    }

    /// Options shared by every record.
    #[must_use]
    pub fn baseline(mut self, baseline: ConfigRecord) -> Self {
        self.baseline = baseline;
        self
    }

    /// Per-record key whose value is rendered from `template`.
    #[must_use]
    pub fn derive(mut self, key: impl Into<String>, template: impl Into<String>) -> Self {
        self.derived.push((key.into(), template.into()));
        self
    }

    /// Skip combinations matching `rule`.
    #[must_use]
    pub fn exclude(mut self, rule: ExclusionRule) -> Self {
        self.exclusions.push(rule);
        self
    }

    /// Resolve neighborhood sizes on `binding.axis` against `catalog`.
    #[must_use]
    pub fn neighborhood(mut self, binding: NeighborhoodBinding, catalog: DatasetCatalog) -> Self {
        self.neighborhood = Some(binding);
        self.catalog = catalog;
        self
    }

    /// Define a template variable.
    #[must_use]
    pub fn var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name, value);
        self
    }

    /// Separator between identifier parts (default `-`).
    #[must_use]
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Constant first identifier part (e.g. an experiment date).
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Number records from `first` and put the number in identifiers.
    #[must_use]
    pub const fn numbered(mut self, first: u64) -> Self {
        self.first_number = Some(first);
        self
    }

    /// Give each distinct value combination of these axes its own
    /// directory and batch script.
    #[must_use]
    pub fn group_by(mut self, axis: impl Into<String>) -> Self {
        self.group_by.push(axis.into());
        self
    }

    /// How records inherit the baseline.
    #[must_use]
    pub fn inheritance(mut self, inheritance: Inheritance) -> Self {
        self.inheritance = inheritance;
        self
    }

    /// Subdirectory (per group) holding the records.
    #[must_use]
    pub fn config_dir(mut self, name: impl Into<String>) -> Self {
        self.config_dir = Some(name.into());
        self
    }

    /// Record file extension (default `txt`).
    #[must_use]
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Batch script file name (default `run_all.sh`).
    #[must_use]
    pub fn batch_file(mut self, name: impl Into<String>) -> Self {
        self.batch_file = name.into();
        self
    }

    /// Write a JSON manifest with this name in the output directory.
    #[must_use]
    pub fn manifest(mut self, name: impl Into<String>) -> Self {
        self.manifest = Some(name.into());
        self
    }

    /// Job line specification.
    #[must_use]
    pub fn job(mut self, job: JobSpec) -> Self {
        self.job = Some(job);
        self
    }

    /// Validate and build the generator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`], [`Error::Template`] or
    /// [`Error::InvalidValue`] for the first inconsistency found: missing
    /// axes or job, duplicate/reserved axis names, unknown axes in rules,
    /// groups or the neighborhood binding, unknown template placeholders.
    /// Returns [`Error::Filesystem`] if a relative output directory cannot
    /// be resolved because the current directory is unavailable.
    pub fn build(self) -> Result<Generator> {
        let job = self
            .job
            .ok_or_else(|| Error::Config("no job specification (engine command)".into()))?;
        let root = if self.root.is_absolute() {
            self.root
        } else {
            std::env::current_dir()
                .map_err(|e| Error::filesystem(&self.root, e))?
                .join(&self.root)
        };
        if self.axes.is_empty() {
            return Err(Error::Config("at least one axis is required".into()));
        }
        if self.separator.is_empty() {
            return Err(Error::Config("identifier separator must not be empty".into()));
        }
        for (what, name) in [("extension", &self.extension), ("batch file", &self.batch_file)] {
            if name.is_empty() || name.contains(['/', '\\']) {
                return Err(Error::Config(format!("invalid {what} '{name}'")));
            }
        }

        let mut axis_names = HashSet::new();
        for axis in &self.axes {
            axis.validate()?;
            let name = axis.name();
            if RESERVED.contains(&name) || name.contains(['.', '{', '}']) {
                return Err(Error::Config(format!("'{name}' cannot be used as an axis name")));
            }
            if self.vars.contains(name) {
                return Err(Error::Config(format!("variable '{name}' shadows an axis")));
            }
            if !axis_names.insert(name) {
                return Err(Error::Config(format!("axis '{name}' is declared twice")));
            }
        }
        if let Some(reserved) = RESERVED.iter().find(|r| self.vars.contains(r)) {
            return Err(Error::Config(format!("variable name '{reserved}' is reserved")));
        }

        for rule in &self.exclusions {
            rule.validate(&self.axes)?;
        }
        for axis in &self.group_by {
            if !axis_names.contains(axis.as_str()) {
                return Err(Error::Config(format!("group_by references unknown axis '{axis}'")));
            }
        }

        if let Some(binding) = &self.neighborhood {
            let axis = self
                .axes
                .iter()
                .find(|a| a.name() == binding.axis)
                .ok_or_else(|| {
                    Error::Config(format!("neighborhood axis '{}' does not exist", binding.axis))
                })?;
            for value in axis.values() {
                let size: NeighborhoodSize = value.value().parse()?;
                if size.needs_lookup() && !axis_names.contains(binding.dataset_axis.as_str()) {
                    return Err(Error::Config(format!(
                        "neighborhood size '{size}' needs dataset axis '{}'",
                        binding.dataset_axis
                    )));
                }
            }
        }

        // placeholders every record can use
        let mut known: HashSet<String> = RESERVED
            .iter()
            .filter(|r| **r != "config" && (**r != "k" || self.neighborhood.is_some()))
            .map(|r| (*r).to_string())
            .collect();
        for axis in &self.axes {
            known.insert(axis.name().to_string());
            known.insert(format!("{}.alias", axis.name()));
        }
        let check = |template: &Template, extra: &[&str]| -> Result<()> {
            match template
                .placeholders()
                .find(|p| !known.contains(*p) && !self.vars.contains(p) && !extra.contains(p))
            {
                Some(unknown) => Err(Error::Template {
                    template: template.source().to_string(),
                    reason: format!("unknown placeholder '{{{unknown}}}'"),
                }),
                None => Ok(()),
            }
        };

        let mut derived = Vec::with_capacity(self.derived.len());
        let mut scratch = ConfigRecord::new();
        for (key, source) in self.derived {
            scratch.set(key.as_str(), "")?;
            let template = Template::parse(source)?;
            check(&template, &[])?;
            derived.push((key, template));
        }
        for template in job.templates() {
            check(template, &["config"])?;
        }

        let inheritance = match self.inheritance {
            Inheritance::Inline => ResolvedInheritance::Inline,
            Inheritance::ParentFile {
                file_name,
                reference,
            } => {
                if file_name.is_empty() || file_name.contains(['/', '\\']) {
                    return Err(Error::Config(format!("invalid parent file name '{file_name}'")));
                }
                let reference = reference.map(Template::parse).transpose()?;
                if let Some(template) = &reference {
                    check(template, &[])?;
                }
                ResolvedInheritance::ParentFile {
                    file_name,
                    reference,
                }
            }
        };

        Ok(Generator {
            axes: self.axes,
            baseline: self.baseline,
            derived,
            exclusions: self.exclusions,
            neighborhood: self.neighborhood,
            catalog: self.catalog,
            vars: self.vars,
            separator: self.separator,
            prefix: self.prefix,
            first_number: self.first_number,
            group_by: self.group_by,
            inheritance,
            root,
            config_dir: self.config_dir,
            extension: self.extension,
            batch_file: self.batch_file,
            manifest: self.manifest,
            job,
        })
    }
}

/// One record of a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedExperiment {
    identifier: String,
    number: u64,
    group: usize,
    combination: Combination,
    config_path: PathBuf,
    record: ConfigRecord,
    job_line: String,
    log_path: String,
    neighborhood: Option<u64>,
}

impl PlannedExperiment {
    /// Experiment identifier (file stem).
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Ordinal number of the record.
    #[must_use]
    pub const fn number(&self) -> u64 {
        self.number
    }

    /// Axis values of the record.
    #[must_use]
    pub const fn combination(&self) -> &Combination {
        &self.combination
    }

    /// Where the record is written.
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Record contents.
    #[must_use]
    pub const fn record(&self) -> &ConfigRecord {
        &self.record
    }

    /// Batch job line.
    #[must_use]
    pub fn job_line(&self) -> &str {
        &self.job_line
    }

    /// Log path the job line redirects to.
    #[must_use]
    pub fn log_path(&self) -> &str {
        &self.log_path
    }

    /// Resolved neighborhood size, if bound.
    #[must_use]
    pub const fn neighborhood(&self) -> Option<u64> {
        self.neighborhood
    }
}

/// Files belonging to one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupPlan {
    key: String,
    dir: PathBuf,
    config_dir: PathBuf,
    batch_path: PathBuf,
    script: BatchScript,
    master: Option<(PathBuf, ConfigRecord)>,
    members: usize,
}

impl GroupPlan {
    /// Group key (empty without grouping).
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Directory of the group.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Batch script path.
    #[must_use]
    pub fn batch_path(&self) -> &Path {
        &self.batch_path
    }

    /// Batch script contents.
    #[must_use]
    pub const fn script(&self) -> &BatchScript {
        &self.script
    }

    /// Baseline file path, in parent-file mode.
    #[must_use]
    pub fn master_path(&self) -> Option<&Path> {
        self.master.as_ref().map(|(p, _)| p.as_path())
    }

    /// Number of records in the group.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.members
    }

    /// True if the group has no records.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.members == 0
    }

    fn support_files(&self) -> Vec<(&Path, String)> {
        let mut files = vec![(self.batch_path.as_path(), format!("batch script of group '{}'", self.key))];
        if let Some((path, _)) = &self.master {
            files.push((path.as_path(), format!("baseline file of group '{}'", self.key)));
        }
        files
    }
}

/// Everything a generation run would write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    experiments: Vec<PlannedExperiment>,
    groups: Vec<GroupPlan>,
    excluded: usize,
    total: usize,
    manifest: Option<PathBuf>,
}

impl Plan {
    /// Planned records in generation order.
    #[must_use]
    pub fn experiments(&self) -> &[PlannedExperiment] {
        &self.experiments
    }

    /// Groups in order of first appearance.
    #[must_use]
    pub fn groups(&self) -> &[GroupPlan] {
        &self.groups
    }

    /// Number of planned records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.experiments.len()
    }

    /// True if every combination was excluded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }

    /// Combinations removed by exclusion rules.
    #[must_use]
    pub const fn excluded(&self) -> usize {
        self.excluded
    }

    /// Size of the unrestricted Cartesian product.
    #[must_use]
    pub const fn total_combinations(&self) -> usize {
        self.total
    }

    /// Batch job lines over all groups.
    #[must_use]
    pub fn job_count(&self) -> usize {
        self.groups.iter().map(|g| g.script.job_count()).sum()
    }
}

/// Summary of a completed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationReport {
    /// Records written
    pub configs_written: usize,
    /// Combinations skipped by exclusion rules
    pub excluded: usize,
    /// Batch scripts written, one per group
    pub batch_scripts: Vec<PathBuf>,
    /// Baseline files written (parent-file mode)
    pub master_files: Vec<PathBuf>,
    /// Manifest path, if written
    pub manifest: Option<PathBuf>,
}

#[derive(Serialize)]
struct ManifestEntry<'a> {
    identifier: &'a str,
    number: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    group: Option<&'a str>,
    axes: BTreeMap<&'a str, &'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    neighborhood: Option<u64>,
    config: String,
}

impl<'a> ManifestEntry<'a> {
    fn new(experiment: &'a PlannedExperiment, group: &'a GroupPlan) -> Self {
        Self {
            identifier: &experiment.identifier,
            number: experiment.number,
            group: Some(group.key.as_str()).filter(|k| !k.is_empty()),
            axes: experiment
                .combination
                .iter()
                .map(|(axis, value)| (axis, value.value()))
                .collect(),
            neighborhood: experiment.neighborhood,
            config: experiment.config_path.display().to_string(),
        }
    }
}
